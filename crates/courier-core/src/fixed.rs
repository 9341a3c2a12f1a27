use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Used for rates,
/// multipliers and throughput scores so rankings are deterministic.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64, saturating at the type bounds. Use only for
/// configuration, never in a run. Callers reject NaN first.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and logging.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Lift a whole quantity into fixed-point, saturating at the type bounds.
#[inline]
pub fn from_quantity(v: u64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Truncate a fixed-point quantity to whole units, flooring negatives at 0.
#[inline]
pub fn to_quantity(v: Fixed64) -> u32 {
    if v <= Fixed64::ZERO {
        0
    } else {
        v.saturating_to_num::<u32>()
    }
}

/// Checked multiplication for Fixed64 that returns None on overflow.
#[inline]
pub fn checked_mul_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_mul(b)
}

/// Checked division for Fixed64 that returns None on zero divisor or overflow.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}
