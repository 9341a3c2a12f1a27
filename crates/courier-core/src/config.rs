//! Engine configuration.
//!
//! [`EngineConfig`] is plain serde data with defaults for every field, so a
//! host can embed it in its own settings file or build it in code. Weights are
//! written as `f64` and converted to [`Fixed64`] once, by [`EngineConfig::validate`].
//! TOML loading is available behind the `config-toml` feature.

use crate::fixed::{f64_to_fixed64, Fixed64, Ticks};
use serde::{Deserialize, Serialize};

/// Score weight for a NEED pickup by an agent already carrying unrelated cargo.
pub const DEFAULT_MIXED_CARGO_NEED: f64 = 0.5;
/// Score weight for a PROVIDE pickup by an agent already carrying unrelated cargo.
pub const DEFAULT_MIXED_CARGO_PROVIDE: f64 = 0.3;
/// Score weight for PROVIDE candidates of a full agent nobody needs cargo from.
pub const DEFAULT_SATURATED_PROVIDE: f64 = 0.1;
/// Ticks spent on the withdraw/transfer action itself.
pub const DEFAULT_SERVICE_TICKS: Ticks = 2;
/// Rounds of proposals before the matcher gives up.
pub const DEFAULT_ITERATION_CAP: u32 = 1000;

/// Tunables for one [`LogisticsNetwork`](crate::network::LogisticsNetwork).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum steps between two full rematches while inputs are unchanged.
    pub rematch_interval: Ticks,
    /// Agents considered per run (stable prefix of registration order).
    pub max_agents: usize,
    /// Requests considered per run (stable prefix of insertion order).
    pub max_requests: usize,
    /// Safety bound on matcher rounds.
    pub iteration_cap: u32,
    pub weights: WeightsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rematch_interval: 5,
            max_agents: 50,
            max_requests: 100,
            iteration_cap: DEFAULT_ITERATION_CAP,
            weights: WeightsConfig::default(),
        }
    }
}

/// Empirically chosen scoring constants, overridable per area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    pub mixed_cargo_need: f64,
    pub mixed_cargo_provide: f64,
    pub saturated_provide: f64,
    pub service_ticks: Ticks,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            mixed_cargo_need: DEFAULT_MIXED_CARGO_NEED,
            mixed_cargo_provide: DEFAULT_MIXED_CARGO_PROVIDE,
            saturated_provide: DEFAULT_SATURATED_PROVIDE,
            service_ticks: DEFAULT_SERVICE_TICKS,
        }
    }
}

/// Validated weights in fixed-point form, as used by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWeights {
    pub mixed_cargo_need: Fixed64,
    pub mixed_cargo_provide: Fixed64,
    pub saturated_provide: Fixed64,
    pub service_ticks: Ticks,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        // Defaults are finite and in range.
        Self {
            mixed_cargo_need: f64_to_fixed64(DEFAULT_MIXED_CARGO_NEED),
            mixed_cargo_provide: f64_to_fixed64(DEFAULT_MIXED_CARGO_PROVIDE),
            saturated_provide: f64_to_fixed64(DEFAULT_SATURATED_PROVIDE),
            service_ticks: DEFAULT_SERVICE_TICKS,
        }
    }
}

impl WeightsConfig {
    fn resolve(&self) -> Result<ScoringWeights, ConfigError> {
        Ok(ScoringWeights {
            mixed_cargo_need: weight("mixed_cargo_need", self.mixed_cargo_need)?,
            mixed_cargo_provide: weight("mixed_cargo_provide", self.mixed_cargo_provide)?,
            saturated_provide: weight("saturated_provide", self.saturated_provide)?,
            service_ticks: self.service_ticks,
        })
    }
}

fn weight(name: &'static str, value: f64) -> Result<Fixed64, ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::WeightOutOfRange { name, value });
    }
    Ok(f64_to_fixed64(value))
}

impl EngineConfig {
    /// Check limits and convert weights to fixed-point.
    pub fn validate(&self) -> Result<ScoringWeights, ConfigError> {
        if self.max_agents == 0 {
            return Err(ConfigError::ZeroLimit("max_agents"));
        }
        if self.max_requests == 0 {
            return Err(ConfigError::ZeroLimit("max_requests"));
        }
        if self.iteration_cap == 0 {
            return Err(ConfigError::ZeroLimit("iteration_cap"));
        }
        self.weights.resolve()
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    #[cfg(feature = "config-toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("weight {name} must be within 0..=1, got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },
    #[cfg(feature = "config-toml")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let weights = EngineConfig::default().validate().unwrap();
        assert_eq!(weights, ScoringWeights::default());
        assert_eq!(weights.service_ticks, 2);
        assert_eq!(EngineConfig::default().iteration_cap, 1000);
    }

    #[test]
    fn zero_limits_rejected() {
        let config = EngineConfig {
            max_agents: 0,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ZeroLimit("max_agents")));
        assert_eq!(err.to_string(), "max_agents must be greater than zero");

        let config = EngineConfig {
            iteration_cap: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroLimit("iteration_cap"))
        ));
    }

    #[test]
    fn out_of_range_weight_rejected() {
        let mut config = EngineConfig::default();
        config.weights.saturated_provide = 1.5;
        match config.validate() {
            Err(ConfigError::WeightOutOfRange { name, value }) => {
                assert_eq!(name, "saturated_provide");
                assert_eq!(value, 1.5);
            }
            other => panic!("expected WeightOutOfRange, got: {other:?}"),
        }

        config.weights.saturated_provide = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn toml_partial_overrides_keep_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            rematch_interval = 10

            [weights]
            mixed_cargo_provide = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(config.rematch_interval, 10);
        assert_eq!(config.max_agents, 50);
        assert_eq!(config.weights.mixed_cargo_provide, 0.25);
        assert_eq!(config.weights.mixed_cargo_need, DEFAULT_MIXED_CARGO_NEED);
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn toml_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_requests = \"many\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("max_requests = 0"),
            Err(ConfigError::ZeroLimit("max_requests"))
        ));
    }
}
