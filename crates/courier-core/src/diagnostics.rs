//! Diagnostics for the most recent matching run.
//!
//! [`MatchReport`] is filled in by every call to
//! [`LogisticsNetwork::run_matching`](crate::network::LogisticsNetwork::run_matching),
//! including throttled calls that reuse the previous matching.

use serde::{Deserialize, Serialize};

use crate::fixed::Ticks;
use crate::matcher::Termination;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub tick: Ticks,
    /// Live agents in the slice, after truncation.
    pub agents_considered: usize,
    /// Live requests in the slice, after truncation.
    pub requests_considered: usize,
    /// Registered agents skipped because the world no longer has them.
    pub stale_agents: usize,
    /// Requests skipped because their target no longer resolves.
    pub stale_requests: usize,
    /// Distinct (agent, request) pairs scored.
    pub pairs_evaluated: u64,
    pub cache_hits: u64,
    pub rounds: u32,
    pub matched: usize,
    pub termination: Termination,
    /// True when the previous matching was returned without rematching.
    pub reused: bool,
}

impl MatchReport {
    /// Report for a throttled call that returned the previous matching.
    pub fn reused(tick: Ticks, matched: usize) -> Self {
        Self {
            tick,
            agents_considered: 0,
            requests_considered: 0,
            stale_agents: 0,
            stale_requests: 0,
            pairs_evaluated: 0,
            cache_hits: 0,
            rounds: 0,
            matched,
            termination: Termination::Converged,
            reused: true,
        }
    }

    /// Share of agents in the slice that received an assignment.
    pub fn utilization(&self) -> f64 {
        if self.agents_considered == 0 {
            return 0.0;
        }
        self.matched as f64 / self.agents_considered as f64
    }

    pub fn hit_cap(&self) -> bool {
        self.termination == Termination::IterationCap
    }
}

// ===========================================================================
// Tests
// ===========================================================================
