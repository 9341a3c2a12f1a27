//! The per-area transport network: registries, caches and the matching run.
//!
//! # Architecture
//!
//! A `LogisticsNetwork` owns:
//! - A [`RequestRegistry`] and an [`AgentRegistry`] (ids only)
//! - An [`AssignmentCache`] (per-step pair memo, last matching)
//! - The validated [`EngineConfig`] and its [`ScoringWeights`]
//! - The [`MatchReport`] of the last `run_matching` call
//!
//! # Matching run
//!
//! Each `run_matching()`:
//! 1. **Throttle** -- reuse the last matching if it is fresh, non-empty and
//!    younger than `rematch_interval` steps
//! 2. **Slice** -- keep live agents and requests, stable prefix up to the
//!    configured maxima
//! 3. **Score** -- build both preference collections through the evaluator
//! 4. **Match** -- run deferred acceptance and store the result
//!
//! Every registry mutation invalidates the cache wholesale.

use tracing::{debug, trace};

use crate::cache::AssignmentCache;
use crate::config::{ConfigError, EngineConfig, ScoringWeights};
use crate::diagnostics::MatchReport;
use crate::evaluator::ThroughputEvaluator;
use crate::fixed::Ticks;
use crate::id::{AgentId, RequestId};
use crate::matcher::{MatchOutcome, StableMatcher, Termination};
use crate::matching::{AssignmentChange, Matching};
use crate::preference::PreferenceBuilder;
use crate::registry::{AgentRegistry, RequestRegistry};
use crate::request::TransferRequest;
use crate::world::WorldQuery;

// ---------------------------------------------------------------------------
// LogisticsNetwork
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct LogisticsNetwork {
    config: EngineConfig,
    weights: ScoringWeights,
    requests: RequestRegistry,
    agents: AgentRegistry,
    cache: AssignmentCache,
    report: Option<MatchReport>,
}

impl Default for LogisticsNetwork {
    fn default() -> Self {
        Self::with_weights(EngineConfig::default(), ScoringWeights::default())
    }
}

impl LogisticsNetwork {
    /// Create a network for one operating area. Fails if `config` is invalid.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let weights = config.validate()?;
        Ok(Self::with_weights(config, weights))
    }

    fn with_weights(config: EngineConfig, weights: ScoringWeights) -> Self {
        Self {
            config,
            weights,
            requests: RequestRegistry::new(),
            agents: AgentRegistry::new(),
            cache: AssignmentCache::new(),
            report: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert a request, or update the one with the same id in place.
    /// Returns `true` if the request is new.
    pub fn add_or_update_request(&mut self, request: TransferRequest) -> bool {
        trace!(request = %request.id, amount = request.signed_amount(), "upsert request");
        let inserted = self.requests.upsert(request);
        self.cache.invalidate();
        inserted
    }

    /// Remove a request. Unknown ids are ignored and leave the cache intact.
    pub fn remove_request(&mut self, id: &RequestId) -> Option<TransferRequest> {
        let removed = self.requests.remove(id)?;
        trace!(request = %id, "remove request");
        self.cache.invalidate();
        Some(removed)
    }

    /// Drop every request, e.g. when the area is lost.
    pub fn clear_requests(&mut self) {
        if !self.requests.is_empty() {
            self.requests.clear();
            self.cache.invalidate();
        }
    }

    /// Register a carrying agent. Duplicate registration is a no-op.
    pub fn register_agent(&mut self, id: impl Into<AgentId>) -> bool {
        let id = id.into();
        if !self.agents.register(id.clone()) {
            return false;
        }
        trace!(agent = %id, "register agent");
        self.cache.invalidate();
        true
    }

    /// Unregister an agent. Its pair in the last matching is dropped so the
    /// next run does not discount its request by cargo it no longer brings.
    pub fn unregister_agent(&mut self, id: &AgentId) -> bool {
        if !self.agents.unregister(id) {
            return false;
        }
        let released = self.cache.last.release_agent(id);
        trace!(agent = %id, released = ?released, "unregister agent");
        self.cache.invalidate();
        true
    }

    // -----------------------------------------------------------------------
    // Matching run
    // -----------------------------------------------------------------------

    /// Compute (or reuse) the assignment of agents to requests for the
    /// world's current step.
    pub fn run_matching<W: WorldQuery + ?Sized>(&mut self, world: &W) -> &Matching {
        let tick = world.tick();
        if self.cache.last.reusable(tick, self.config.rematch_interval) {
            let matched = self.cache.last.matching().len();
            trace!(tick, matched, "reusing previous matching");
            self.report = Some(MatchReport::reused(tick, matched));
            return self.cache.last.matching();
        }

        let AssignmentCache { pairs, last } = &mut self.cache;
        pairs.begin(tick);

        let mut eval = ThroughputEvaluator::new(world, self.weights, last.matching(), pairs);
        let mut report = MatchReport {
            tick,
            agents_considered: 0,
            requests_considered: 0,
            stale_agents: 0,
            stale_requests: 0,
            pairs_evaluated: 0,
            cache_hits: 0,
            rounds: 0,
            matched: 0,
            termination: Termination::Converged,
            reused: false,
        };

        let mut agents = Vec::new();
        for id in self.agents.iter() {
            if agents.len() == self.config.max_agents {
                break;
            }
            if eval.forecast(id).is_some() {
                agents.push(id.clone());
            } else {
                report.stale_agents += 1;
            }
        }

        let mut requests = Vec::new();
        for request in self.requests.iter() {
            if requests.len() == self.config.max_requests {
                break;
            }
            if eval.site(&request.target).is_some() {
                requests.push(request.clone());
            } else {
                report.stale_requests += 1;
            }
        }

        report.agents_considered = agents.len();
        report.requests_considered = requests.len();

        let outcome = if agents.is_empty() || requests.is_empty() {
            MatchOutcome::empty()
        } else {
            let prefs = PreferenceBuilder::build(&mut eval, &agents, &requests);
            StableMatcher::new(self.config.iteration_cap).run(&prefs)
        };
        drop(eval);

        report.pairs_evaluated = pairs.len() as u64;
        report.cache_hits = pairs.hits();
        report.rounds = outcome.rounds;
        report.matched = outcome.matching.len();
        report.termination = outcome.termination;

        debug!(
            tick,
            agents = report.agents_considered,
            requests = report.requests_considered,
            stale_agents = report.stale_agents,
            stale_requests = report.stale_requests,
            pairs = report.pairs_evaluated,
            rounds = report.rounds,
            matched = report.matched,
            "matching run complete"
        );

        last.store(outcome.matching, tick);
        self.report = Some(report);
        last.matching()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The request currently assigned to `agent`, if it is still registered
    /// and the request is still outstanding.
    pub fn assignment(&self, agent: &AgentId) -> Option<&TransferRequest> {
        if !self.agents.contains(agent) {
            return None;
        }
        let request = self.cache.last.matching().request_for(agent)?;
        self.requests.get(request)
    }

    /// The most recent matching. May be stale after a mutation until the
    /// next run.
    pub fn matching(&self) -> &Matching {
        self.cache.last.matching()
    }

    /// Step of the most recent full rematch.
    pub fn matched_at(&self) -> Option<Ticks> {
        self.cache.last.computed_at()
    }

    pub fn is_stale(&self) -> bool {
        self.cache.last.is_stale()
    }

    /// What changed between `previous` and the current matching.
    pub fn assignment_changes(&self, previous: &Matching) -> Vec<AssignmentChange> {
        self.cache.last.matching().diff(previous)
    }

    pub fn last_report(&self) -> Option<&MatchReport> {
        self.report.as_ref()
    }

    pub fn requests(&self) -> &RequestRegistry {
        &self.requests
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn cache(&self) -> &AssignmentCache {
        &self.cache
    }
}

// ===========================================================================
// Tests
// ===========================================================================
