use crate::evaluator::{AgentForecast, FulfillmentChoice};
use crate::fixed::Ticks;
use crate::id::{AgentId, RequestId};
use crate::matching::Matching;
use std::collections::HashMap;

/// Per-step memo of evaluator results and agent forecasts.
///
/// Every entry is stamped with the step it was computed on; lookups from a
/// different step miss. The network also clears the memo at the start of
/// each run, so nothing outlives the run that produced it.
#[derive(Debug, Default)]
pub struct PairMemo {
    tick: Option<Ticks>,
    choices: HashMap<(AgentId, RequestId), (Ticks, Option<FulfillmentChoice>)>,
    forecasts: HashMap<AgentId, (Ticks, Option<AgentForecast>)>,
    hits: u64,
    misses: u64,
}

impl PairMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run on `tick`: drop everything and reset counters.
    pub fn begin(&mut self, tick: Ticks) {
        self.clear();
        self.tick = Some(tick);
    }

    pub fn clear(&mut self) {
        self.tick = None;
        self.choices.clear();
        self.forecasts.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// `Some(result)` on a hit for this step; the inner option is the
    /// memoized evaluation (which may itself be "no viable strategy").
    pub fn choice(
        &mut self,
        agent: &AgentId,
        request: &RequestId,
        tick: Ticks,
    ) -> Option<Option<FulfillmentChoice>> {
        let key = (agent.clone(), request.clone());
        match self.choices.get(&key) {
            Some((stamp, choice)) if *stamp == tick => {
                self.hits += 1;
                Some(choice.clone())
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn store_choice(
        &mut self,
        agent: AgentId,
        request: RequestId,
        tick: Ticks,
        choice: Option<FulfillmentChoice>,
    ) {
        self.choices.insert((agent, request), (tick, choice));
    }

    pub fn forecast(&self, agent: &AgentId, tick: Ticks) -> Option<Option<AgentForecast>> {
        match self.forecasts.get(agent) {
            Some((stamp, forecast)) if *stamp == tick => Some(forecast.clone()),
            _ => None,
        }
    }

    pub fn store_forecast(&mut self, agent: AgentId, tick: Ticks, forecast: Option<AgentForecast>) {
        self.forecasts.insert(agent, (tick, forecast));
    }

    pub fn tick(&self) -> Option<Ticks> {
        self.tick
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

/// The most recent matching plus what is needed to decide if it can be reused.
#[derive(Debug, Default)]
pub struct LastMatching {
    matching: Matching,
    computed_at: Option<Ticks>,
    stale: bool,
}

impl LastMatching {
    /// Whether the stored matching may be returned on `tick` without
    /// rematching: it must be fresh, non-empty and younger than `interval`.
    /// A step counter that went backwards never reuses.
    pub fn reusable(&self, tick: Ticks, interval: Ticks) -> bool {
        match self.computed_at {
            Some(at) => {
                !self.stale
                    && !self.matching.is_empty()
                    && tick.checked_sub(at).is_some_and(|age| age < interval)
            }
            None => false,
        }
    }

    /// Replace the stored matching. Returns the one it replaced.
    pub fn store(&mut self, matching: Matching, tick: Ticks) -> Matching {
        self.computed_at = Some(tick);
        self.stale = false;
        std::mem::replace(&mut self.matching, matching)
    }

    pub fn matching(&self) -> &Matching {
        &self.matching
    }

    pub fn computed_at(&self) -> Option<Ticks> {
        self.computed_at
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Drop the pair held by `agent` so it no longer reserves anything.
    pub(crate) fn release_agent(&mut self, agent: &AgentId) -> Option<RequestId> {
        self.matching.unpair_agent(agent)
    }

    fn mark_stale(&mut self) {
        self.stale = true;
    }
}

/// Caches owned by one network: the per-step pair memo and the last matching.
///
/// Invalidation is wholesale: any registry mutation clears the memo and marks
/// the last matching stale. The stale matching stays queryable until the next
/// run replaces it.
#[derive(Debug, Default)]
pub struct AssignmentCache {
    pub(crate) pairs: PairMemo,
    pub(crate) last: LastMatching,
}

impl AssignmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.pairs.clear();
        self.last.mark_stale();
    }

    pub fn pairs(&self) -> &PairMemo {
        &self.pairs
    }

    pub fn last(&self) -> &LastMatching {
        &self.last
    }
}
