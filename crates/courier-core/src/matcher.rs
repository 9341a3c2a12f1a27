//! Deferred-acceptance matching, agents proposing.
//!
//! Each agent walks its preference list with a cursor. Every round, each
//! agent that is unmatched and still has candidates proposes to the request
//! under its cursor and advances. A request keeps whichever proposer ranks
//! best in its own list and releases the previous holder back into the pool.
//! The loop ends when no free agent has a candidate left, or at the round cap.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::DEFAULT_ITERATION_CAP;
use crate::id::{AgentId, RequestId};
use crate::matching::Matching;
use crate::preference::Preferences;

/// Why the matcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// No free agent had a candidate left.
    Converged,
    /// The round cap was reached; the matching is partial.
    IterationCap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matching: Matching,
    pub rounds: u32,
    pub termination: Termination,
}

impl MatchOutcome {
    /// No pairs, no rounds.
    pub fn empty() -> Self {
        Self {
            matching: Matching::new(),
            rounds: 0,
            termination: Termination::Converged,
        }
    }

    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableMatcher {
    cap: u32,
}

impl Default for StableMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATION_CAP)
    }
}

impl StableMatcher {
    pub fn new(cap: u32) -> Self {
        Self { cap }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn run(&self, prefs: &Preferences) -> MatchOutcome {
        if prefs.is_empty() {
            return MatchOutcome::empty();
        }

        let mut matching = Matching::new();
        let mut cursors: BTreeMap<&AgentId, usize> = prefs.agents().map(|a| (a, 0)).collect();
        let mut rounds = 0;

        loop {
            let free: Vec<(&AgentId, &RequestId)> = cursors
                .iter()
                .filter(|(agent, _)| matching.request_for(agent).is_none())
                .filter_map(|(agent, &cursor)| {
                    let list = prefs.agent_list(agent)?;
                    list.get(cursor).map(|entry| (*agent, &entry.id))
                })
                .collect();

            if free.is_empty() {
                return MatchOutcome {
                    matching,
                    rounds,
                    termination: Termination::Converged,
                };
            }
            if rounds >= self.cap {
                warn!(
                    cap = self.cap,
                    free = free.len(),
                    matched = matching.len(),
                    "matcher hit its round cap, returning partial matching"
                );
                return MatchOutcome {
                    matching,
                    rounds,
                    termination: Termination::IterationCap,
                };
            }
            rounds += 1;

            for (agent, request) in free {
                if let Some(cursor) = cursors.get_mut(agent) {
                    *cursor += 1;
                }
                propose(prefs, &mut matching, agent, request);
            }
        }
    }
}

/// One proposal. The request accepts if it is free, or if the proposer ranks
/// strictly better than its current holder.
fn propose(prefs: &Preferences, matching: &mut Matching, agent: &AgentId, request: &RequestId) {
    if prefs.request_list(request).is_none() {
        return;
    }
    let Some(incumbent) = matching.agent_for(request) else {
        matching.pair(agent.clone(), request.clone());
        return;
    };
    let displaces = match (prefs.rank_of(request, agent), prefs.rank_of(request, incumbent)) {
        (Some(challenger), Some(holder)) => challenger < holder,
        (Some(_), None) => true,
        (None, _) => false,
    };
    if displaces {
        matching.unpair_request(request);
        matching.pair(agent.clone(), request.clone());
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed64;
    use crate::preference::Ranked;

    fn a(id: &str) -> AgentId {
        AgentId::from(id)
    }

    fn r(id: &str) -> RequestId {
        RequestId::from(id)
    }

    /// Lists given best-first; scores are synthesized to preserve that order.
    fn prefs(agents: &[(&str, &[&str])], requests: &[(&str, &[&str])]) -> Preferences {
        fn ranked<K>(ids: &[&str], make: fn(&str) -> K) -> Vec<Ranked<K>> {
            let n = ids.len() as i32;
            ids.iter()
                .enumerate()
                .map(|(i, &id)| Ranked {
                    id: make(id),
                    score: Fixed64::from_num(n - i as i32),
                })
                .collect()
        }
        let mut p = Preferences::new();
        for (agent, list) in agents {
            p.set_agent_list(a(agent), ranked(list, r));
        }
        for (request, list) in requests {
            p.set_request_list(r(request), ranked(list, a));
        }
        p
    }

    #[test]
    fn empty_preferences_converge_immediately() {
        let outcome = StableMatcher::default().run(&Preferences::new());
        assert!(outcome.matching.is_empty());
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.termination, Termination::Converged);
    }

    #[test]
    fn contested_request_goes_to_higher_ranked_agent() {
        let p = prefs(
            &[("a1", &["x"]), ("a2", &["x"])],
            &[("x", &["a1", "a2"])],
        );
        let outcome = StableMatcher::default().run(&p);
        assert_eq!(outcome.matching.request_for(&a("a1")), Some(&r("x")));
        assert!(outcome.matching.request_for(&a("a2")).is_none());
        assert!(outcome.converged());
    }

    #[test]
    fn rejected_agent_falls_through_to_next_choice() {
        let p = prefs(
            &[("a1", &["x", "y"]), ("a2", &["x"])],
            &[("x", &["a2", "a1"]), ("y", &["a1"])],
        );
        let outcome = StableMatcher::default().run(&p);
        assert_eq!(outcome.matching.request_for(&a("a1")), Some(&r("y")));
        assert_eq!(outcome.matching.request_for(&a("a2")), Some(&r("x")));
    }

    fn displacement_case() -> Preferences {
        // a0 holds x from round one. a1 prefers x, is rejected, then takes r
        // from a2, who ranks lower in r's list.
        prefs(
            &[("a0", &["x"]), ("a1", &["x", "r"]), ("a2", &["r"])],
            &[("x", &["a0", "a1"]), ("r", &["a1", "a2"])],
        )
    }

    #[test]
    fn later_higher_ranked_proposer_displaces_incumbent() {
        let outcome = StableMatcher::default().run(&displacement_case());
        let m = &outcome.matching;
        assert_eq!(m.request_for(&a("a0")), Some(&r("x")));
        assert_eq!(m.request_for(&a("a1")), Some(&r("r")));
        assert!(m.request_for(&a("a2")).is_none());
        assert_eq!(outcome.rounds, 2);
        assert!(outcome.converged());
    }

    #[test]
    fn round_cap_returns_partial_matching() {
        let outcome = StableMatcher::new(1).run(&displacement_case());
        assert_eq!(outcome.termination, Termination::IterationCap);
        assert_eq!(outcome.rounds, 1);
        // After one round a1 is still free; a2 holds r.
        assert_eq!(outcome.matching.agent_for(&r("r")), Some(&a("a2")));
        assert!(outcome.matching.request_for(&a("a1")).is_none());
    }

    #[test]
    fn proposal_to_request_without_list_is_discarded() {
        let p = prefs(&[("a1", &["ghost", "x"])], &[("x", &["a1"])]);
        let outcome = StableMatcher::default().run(&p);
        assert_eq!(outcome.matching.request_for(&a("a1")), Some(&r("x")));
        assert!(outcome.matching.agent_for(&r("ghost")).is_none());
    }

    #[test]
    fn unranked_incumbent_loses_to_ranked_proposer() {
        let p = prefs(
            &[("a1", &["x"]), ("a2", &["x"])],
            &[("x", &["a2"])],
        );
        let outcome = StableMatcher::default().run(&p);
        assert_eq!(outcome.matching.agent_for(&r("x")), Some(&a("a2")));
    }

    #[test]
    fn unranked_proposer_cannot_displace() {
        let p = prefs(
            &[("a1", &["x"]), ("a2", &["x"])],
            &[("x", &["a1"])],
        );
        let outcome = StableMatcher::default().run(&p);
        assert_eq!(outcome.matching.agent_for(&r("x")), Some(&a("a1")));
        assert!(outcome.matching.request_for(&a("a2")).is_none());
    }
}
