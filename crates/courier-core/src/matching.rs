use crate::id::{AgentId, RequestId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A partial one-to-one assignment of agents to requests.
///
/// Both directions are indexed; `pair` and `unpair_*` keep them in sync so
/// that no agent and no request ever appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matching {
    by_agent: BTreeMap<AgentId, RequestId>,
    by_request: BTreeMap<RequestId, AgentId>,
}

/// How one agent's assignment differs between two matchings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentChange {
    Assigned { agent: AgentId, request: RequestId },
    Reassigned { agent: AgentId, from: RequestId, to: RequestId },
    Released { agent: AgentId, request: RequestId },
}

impl Matching {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pair. Both sides must currently be unmatched.
    pub fn pair(&mut self, agent: AgentId, request: RequestId) {
        debug_assert!(
            !self.by_agent.contains_key(&agent),
            "agent {agent} is already matched"
        );
        debug_assert!(
            !self.by_request.contains_key(&request),
            "request {request} is already matched"
        );
        self.by_request.insert(request.clone(), agent.clone());
        self.by_agent.insert(agent, request);
    }

    /// Remove the pair containing `request`. Returns the agent that held it.
    pub fn unpair_request(&mut self, request: &RequestId) -> Option<AgentId> {
        let agent = self.by_request.remove(request)?;
        self.by_agent.remove(&agent);
        Some(agent)
    }

    /// Remove the pair containing `agent`. Returns the request it held.
    pub fn unpair_agent(&mut self, agent: &AgentId) -> Option<RequestId> {
        let request = self.by_agent.remove(agent)?;
        self.by_request.remove(&request);
        Some(request)
    }

    pub fn request_for(&self, agent: &AgentId) -> Option<&RequestId> {
        self.by_agent.get(agent)
    }

    pub fn agent_for(&self, request: &RequestId) -> Option<&AgentId> {
        self.by_request.get(request)
    }

    /// Pairs ordered by agent id.
    pub fn iter(&self) -> impl Iterator<Item = (&AgentId, &RequestId)> + '_ {
        self.by_agent.iter()
    }

    pub fn len(&self) -> usize {
        self.by_agent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_agent.is_empty()
    }

    /// Changes needed to go from `previous` to `self`, ordered by agent id.
    pub fn diff(&self, previous: &Matching) -> Vec<AssignmentChange> {
        let mut changes = Vec::new();
        for (agent, request) in &self.by_agent {
            match previous.request_for(agent) {
                None => changes.push(AssignmentChange::Assigned {
                    agent: agent.clone(),
                    request: request.clone(),
                }),
                Some(old) if old != request => changes.push(AssignmentChange::Reassigned {
                    agent: agent.clone(),
                    from: old.clone(),
                    to: request.clone(),
                }),
                Some(_) => {}
            }
        }
        for (agent, request) in &previous.by_agent {
            if !self.by_agent.contains_key(agent) {
                changes.push(AssignmentChange::Released {
                    agent: agent.clone(),
                    request: request.clone(),
                });
            }
        }
        changes.sort_by(|a, b| a.agent().cmp(b.agent()));
        changes
    }
}

impl AssignmentChange {
    pub fn agent(&self) -> &AgentId {
        match self {
            AssignmentChange::Assigned { agent, .. }
            | AssignmentChange::Reassigned { agent, .. }
            | AssignmentChange::Released { agent, .. } => agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(id: &str) -> AgentId {
        AgentId::from(id)
    }

    fn r(id: &str) -> RequestId {
        RequestId::from(id)
    }

    #[test]
    fn pair_indexes_both_directions() {
        let mut m = Matching::new();
        m.pair(a("h1"), r("x"));
        assert_eq!(m.request_for(&a("h1")), Some(&r("x")));
        assert_eq!(m.agent_for(&r("x")), Some(&a("h1")));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn unpair_keeps_indexes_in_sync() {
        let mut m = Matching::new();
        m.pair(a("h1"), r("x"));
        m.pair(a("h2"), r("y"));
        assert_eq!(m.unpair_request(&r("x")), Some(a("h1")));
        assert!(m.request_for(&a("h1")).is_none());
        assert_eq!(m.unpair_agent(&a("h2")), Some(r("y")));
        assert!(m.agent_for(&r("y")).is_none());
        assert!(m.is_empty());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "already matched")]
    fn double_pairing_an_agent_panics() {
        let mut m = Matching::new();
        m.pair(a("h1"), r("x"));
        m.pair(a("h1"), r("y"));
    }

    #[test]
    fn diff_reports_assign_reassign_release() {
        let mut old = Matching::new();
        old.pair(a("h1"), r("x"));
        old.pair(a("h2"), r("y"));
        old.pair(a("h3"), r("z"));

        let mut new = Matching::new();
        new.pair(a("h1"), r("x"));
        new.pair(a("h2"), r("z"));
        new.pair(a("h4"), r("y"));

        let changes = new.diff(&old);
        assert_eq!(
            changes,
            vec![
                AssignmentChange::Reassigned {
                    agent: a("h2"),
                    from: r("y"),
                    to: r("z"),
                },
                AssignmentChange::Released {
                    agent: a("h3"),
                    request: r("z"),
                },
                AssignmentChange::Assigned {
                    agent: a("h4"),
                    request: r("y"),
                },
            ]
        );
    }

    #[test]
    fn diff_of_identical_matchings_is_empty() {
        let mut m = Matching::new();
        m.pair(a("h1"), r("x"));
        assert!(m.diff(&m.clone()).is_empty());
    }
}
