use crate::id::{AgentId, RequestId};
use crate::request::TransferRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outstanding transfer requests for one operating area.
///
/// Iteration follows insertion order so that truncating to the first N
/// entries is deterministic. Every mutation bumps `revision`, which the
/// network compares against to decide whether cached results are stale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestRegistry {
    order: Vec<RequestId>,
    entries: HashMap<RequestId, TransferRequest>,
    revision: u64,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a request, or update the live entry with the same id in place
    /// (keeping its position in iteration order). Returns `true` if new.
    pub fn upsert(&mut self, request: TransferRequest) -> bool {
        self.revision += 1;
        match self.entries.get_mut(&request.id) {
            Some(existing) => {
                *existing = request;
                false
            }
            None => {
                self.order.push(request.id.clone());
                self.entries.insert(request.id.clone(), request);
                true
            }
        }
    }

    /// Remove a request by id. Returns the removed entry.
    pub fn remove(&mut self, id: &RequestId) -> Option<TransferRequest> {
        let removed = self.entries.remove(id)?;
        self.order.retain(|r| r != id);
        self.revision += 1;
        Some(removed)
    }

    pub fn get(&self, id: &RequestId) -> Option<&TransferRequest> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.entries.contains_key(id)
    }

    /// Requests in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TransferRequest> + '_ {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drop every request. Used on world reset.
    pub fn clear(&mut self) {
        if !self.order.is_empty() {
            self.order.clear();
            self.entries.clear();
            self.revision += 1;
        }
    }
}

/// Carrying agents registered for one operating area, by id only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRegistry {
    agents: Vec<AgentId>,
    revision: u64,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent. Duplicate registration is a no-op and returns `false`.
    pub fn register(&mut self, id: AgentId) -> bool {
        if self.agents.contains(&id) {
            return false;
        }
        self.agents.push(id);
        self.revision += 1;
        true
    }

    /// Unregister an agent. Returns `false` if it was not registered.
    pub fn unregister(&mut self, id: &AgentId) -> bool {
        let before = self.agents.len();
        self.agents.retain(|a| a != id);
        let removed = self.agents.len() != before;
        if removed {
            self.revision += 1;
        }
        removed
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.agents.contains(id)
    }

    /// Agents in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentId> + '_ {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed64;
    use crate::id::ResourceKind;
    use crate::request::RequestKind;

    const ENERGY: ResourceKind = ResourceKind(0);

    fn request(id: &str, signed: i64) -> TransferRequest {
        TransferRequest::new(id, format!("{id}-target"), ENERGY, signed).unwrap()
    }

    #[test]
    fn upsert_inserts_then_updates_in_place() {
        let mut reg = RequestRegistry::new();
        assert!(reg.upsert(request("a", 10)));
        assert!(reg.upsert(request("b", -4)));
        assert!(!reg.upsert(request("a", -20)));

        assert_eq!(reg.len(), 2);
        let a = reg.get(&RequestId::from("a")).unwrap();
        assert_eq!(a.kind, RequestKind::Provide);
        assert_eq!(a.amount, 20);

        let ids: Vec<_> = reg.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"], "update must keep original position");
    }

    #[test]
    fn remove_drops_entry_and_order() {
        let mut reg = RequestRegistry::new();
        reg.upsert(request("a", 1));
        reg.upsert(request("b", 1));
        let removed = reg.remove(&RequestId::from("a")).unwrap();
        assert_eq!(removed.id.as_str(), "a");
        assert!(!reg.contains(&RequestId::from("a")));
        assert_eq!(reg.iter().count(), 1);
        assert!(reg.remove(&RequestId::from("a")).is_none());
    }

    #[test]
    fn mutations_bump_revision() {
        let mut reg = RequestRegistry::new();
        let r0 = reg.revision();
        reg.upsert(request("a", 1));
        let r1 = reg.revision();
        assert!(r1 > r0);
        reg.upsert(request("a", 1).with_rate_of_change(Fixed64::ONE));
        let r2 = reg.revision();
        assert!(r2 > r1, "in-place updates also invalidate");
        reg.remove(&RequestId::from("missing"));
        assert_eq!(reg.revision(), r2, "no-op removal keeps revision");
        reg.clear();
        assert!(reg.revision() > r2);
        assert!(reg.is_empty());
    }

    #[test]
    fn duplicate_agent_registration_is_noop() {
        let mut agents = AgentRegistry::new();
        assert!(agents.register(AgentId::from("h1")));
        let rev = agents.revision();
        assert!(!agents.register(AgentId::from("h1")));
        assert_eq!(agents.len(), 1);
        assert_eq!(agents.revision(), rev);
    }

    #[test]
    fn unregister_agent() {
        let mut agents = AgentRegistry::new();
        agents.register(AgentId::from("h1"));
        agents.register(AgentId::from("h2"));
        assert!(agents.unregister(&AgentId::from("h1")));
        assert!(!agents.unregister(&AgentId::from("h1")));
        let ids: Vec<_> = agents.iter().map(AgentId::as_str).collect();
        assert_eq!(ids, vec!["h2"]);
    }

    #[test]
    fn snapshot_restores_order_and_revision() {
        let mut reg = RequestRegistry::new();
        reg.upsert(request("c", 3));
        reg.upsert(request("a", -1));
        reg.upsert(request("b", 2));

        let json = serde_json::to_string(&reg).unwrap();
        let restored: RequestRegistry = serde_json::from_str(&json).unwrap();

        let ids: Vec<_> = restored.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(restored.revision(), reg.revision());
        assert_eq!(restored.get(&RequestId::from("a")), reg.get(&RequestId::from("a")));
    }
}
