//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::collections::BTreeMap;

use crate::fixed::{Fixed64, Ticks};
use crate::id::{AgentId, ResourceKind, TargetId};
use crate::network::LogisticsNetwork;
use crate::request::TransferRequest;
use crate::store::Store;
use crate::world::{AgentView, CommittedTask, Position, RelayFlow, RelayView, SiteView, WorldQuery};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Resource kinds
// ===========================================================================

pub fn energy() -> ResourceKind {
    ResourceKind(0)
}
pub fn oxygen() -> ResourceKind {
    ResourceKind(1)
}
pub fn hydrogen() -> ResourceKind {
    ResourceKind(2)
}

// ===========================================================================
// Request constructors
// ===========================================================================

pub fn need(id: &str, target: &str, kind: ResourceKind, amount: u32) -> TransferRequest {
    TransferRequest::new(id, target, kind, i64::from(amount)).unwrap()
}

pub fn provide(id: &str, target: &str, kind: ResourceKind, amount: u32) -> TransferRequest {
    TransferRequest::new(id, target, kind, -i64::from(amount)).unwrap()
}

pub fn relay(id: &str, position: Position, resource: ResourceKind, flow: RelayFlow, stock: u32) -> RelayView {
    RelayView {
        id: TargetId::from(id),
        position,
        resource,
        flow,
        store: Store::new(stock.max(800)).with(resource, stock),
    }
}

// ===========================================================================
// In-memory world
// ===========================================================================

/// A hand-built world for tests. Everything is looked up by id on every
/// query, so removing an object makes it absent on the next call.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    tick: Ticks,
    agents: BTreeMap<AgentId, AgentView>,
    sites: BTreeMap<TargetId, SiteView>,
    buffer: Option<TargetId>,
    relays: Vec<RelayView>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tick(&mut self, tick: Ticks) {
        self.tick = tick;
    }

    pub fn advance(&mut self, ticks: Ticks) {
        self.tick += ticks;
    }

    pub fn add_agent(&mut self, id: &str, position: Position, cargo: Store) -> AgentId {
        let id = AgentId::from(id);
        self.agents.insert(
            id.clone(),
            AgentView {
                id: id.clone(),
                position,
                cargo,
                task: None,
            },
        );
        id
    }

    pub fn set_task(&mut self, id: &str, task: CommittedTask) {
        if let Some(agent) = self.agents.get_mut(&AgentId::from(id)) {
            agent.task = Some(task);
        }
    }

    pub fn move_agent(&mut self, id: &str, position: Position) {
        if let Some(agent) = self.agents.get_mut(&AgentId::from(id)) {
            agent.position = position;
        }
    }

    pub fn remove_agent(&mut self, id: &str) {
        self.agents.remove(&AgentId::from(id));
    }

    pub fn add_site(&mut self, id: &str, position: Position, store: Store) -> TargetId {
        let id = TargetId::from(id);
        self.sites.insert(
            id.clone(),
            SiteView {
                id: id.clone(),
                position,
                store,
            },
        );
        id
    }

    pub fn set_site_store(&mut self, id: &str, store: Store) {
        if let Some(site) = self.sites.get_mut(&TargetId::from(id)) {
            site.store = store;
        }
    }

    pub fn remove_site(&mut self, id: &str) {
        let id = TargetId::from(id);
        self.sites.remove(&id);
        if self.buffer.as_ref() == Some(&id) {
            self.buffer = None;
        }
    }

    /// Add a site and mark it as the area's shared buffer.
    pub fn set_buffer(&mut self, id: &str, position: Position, store: Store) -> TargetId {
        let id = self.add_site(id, position, store);
        self.buffer = Some(id.clone());
        id
    }

    pub fn add_relay(&mut self, relay: RelayView) {
        self.relays.push(relay);
    }
}

impl WorldQuery for MemoryWorld {
    fn tick(&self) -> Ticks {
        self.tick
    }

    fn agent(&self, id: &AgentId) -> Option<AgentView> {
        self.agents.get(id).cloned()
    }

    fn site(&self, id: &TargetId) -> Option<SiteView> {
        if let Some(site) = self.sites.get(id) {
            return Some(site.clone());
        }
        self.relays.iter().find(|r| &r.id == id).map(|r| SiteView {
            id: r.id.clone(),
            position: r.position,
            store: r.store.clone(),
        })
    }

    fn buffer(&self) -> Option<SiteView> {
        self.buffer.as_ref().and_then(|id| self.sites.get(id).cloned())
    }

    fn relays(&self) -> Vec<RelayView> {
        self.relays.clone()
    }
}

// ===========================================================================
// Colony builder
// ===========================================================================

/// A deterministic colony with `agents` carriers and `requests` requests,
/// already registered on a default network. Even requests are NEEDs at
/// sinks, odd ones PROVIDEs at sources; every third agent starts loaded.
pub fn colony(agents: usize, requests: usize) -> (MemoryWorld, LogisticsNetwork) {
    let mut world = MemoryWorld::new();
    let mut net = LogisticsNetwork::default();
    world.set_buffer("storage", Position::new(25, 25), Store::new(10_000).with(energy(), 2_000));

    for i in 0..agents {
        let id = format!("hauler-{i}");
        let position = grid(i, 7, 11);
        let cargo = match i % 3 {
            0 => Store::new(50).with(energy(), 50),
            1 => Store::new(50),
            _ => Store::new(100).with(oxygen(), 20),
        };
        world.add_agent(&id, position, cargo);
        net.register_agent(id.as_str());
    }

    for i in 0..requests {
        let site = format!("site-{i}");
        let position = grid(i, 13, 5);
        let kind = if i % 4 == 3 { oxygen() } else { energy() };
        let amount = 20 + (i as u32 * 37) % 200;
        let request = if i % 2 == 0 {
            world.add_site(&site, position, Store::new(1_000));
            need(&format!("need-{i}"), &site, kind, amount)
        } else {
            world.add_site(&site, position, Store::new(1_000).with(kind, 500));
            provide(&format!("provide-{i}"), &site, kind, amount)
        };
        net.add_or_update_request(request);
    }

    (world, net)
}

fn grid(i: usize, a: usize, b: usize) -> Position {
    Position::new(((i * a) % 50) as i32, ((i * b + 3) % 50) as i32)
}
