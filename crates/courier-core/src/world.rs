//! World-query seam: the only way the engine observes agents and sites.
//!
//! Every lookup returns an owned snapshot taken at call time. The engine never
//! keeps a view across a step boundary; objects can move, die or be rebuilt
//! between steps, so identifiers are re-resolved on every run.

use crate::fixed::Ticks;
use crate::id::{AgentId, ResourceKind, TargetId};
use crate::store::Store;

/// Grid position inside one operating area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev range: diagonal moves cost the same as orthogonal ones.
    pub fn range_to(self, other: Position) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }
}

/// What an agent will do when it reaches its committed task target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    /// Take resources out of the target.
    Withdraw,
    /// Put resources into the target.
    Transfer,
}

/// The task an agent is currently executing, as reported by the movement
/// and execution layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTask {
    pub target: TargetId,
    /// Optional stop on the way (e.g. a buffer visited first).
    pub via: Option<TargetId>,
    pub action: TaskAction,
    pub resource: ResourceKind,
    pub amount: u32,
}

/// Snapshot of a carrying agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentView {
    pub id: AgentId,
    pub position: Position,
    pub cargo: Store,
    pub task: Option<CommittedTask>,
}

/// Snapshot of a world object with an inventory (request endpoint or buffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteView {
    pub id: TargetId,
    pub position: Position,
    pub store: Store,
}

/// Direction resources travel through a relay node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayFlow {
    /// The relay accepts resources from agents and ships them out of the area.
    Inbound,
    /// The relay receives resources from elsewhere for agents to pick up.
    Outbound,
}

/// Snapshot of a relay node (one endpoint of a directional link network).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayView {
    pub id: TargetId,
    pub position: Position,
    pub resource: ResourceKind,
    pub flow: RelayFlow,
    pub store: Store,
}

/// Read-only access to the world for one operating area.
///
/// Implemented by the host bot. Lookups return `None` when the object no
/// longer exists; the engine treats that as "absent this step".
pub trait WorldQuery {
    /// The current step counter.
    fn tick(&self) -> Ticks;

    fn agent(&self, id: &AgentId) -> Option<AgentView>;

    fn site(&self, id: &TargetId) -> Option<SiteView>;

    /// The shared storage buffer of the area, if one exists.
    fn buffer(&self) -> Option<SiteView> {
        None
    }

    /// Relay nodes in the area, in a stable order.
    fn relays(&self) -> Vec<RelayView> {
        Vec::new()
    }

    /// Travel time between two positions. Defaults to grid range; hosts with
    /// terrain costs can override.
    fn distance(&self, from: Position, to: Position) -> Ticks {
        Ticks::from(from.range_to(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_chebyshev() {
        let a = Position::new(0, 0);
        assert_eq!(a.range_to(Position::new(3, 1)), 3);
        assert_eq!(a.range_to(Position::new(-2, 5)), 5);
        assert_eq!(a.range_to(a), 0);
    }

    #[test]
    fn range_handles_extreme_coordinates() {
        let a = Position::new(i32::MIN, 0);
        let b = Position::new(i32::MAX, 0);
        assert_eq!(a.range_to(b), u32::MAX);
    }

    struct EmptyWorld;

    impl WorldQuery for EmptyWorld {
        fn tick(&self) -> Ticks {
            7
        }
        fn agent(&self, _id: &AgentId) -> Option<AgentView> {
            None
        }
        fn site(&self, _id: &TargetId) -> Option<SiteView> {
            None
        }
    }

    #[test]
    fn default_methods_report_no_buffer_or_relays() {
        let world = EmptyWorld;
        assert!(world.buffer().is_none());
        assert!(world.relays().is_empty());
        assert_eq!(
            world.distance(Position::new(1, 1), Position::new(4, 2)),
            3
        );
    }
}
