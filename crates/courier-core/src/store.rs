use crate::id::ResourceKind;
use serde::{Deserialize, Serialize};

/// A quantity of one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStack {
    pub kind: ResourceKind,
    pub quantity: u32,
}

/// Capacity-bounded, multi-resource inventory snapshot.
///
/// Used for agent cargo, site contents, the shared buffer and relay nodes.
/// All kinds share a single capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub stacks: Vec<ResourceStack>,
    pub capacity: u32,
}

impl Store {
    pub fn new(capacity: u32) -> Self {
        Self {
            stacks: Vec::new(),
            capacity,
        }
    }

    /// Builder-style add for constructing snapshots. Excess is dropped.
    pub fn with(mut self, kind: ResourceKind, quantity: u32) -> Self {
        let _ = self.add(kind, quantity);
        self
    }

    /// Add resources. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates resources that did not fit"]
    pub fn add(&mut self, kind: ResourceKind, quantity: u32) -> u32 {
        let to_add = quantity.min(self.free_capacity());
        let overflow = quantity - to_add;

        if to_add > 0 {
            if let Some(stack) = self.stacks.iter_mut().find(|s| s.kind == kind) {
                stack.quantity += to_add;
            } else {
                self.stacks.push(ResourceStack {
                    kind,
                    quantity: to_add,
                });
            }
        }

        overflow
    }

    /// Remove resources. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, kind: ResourceKind, quantity: u32) -> u32 {
        if let Some(stack) = self.stacks.iter_mut().find(|s| s.kind == kind) {
            let to_remove = quantity.min(stack.quantity);
            stack.quantity -= to_remove;
            if stack.quantity == 0 {
                self.stacks.retain(|s| s.quantity > 0);
            }
            to_remove
        } else {
            0
        }
    }

    pub fn quantity(&self, kind: ResourceKind) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.quantity)
            .unwrap_or(0)
    }

    /// Total units across all kinds.
    pub fn total(&self) -> u32 {
        self.stacks.iter().map(|s| s.quantity).sum()
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.total())
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free_capacity() == 0
    }

    /// Units held of kinds other than `kind`.
    pub fn other_than(&self, kind: ResourceKind) -> u32 {
        self.total() - self.quantity(kind)
    }

    /// Resource kinds currently held (non-zero stacks only).
    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.stacks
            .iter()
            .filter(|s| s.quantity > 0)
            .map(|s| s.kind)
    }
}
