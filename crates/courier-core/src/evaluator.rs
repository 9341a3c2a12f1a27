//! Throughput scoring for one (agent, request) pair.
//!
//! The evaluator predicts where an agent will be once its current task is
//! done, then prices every delivery strategy it can use for the request:
//!
//! - [`RouteVia::Direct`] -- straight to the request target.
//! - [`RouteVia::Buffer`] -- through the area's shared storage first.
//! - [`RouteVia::Relay`] -- through a relay node whose flow suits the request.
//!
//! Each strategy yields a deliverable quantity and an elapsed time; the score
//! is their ratio (dq/dt), weighted by cargo penalties and the request's
//! priority multiplier. The best strategy wins. Results are memoized per step
//! in a [`PairMemo`].

use std::collections::HashMap;

use crate::cache::PairMemo;
use crate::config::ScoringWeights;
use crate::fixed::{checked_div_64, checked_mul_64, from_quantity, to_quantity, Fixed64, Ticks};
use crate::id::{AgentId, TargetId};
use crate::matching::Matching;
use crate::request::{RequestKind, TransferRequest};
use crate::store::Store;
use crate::world::{AgentView, Position, RelayFlow, RelayView, SiteView, TaskAction, WorldQuery};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Physical route chosen for a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteVia {
    Direct,
    Buffer(TargetId),
    Relay(TargetId),
}

/// The best way one agent can serve one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentChoice {
    /// Units the agent can move for this request.
    pub quantity: u32,
    /// Ticks until the transfer completes, including the current task.
    pub elapsed: Ticks,
    /// Weighted quantity per tick.
    pub score: Fixed64,
    pub route: RouteVia,
}

/// Predicted state of an agent once its committed task is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentForecast {
    pub ready_in: Ticks,
    pub position: Position,
    pub cargo: Store,
}

/// Quantity and cargo weight for one strategy, before timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Leg {
    quantity: u32,
    weight: Fixed64,
}

impl Leg {
    fn full(quantity: u32) -> Option<Leg> {
        Self::weighted(quantity, Fixed64::ONE)
    }

    fn weighted(quantity: u32, weight: Fixed64) -> Option<Leg> {
        (quantity > 0).then_some(Leg { quantity, weight })
    }
}

// ---------------------------------------------------------------------------
// Availability window
// ---------------------------------------------------------------------------

/// Predict when and where `agent` becomes free, and what it will carry.
///
/// An idle agent, or one whose task target no longer resolves, is free now
/// at its current position.
pub fn forecast_agent<W: WorldQuery + ?Sized>(
    world: &W,
    agent: &AgentView,
    service_ticks: Ticks,
) -> AgentForecast {
    let idle = AgentForecast {
        ready_in: 0,
        position: agent.position,
        cargo: agent.cargo.clone(),
    };
    let Some(task) = &agent.task else {
        return idle;
    };
    let Some(target) = world.site(&task.target) else {
        return idle;
    };

    let mut travel: Ticks = 0;
    let mut position = agent.position;
    if let Some(stop) = task.via.as_ref().and_then(|via| world.site(via)) {
        travel += world.distance(position, stop.position);
        position = stop.position;
    }
    travel += world.distance(position, target.position);

    let mut cargo = agent.cargo.clone();
    match task.action {
        TaskAction::Withdraw => {
            let take = task.amount.min(target.store.quantity(task.resource));
            // Whatever does not fit stays at the target.
            let _overflow = cargo.add(task.resource, take);
        }
        TaskAction::Transfer => {
            let give = task.amount.min(target.store.free_capacity());
            let _delivered = cargo.remove(task.resource, give);
        }
    }

    AgentForecast {
        ready_in: travel + service_ticks,
        position: target.position,
        cargo,
    }
}

// ---------------------------------------------------------------------------
// Quantity model
// ---------------------------------------------------------------------------

/// Units the request will still need (or offer) when an agent arrives after
/// `eta` ticks, after another agent's reservation, bounded by the site.
fn predicted_amount(request: &TransferRequest, site: &SiteView, eta: Ticks, reserved: u32) -> u32 {
    let drift = request.rate_of_change.saturating_mul(from_quantity(eta));
    let base = from_quantity(u64::from(request.amount)).saturating_add(drift);
    let open = to_quantity(base).saturating_sub(reserved);
    let bound = match request.kind {
        RequestKind::Need => site.store.free_capacity(),
        RequestKind::Provide => site.store.quantity(request.resource),
    };
    open.min(bound)
}

fn direct_leg(cargo: &Store, request: &TransferRequest, open: u32, weights: &ScoringWeights) -> Option<Leg> {
    let carried = cargo.quantity(request.resource);
    let free = cargo.free_capacity();
    match request.kind {
        RequestKind::Need => {
            if carried > 0 {
                Leg::full(open.min(carried))
            } else if cargo.is_empty() {
                Leg::full(open.min(cargo.capacity))
            } else if free > 0 {
                Leg::weighted(open.min(free), weights.mixed_cargo_need)
            } else {
                None
            }
        }
        RequestKind::Provide => {
            if free == 0 {
                // Full: must deliver before picking anything up.
                None
            } else if cargo.other_than(request.resource) == 0 {
                Leg::full(open.min(free))
            } else {
                Leg::weighted(open.min(free), weights.mixed_cargo_provide)
            }
        }
    }
}

fn buffer_leg(cargo: &Store, request: &TransferRequest, open: u32, buffer: &Store) -> Option<Leg> {
    let carried = cargo.quantity(request.resource);
    let free = cargo.free_capacity();
    let quantity = match request.kind {
        RequestKind::Need => {
            let stock = buffer.quantity(request.resource);
            if free == 0 && carried < open {
                // The buffer takes the current cargo, then the agent withdraws.
                open.min(buffer.free_capacity())
                    .min(cargo.total())
                    .min(carried + stock)
            } else {
                open.min(carried + free.min(stock))
            }
        }
        RequestKind::Provide => {
            // Unload everything the buffer can hold, then pick up.
            let unloaded = cargo.total().min(buffer.free_capacity());
            open.min(free + unloaded)
        }
    };
    Leg::full(quantity)
}

fn relay_leg(cargo: &Store, request: &TransferRequest, open: u32, relay: &RelayView) -> Option<Leg> {
    let carried = cargo.quantity(request.resource);
    let free = cargo.free_capacity();
    let quantity = match (request.kind, relay.flow) {
        (RequestKind::Need, RelayFlow::Outbound) => {
            open.min(carried + free.min(relay.store.quantity(request.resource)))
        }
        (RequestKind::Provide, RelayFlow::Inbound) => {
            open.min(free + carried.min(relay.store.free_capacity()))
        }
        _ => 0,
    };
    Leg::full(quantity)
}

fn relay_compatible(relay: &RelayView, request: &TransferRequest) -> bool {
    relay.id != request.target
        && relay.resource == request.resource
        && matches!(
            (request.kind, relay.flow),
            (RequestKind::Need, RelayFlow::Outbound) | (RequestKind::Provide, RelayFlow::Inbound)
        )
}

/// Weighted dq/dt. Rejects overflow and non-positive results.
fn throughput(leg: Leg, elapsed: Ticks, multiplier: Fixed64) -> Option<Fixed64> {
    let dt = from_quantity(elapsed.max(1));
    let weighted = checked_mul_64(from_quantity(u64::from(leg.quantity)), leg.weight)?;
    let weighted = checked_mul_64(weighted, multiplier)?;
    let score = checked_div_64(weighted, dt)?;
    (score > Fixed64::ZERO).then_some(score)
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Scores (agent, request) pairs for one matching run.
///
/// Borrows the world, the previous matching (for reservations) and the pair
/// memo for the duration of the run. Site snapshots are cached for the run.
pub struct ThroughputEvaluator<'a, W: WorldQuery + ?Sized> {
    world: &'a W,
    weights: ScoringWeights,
    reservations: &'a Matching,
    memo: &'a mut PairMemo,
    tick: Ticks,
    buffer: Option<SiteView>,
    relays: Vec<RelayView>,
    sites: HashMap<TargetId, Option<SiteView>>,
}

impl<'a, W: WorldQuery + ?Sized> ThroughputEvaluator<'a, W> {
    pub fn new(
        world: &'a W,
        weights: ScoringWeights,
        reservations: &'a Matching,
        memo: &'a mut PairMemo,
    ) -> Self {
        Self {
            tick: world.tick(),
            buffer: world.buffer(),
            relays: world.relays(),
            world,
            weights,
            reservations,
            memo,
            sites: HashMap::new(),
        }
    }

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Resolve a site for this run. `None` means the target is gone.
    pub fn site(&mut self, id: &TargetId) -> Option<SiteView> {
        if let Some(cached) = self.sites.get(id) {
            return cached.clone();
        }
        let resolved = self.world.site(id);
        self.sites.insert(id.clone(), resolved.clone());
        resolved
    }

    /// The agent's post-task forecast, or `None` if the agent is gone.
    pub fn forecast(&mut self, agent: &AgentId) -> Option<AgentForecast> {
        if let Some(hit) = self.memo.forecast(agent, self.tick) {
            return hit;
        }
        let forecast = self
            .world
            .agent(agent)
            .map(|view| forecast_agent(self.world, &view, self.weights.service_ticks));
        self.memo.store_forecast(agent.clone(), self.tick, forecast.clone());
        forecast
    }

    /// Best strategy for `agent` serving `request`, memoized for this step.
    pub fn evaluate(&mut self, agent: &AgentId, request: &TransferRequest) -> Option<FulfillmentChoice> {
        if let Some(hit) = self.memo.choice(agent, &request.id, self.tick) {
            return hit;
        }
        let choice = self.compute(agent, request);
        self.memo
            .store_choice(agent.clone(), request.id.clone(), self.tick, choice.clone());
        choice
    }

    /// Units already spoken for by the other agent matched to this request.
    fn reserved(&mut self, agent: &AgentId, request: &TransferRequest) -> u32 {
        let reservations = self.reservations;
        let Some(holder) = reservations.agent_for(&request.id) else {
            return 0;
        };
        if holder == agent {
            return 0;
        }
        self.forecast(holder)
            .map(|f| match request.kind {
                RequestKind::Need => f.cargo.quantity(request.resource),
                RequestKind::Provide => f.cargo.free_capacity(),
            })
            .unwrap_or(0)
    }

    fn compute(&mut self, agent: &AgentId, request: &TransferRequest) -> Option<FulfillmentChoice> {
        let forecast = self.forecast(agent)?;
        let site = self.site(&request.target)?;
        let reserved = self.reserved(agent, request);
        let world = self.world;
        let from = forecast.position;
        let mut best: Option<FulfillmentChoice> = None;

        let mut consider = |leg: Option<Leg>, elapsed: Ticks, route: RouteVia| {
            let Some(leg) = leg else {
                return;
            };
            let Some(score) = throughput(leg, elapsed, request.priority_multiplier) else {
                return;
            };
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(FulfillmentChoice {
                    quantity: leg.quantity,
                    elapsed,
                    score,
                    route,
                });
            }
        };

        let elapsed = forecast.ready_in + world.distance(from, site.position);
        let open = predicted_amount(request, &site, elapsed, reserved);
        consider(
            direct_leg(&forecast.cargo, request, open, &self.weights),
            elapsed,
            RouteVia::Direct,
        );

        if let Some(buffer) = self.buffer.as_ref().filter(|b| b.id != request.target) {
            let elapsed = forecast.ready_in
                + world.distance(from, buffer.position)
                + world.distance(buffer.position, site.position);
            let open = predicted_amount(request, &site, elapsed, reserved);
            consider(
                buffer_leg(&forecast.cargo, request, open, &buffer.store),
                elapsed,
                RouteVia::Buffer(buffer.id.clone()),
            );
        }

        for relay in self.relays.iter().filter(|r| relay_compatible(r, request)) {
            let elapsed = forecast.ready_in
                + world.distance(from, relay.position)
                + world.distance(relay.position, site.position);
            let open = predicted_amount(request, &site, elapsed, reserved);
            consider(
                relay_leg(&forecast.cargo, request, open, relay),
                elapsed,
                RouteVia::Relay(relay.id.clone()),
            );
        }

        best
    }
}

// ===========================================================================
// Tests
// ===========================================================================
