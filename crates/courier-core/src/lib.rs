//! Courier Core -- transport assignment for colony logistics.
//!
//! Each operating area owns a [`network::LogisticsNetwork`]. The host bot
//! registers carrying agents and posts transfer requests (NEED or PROVIDE a
//! resource at a target), then asks the network, step by step, which agent
//! should serve which request.
//!
//! # Matching Run
//!
//! Each call to [`network::LogisticsNetwork::run_matching`]:
//!
//! 1. **Throttle** -- Reuse the last matching while it is fresh and young.
//! 2. **Slice** -- Take live agents and requests, capped at the configured maxima.
//! 3. **Score** -- [`evaluator::ThroughputEvaluator`] prices every pair by
//!    throughput (units per tick) over direct, buffer and relay routes.
//! 4. **Rank** -- [`preference::PreferenceBuilder`] builds both sides' lists,
//!    demoting pickups for agents that are already full.
//! 5. **Match** -- [`matcher::StableMatcher`] runs deferred acceptance with
//!    agents proposing, bounded by a round cap.
//!
//! # World Access
//!
//! The engine never holds live handles. Agents and sites are re-resolved by
//! id through [`world::WorldQuery`] on every run; anything that no longer
//! resolves is skipped for that step.
//!
//! # Key Types
//!
//! - [`request::TransferRequest`] -- A signed demand or supply at a target.
//! - [`matching::Matching`] -- The one-to-one agent/request assignment.
//! - [`evaluator::FulfillmentChoice`] -- Best route, quantity and score for a pair.
//! - [`config::EngineConfig`] -- Limits, cadence and scoring weights.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic scores.

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod evaluator;
pub mod fixed;
pub mod id;
pub mod matcher;
pub mod matching;
pub mod network;
pub mod preference;
pub mod registry;
pub mod request;
pub mod store;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
