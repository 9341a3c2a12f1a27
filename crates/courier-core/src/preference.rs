//! Ranked preference lists for both sides of the matching.
//!
//! Agents rank requests by their (saturation-adjusted) throughput score;
//! requests rank agents by raw score. Both lists only hold strictly positive
//! scores and are sorted descending with a stable sort, so equal scores keep
//! slice order.

use std::collections::BTreeMap;

use crate::evaluator::ThroughputEvaluator;
use crate::fixed::Fixed64;
use crate::id::{AgentId, RequestId};
use crate::request::TransferRequest;
use crate::store::Store;
use crate::world::WorldQuery;

/// One entry in a preference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked<K> {
    pub id: K,
    pub score: Fixed64,
}

/// Both sides' preference lists for one run.
///
/// Agents and requests with no viable counterpart have no list at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    agents: BTreeMap<AgentId, Vec<Ranked<RequestId>>>,
    requests: BTreeMap<RequestId, Vec<Ranked<AgentId>>>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an agent's list. Empty lists are not stored.
    pub fn set_agent_list(&mut self, agent: AgentId, mut list: Vec<Ranked<RequestId>>) {
        sort_descending(&mut list);
        if !list.is_empty() {
            self.agents.insert(agent, list);
        }
    }

    /// Set a request's list. Empty lists are not stored.
    pub fn set_request_list(&mut self, request: RequestId, mut list: Vec<Ranked<AgentId>>) {
        sort_descending(&mut list);
        if !list.is_empty() {
            self.requests.insert(request, list);
        }
    }

    pub fn agent_list(&self, agent: &AgentId) -> Option<&[Ranked<RequestId>]> {
        self.agents.get(agent).map(Vec::as_slice)
    }

    pub fn request_list(&self, request: &RequestId) -> Option<&[Ranked<AgentId>]> {
        self.requests.get(request).map(Vec::as_slice)
    }

    /// Position of `agent` in `request`'s list; lower is better.
    pub fn rank_of(&self, request: &RequestId, agent: &AgentId) -> Option<usize> {
        self.requests
            .get(request)?
            .iter()
            .position(|entry| &entry.id == agent)
    }

    /// Agents that have a list, in id order.
    pub fn agents(&self) -> impl Iterator<Item = &AgentId> + '_ {
        self.agents.keys()
    }

    pub fn requests(&self) -> impl Iterator<Item = &RequestId> + '_ {
        self.requests.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() || self.requests.is_empty()
    }
}

fn sort_descending<K>(list: &mut [Ranked<K>]) {
    list.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Builds [`Preferences`] from an evaluator and the run's slices.
#[derive(Debug, Default)]
pub struct PreferenceBuilder;

impl PreferenceBuilder {
    pub fn build<W: WorldQuery + ?Sized>(
        eval: &mut ThroughputEvaluator<'_, W>,
        agents: &[AgentId],
        requests: &[TransferRequest],
    ) -> Preferences {
        let mut prefs = Preferences::new();
        let saturated_weight = eval.weights().saturated_provide;
        let mut by_request: BTreeMap<RequestId, Vec<Ranked<AgentId>>> = BTreeMap::new();

        for agent in agents {
            let mut list = Vec::new();
            for request in requests {
                let Some(choice) = eval.evaluate(agent, request) else {
                    continue;
                };
                by_request.entry(request.id.clone()).or_default().push(Ranked {
                    id: agent.clone(),
                    score: choice.score,
                });
                list.push((request, choice.score));
            }

            if let Some(forecast) = eval.forecast(agent) {
                adjust_for_saturation(&mut list, &forecast.cargo, requests, saturated_weight);
            }

            let list = list
                .into_iter()
                .map(|(request, score)| Ranked {
                    id: request.id.clone(),
                    score,
                })
                .collect();
            prefs.set_agent_list(agent.clone(), list);
        }

        // Request lists follow slice order before sorting, same as agent lists.
        for request in requests {
            if let Some(list) = by_request.remove(&request.id) {
                prefs.set_request_list(request.id.clone(), list);
            }
        }

        prefs
    }
}

/// Full agents should unload before picking anything up.
///
/// If some NEED in the slice wants what the agent carries, PROVIDE candidates
/// are dropped. Otherwise they stay, scaled by `weight`.
fn adjust_for_saturation(
    list: &mut Vec<(&TransferRequest, Fixed64)>,
    cargo: &Store,
    requests: &[TransferRequest],
    weight: Fixed64,
) {
    if cargo.is_empty() || !cargo.is_full() {
        return;
    }
    let wanted = cargo
        .kinds()
        .any(|kind| requests.iter().any(|r| r.is_need() && r.resource == kind));
    if wanted {
        list.retain(|(request, _)| !request.is_provide());
    } else {
        for (request, score) in list.iter_mut() {
            if request.is_provide() {
                *score = score.saturating_mul(weight);
            }
        }
        list.retain(|(_, score)| *score > Fixed64::ZERO);
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PairMemo;
    use crate::config::ScoringWeights;
    use crate::matching::Matching;
    use crate::test_utils::*;
    use crate::world::Position;

    fn build(world: &MemoryWorld, agents: &[&str], requests: &[TransferRequest]) -> Preferences {
        let previous = Matching::new();
        let mut memo = PairMemo::new();
        memo.begin(world.tick());
        let mut eval = ThroughputEvaluator::new(world, ScoringWeights::default(), &previous, &mut memo);
        let agents: Vec<AgentId> = agents.iter().map(|a| AgentId::from(*a)).collect();
        PreferenceBuilder::build(&mut eval, &agents, requests)
    }

    fn ids<K: Clone>(list: &[Ranked<K>]) -> Vec<K> {
        list.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn closer_provide_ranks_first_for_idle_agent() {
        let mut world = MemoryWorld::new();
        world.add_agent("h", Position::new(0, 0), Store::new(50));
        world.add_site("container", Position::new(3, 0), Store::new(2000).with(energy(), 1000));
        world.add_site("spawn", Position::new(0, 5), Store::new(300));
        let requests = vec![
            provide("p", "container", energy(), 100),
            need("n", "spawn", energy(), 100),
        ];

        let prefs = build(&world, &["h"], &requests);
        let list = prefs.agent_list(&AgentId::from("h")).unwrap();
        assert_eq!(ids(list), vec![RequestId::from("p"), RequestId::from("n")]);
        assert!(list[0].score > list[1].score);
    }

    #[test]
    fn request_lists_rank_agents_by_raw_score() {
        let mut world = MemoryWorld::new();
        world.add_agent("far", Position::new(10, 0), Store::new(50));
        world.add_agent("near", Position::new(2, 0), Store::new(50));
        world.add_site("spawn", Position::new(0, 0), Store::new(300));
        let requests = vec![need("n", "spawn", energy(), 100)];

        let prefs = build(&world, &["far", "near"], &requests);
        let list = prefs.request_list(&RequestId::from("n")).unwrap();
        assert_eq!(ids(list), vec![AgentId::from("near"), AgentId::from("far")]);
        assert_eq!(prefs.rank_of(&RequestId::from("n"), &AgentId::from("far")), Some(1));
    }

    #[test]
    fn equal_scores_keep_slice_order() {
        let mut world = MemoryWorld::new();
        world.add_agent("h", Position::new(0, 0), Store::new(50));
        world.add_site("east", Position::new(4, 0), Store::new(300));
        world.add_site("west", Position::new(-4, 0), Store::new(300));
        let requests = vec![
            need("w", "west", energy(), 100),
            need("e", "east", energy(), 100),
        ];
        let prefs = build(&world, &["h"], &requests);
        let list = prefs.agent_list(&AgentId::from("h")).unwrap();
        assert_eq!(ids(list), vec![RequestId::from("w"), RequestId::from("e")]);
    }

    #[test]
    fn agents_without_viable_candidates_have_no_list() {
        let mut world = MemoryWorld::new();
        world.add_agent("full", Position::new(0, 0), Store::new(50).with(oxygen(), 50));
        world.add_site("container", Position::new(3, 0), Store::new(200).with(energy(), 100));
        let requests = vec![provide("p", "container", energy(), 100)];

        let prefs = build(&world, &["full"], &requests);
        assert!(prefs.agent_list(&AgentId::from("full")).is_none());
        assert!(prefs.request_list(&RequestId::from("p")).is_none());
        assert!(prefs.is_empty());
    }

    fn saturated_world() -> MemoryWorld {
        let mut world = MemoryWorld::new();
        world.add_agent("h", Position::new(0, 0), Store::new(50).with(oxygen(), 50));
        world.set_buffer("storage", Position::new(2, 0), Store::new(1000));
        world.add_site("container", Position::new(5, 0), Store::new(200).with(energy(), 100));
        world.add_site("lab", Position::new(0, 6), Store::new(300));
        world
    }

    #[test]
    fn saturated_agent_drops_provide_when_its_cargo_is_needed() {
        let world = saturated_world();
        let requests = vec![
            provide("p", "container", energy(), 100),
            need("n", "lab", oxygen(), 100),
        ];
        let prefs = build(&world, &["h"], &requests);
        let list = prefs.agent_list(&AgentId::from("h")).unwrap();
        assert_eq!(ids(list), vec![RequestId::from("n")]);

        // The request side still sees the raw pairing.
        assert!(prefs.request_list(&RequestId::from("p")).is_some());
    }

    #[test]
    fn saturated_agent_keeps_provide_at_reduced_score_otherwise() {
        let world = saturated_world();
        let requests = vec![provide("p", "container", energy(), 100)];
        let prefs = build(&world, &["h"], &requests);

        let agent_side = prefs.agent_list(&AgentId::from("h")).unwrap();
        let request_side = prefs.request_list(&RequestId::from("p")).unwrap();
        let raw = request_side[0].score;
        assert_eq!(agent_side.len(), 1);
        assert_eq!(
            agent_side[0].score,
            raw.saturating_mul(ScoringWeights::default().saturated_provide)
        );
        assert!(agent_side[0].score < raw);
    }

    #[test]
    fn saturation_does_not_touch_agents_with_room() {
        let mut world = saturated_world();
        world.add_agent("roomy", Position::new(0, 0), Store::new(50).with(oxygen(), 10));
        let requests = vec![provide("p", "container", energy(), 100)];
        let prefs = build(&world, &["roomy"], &requests);
        let agent_side = prefs.agent_list(&AgentId::from("roomy")).unwrap();
        let request_side = prefs.request_list(&RequestId::from("p")).unwrap();
        assert_eq!(agent_side[0].score, request_side[0].score);
    }
}
