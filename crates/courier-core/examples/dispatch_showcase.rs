//! Dispatch showcase: one area, four haulers, five requests.
//!
//! Builds a small colony with a shared storage buffer and an outbound relay,
//! runs a matching, prints every assignment with its route and score, then
//! completes a request and shows what changes on the next run.
//!
//! Run with: `RUST_LOG=courier_core=debug cargo run -p courier-core --example dispatch_showcase`

use courier_core::cache::PairMemo;
use courier_core::config::EngineConfig;
use courier_core::evaluator::ThroughputEvaluator;
use courier_core::fixed::fixed64_to_f64;
use courier_core::id::{AgentId, RequestId};
use courier_core::matching::AssignmentChange;
use courier_core::network::LogisticsNetwork;
use courier_core::store::Store;
use courier_core::test_utils::*;
use courier_core::world::{Position, RelayFlow, WorldQuery};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
rematch_interval = 3
max_agents = 10

[weights]
mixed_cargo_need = 0.5
mixed_cargo_provide = 0.3
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = EngineConfig::from_toml_str(CONFIG)?;
    let mut net = LogisticsNetwork::new(config)?;
    let mut world = MemoryWorld::new();

    // --- Area layout ---

    world.set_buffer("storage", Position::new(20, 20), Store::new(5_000).with(energy(), 1_200));
    world.add_relay(relay("link-east", Position::new(35, 20), energy(), RelayFlow::Outbound, 600));
    world.add_site("source-north", Position::new(18, 4), Store::new(2_000).with(energy(), 900));
    world.add_site("spawn", Position::new(22, 24), Store::new(300).with(energy(), 100));
    world.add_site("tower", Position::new(40, 22), Store::new(1_000).with(energy(), 200));
    world.add_site("extractor", Position::new(5, 30), Store::new(2_000).with(oxygen(), 700));
    world.add_site("lab", Position::new(30, 35), Store::new(3_000));

    // --- Haulers ---

    world.add_agent("hauler-1", Position::new(17, 6), Store::new(100));
    world.add_agent("hauler-2", Position::new(21, 22), Store::new(100).with(energy(), 60));
    world.add_agent("hauler-3", Position::new(38, 18), Store::new(50).with(oxygen(), 50));
    world.add_agent("hauler-4", Position::new(8, 28), Store::new(100));
    for id in ["hauler-1", "hauler-2", "hauler-3", "hauler-4"] {
        net.register_agent(id);
    }

    // --- Requests ---

    net.add_or_update_request(provide("harvest-north", "source-north", energy(), 900));
    net.add_or_update_request(need("refill-spawn", "spawn", energy(), 200));
    net.add_or_update_request(need("charge-tower", "tower", energy(), 800).with_rate_of_change(fixed(1.5)));
    net.add_or_update_request(provide("haul-oxygen", "extractor", oxygen(), 700));
    net.add_or_update_request(
        need("stock-lab", "lab", oxygen(), 500).with_priority_multiplier(fixed(2.0))?,
    );

    // --- First run ---

    let matching = net.run_matching(&world).clone();
    println!("=== Tick {} ===", world.tick());
    print_assignments(&net, &world);

    // --- The spawn fills up; its request goes away ---

    world.advance(1);
    world.set_site_store("spawn", Store::new(300).with(energy(), 300));
    net.remove_request(&RequestId::from("refill-spawn"));
    net.run_matching(&world);

    println!("\n=== Tick {} (after refill-spawn completed) ===", world.tick());
    print_assignments(&net, &world);
    for change in net.assignment_changes(&matching) {
        match change {
            AssignmentChange::Assigned { agent, request } => println!("  + {agent} -> {request}"),
            AssignmentChange::Reassigned { agent, from, to } => println!("  ~ {agent}: {from} -> {to}"),
            AssignmentChange::Released { agent, request } => println!("  - {agent} released {request}"),
        }
    }

    if let Some(report) = net.last_report() {
        println!(
            "\n{} agents, {} requests, {} pairs scored, {} rounds, utilization {:.0}%",
            report.agents_considered,
            report.requests_considered,
            report.pairs_evaluated,
            report.rounds,
            report.utilization() * 100.0,
        );
    }

    Ok(())
}

fn print_assignments(net: &LogisticsNetwork, world: &MemoryWorld) {
    let previous = net.matching().clone();
    let mut memo = PairMemo::new();
    memo.begin(world.tick());
    let weights = net.config().validate().unwrap_or_default();
    let mut eval = ThroughputEvaluator::new(world, weights, &previous, &mut memo);

    for agent in net.agents().iter() {
        match net.assignment(agent) {
            Some(request) => {
                let detail = eval
                    .evaluate(agent, request)
                    .map(|c| format!("{:?}, {} units in {} ticks, score {:.2}", c.route, c.quantity, c.elapsed, fixed64_to_f64(c.score)))
                    .unwrap_or_else(|| "no longer viable".to_string());
                println!("  {:<10} -> {:<14} ({detail})", agent.as_str(), request.id.as_str());
            }
            None => println!("  {:<10} -> idle", AgentId::as_str(agent)),
        }
    }
}
