//! Run each preset against the simulator and print the report.
//!
//! ```text
//! RUST_LOG=bouncer=info cargo run --example simulate -- 7
//! ```

use bouncer::{run, Engine, Ledger, MemorySink, Scenario, ScenarioConfig, SimulatedSource};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let seed: u64 = std::env::args()
        .nth(1)
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(0);

    for scenario in [
        Scenario::TwoAttributes,
        Scenario::FourAttributes,
        Scenario::SixAttributes,
    ] {
        let cfg = ScenarioConfig::preset(scenario);
        let engine = Engine::new(&cfg)?;
        let mut ledger = Ledger::new(&cfg)?;
        let mut source = SimulatedSource::new(&cfg, seed, 1_000_000)?;
        let mut sink = MemorySink::default();
        let report = run(&engine, &mut ledger, &mut source, &mut sink)?;

        println!("{scenario:?} seed={seed}");
        println!(
            "  status={:?} admitted={} rejected={} forced_accepts={} forced_rejects={}",
            report.status,
            report.admitted,
            report.rejected,
            report.forced_accepts,
            report.forced_rejects
        );
        for (a, spec) in cfg.attributes.iter().enumerate() {
            println!(
                "  {:<22} {:>4} / {:<4} (effective {})",
                spec.name,
                ledger.count(a),
                spec.min_count,
                ledger.min_count(a)
            );
        }

        let mut by_stage = std::collections::BTreeMap::new();
        for e in sink.entries() {
            let slot = by_stage
                .entry(format!("{:?}", e.decision.stage))
                .or_insert((0u32, 0u32));
            if e.decision.accepted() {
                slot.0 += 1;
            } else {
                slot.1 += 1;
            }
        }
        for (stage, (acc, rej)) in by_stage {
            println!("  {stage:<14} accepted={acc:<5} rejected={rej}");
        }
    }
    Ok(())
}
