use bouncer::{Candidate, Engine, Ledger, Scenario, ScenarioConfig, SimulatedSource};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");

    for (name, scenario) in [
        ("two", Scenario::TwoAttributes),
        ("four", Scenario::FourAttributes),
        ("six", Scenario::SixAttributes),
    ] {
        let cfg = ScenarioConfig::preset(scenario);
        let engine = Engine::new(&cfg).unwrap();

        // A mid-run ledger: 400 admissions drawn from the simulator, so the
        // window is full and every stage can be reached.
        let mut ledger = Ledger::new(&cfg).unwrap();
        let mut sim = SimulatedSource::new(&cfg, 17, u64::MAX).unwrap();
        for _ in 0..400 {
            ledger.record_accept(sim.sample_combo()).unwrap();
        }
        let candidates: Vec<Candidate> = sim.by_ref().take(1024).collect();

        group.bench_with_input(BenchmarkId::new("preset", name), &candidates, |b, cs| {
            b.iter(|| {
                for cand in cs {
                    black_box(engine.decide(cand, &ledger).unwrap());
                }
            })
        });
    }

    group.finish();
}

fn bench_score_table(c: &mut Criterion) {
    let cfg = ScenarioConfig::preset(Scenario::SixAttributes);
    c.bench_function("score_table/six", |b| {
        b.iter(|| black_box(bouncer::ScoreTable::new(&cfg).unwrap()))
    });
}

criterion_group!(benches, bench_decide, bench_score_table);
criterion_main!(benches);
