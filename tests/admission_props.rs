//! Property tests over arbitrary scenarios and arrival streams.

use bouncer::{
    adjusted_p, AttributeSpec, Candidate, Combo, Decision, DecisionNote, DecisionStage, Engine,
    EstimatorConfig, Ledger, Phase, ScenarioConfig,
};
use proptest::prelude::*;

/// A scenario with `k = mins.len()` attributes; `mins` are fractions of capacity.
fn scenario(capacity: u32, mins: &[f64], priors: &[f64], rho: f64) -> ScenarioConfig {
    let attrs = mins
        .iter()
        .zip(priors)
        .enumerate()
        .map(|(i, (&m, &p))| AttributeSpec::new(format!("a{i}"), (m * f64::from(capacity)) as u32, p))
        .collect();
    let mut cfg = ScenarioConfig::new(attrs, capacity);
    if mins.len() >= 2 {
        cfg = cfg.with_correlation("a0", "a1", rho);
    }
    cfg
}

fn scenario_strategy() -> impl Strategy<Value = ScenarioConfig> {
    (1usize..=4, 10u32..150, -0.8f64..0.8).prop_flat_map(|(k, capacity, rho)| {
        (
            prop::collection::vec(0.0f64..0.6, k),
            prop::collection::vec(0.05f64..0.95, k),
        )
            .prop_map(move |(mins, priors)| scenario(capacity, &mins, &priors, rho))
    })
}

/// One step of a driven run: the ledger before the decision plus the decision.
struct Step {
    before: Ledger,
    combo: Combo,
    decision: Decision,
}

fn drive(cfg: &ScenarioConfig, stream: &[u16]) -> (Vec<Step>, Ledger) {
    let engine = Engine::new(cfg).unwrap();
    let mut ledger = Ledger::new(cfg).unwrap();
    let mask = (1u16 << cfg.attributes.len()) - 1;
    let mut steps = Vec::new();
    for &bits in stream {
        if ledger.phase() == Phase::Closed {
            break;
        }
        let combo = Combo::from_bits(bits & mask);
        let decision = engine.decide(&Candidate::new(combo), &ledger).unwrap();
        let before = ledger.clone();
        if decision.accepted() {
            ledger.record_accept(combo).unwrap();
        }
        steps.push(Step {
            before,
            combo,
            decision,
        });
    }
    (steps, ledger)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A forced reject names only attributes whose quota the seat would make unreachable.
    #[test]
    fn forced_reject_implies_unreachable_quota(
        cfg in scenario_strategy(),
        stream in prop::collection::vec(any::<u16>(), 0..400),
    ) {
        let (steps, _) = drive(&cfg, &stream);
        for s in &steps {
            for note in &s.decision.notes {
                if let DecisionNote::ForcedReject { attributes } = note {
                    prop_assert!(!s.decision.accepted());
                    prop_assert!(!attributes.is_empty());
                    let r = s.before.remaining();
                    for a in attributes.iter() {
                        prop_assert!(!s.combo.has(a));
                        prop_assert!(r == 0 || r - 1 < s.before.need(a));
                    }
                }
            }
        }
    }

    /// A forced accept names only attributes the candidate has with `need >= R`.
    #[test]
    fn forced_accept_implies_every_seat_needed(
        cfg in scenario_strategy(),
        stream in prop::collection::vec(any::<u16>(), 0..400),
    ) {
        let (steps, _) = drive(&cfg, &stream);
        for s in &steps {
            if let Some(DecisionNote::ForcedAccept { attributes }) = s.decision.notes.first() {
                prop_assert!(s.decision.accepted());
                for a in attributes.iter() {
                    prop_assert!(s.combo.has(a));
                    prop_assert!(s.before.need(a) >= s.before.remaining());
                }
            }
        }
    }

    /// `need` never increases and `admitted` never decreases.
    #[test]
    fn need_is_monotone(
        cfg in scenario_strategy(),
        stream in prop::collection::vec(any::<u16>(), 0..400),
    ) {
        let (steps, last) = drive(&cfg, &stream);
        let k = cfg.attributes.len();
        let mut states: Vec<&Ledger> = steps.iter().map(|s| &s.before).collect();
        states.push(&last);
        for w in states.windows(2) {
            prop_assert!(w[1].admitted() >= w[0].admitted());
            for a in 0..k {
                prop_assert!(w[1].need(a) <= w[0].need(a));
            }
        }
    }

    /// From a feasible start, filling capacity always meets every quota.
    #[test]
    fn full_run_meets_every_quota(
        cfg in scenario_strategy(),
        stream in prop::collection::vec(any::<u16>(), 0..1500),
    ) {
        let (_, last) = drive(&cfg, &stream);
        if last.phase() == Phase::Closed {
            prop_assert!(last.unmet().is_empty(), "unmet {:?}", last.unmet());
        }
        // Seats left always suffice for what is still needed.
        for a in 0..cfg.attributes.len() {
            prop_assert!(last.need(a) <= last.remaining());
        }
    }

    /// Once every quota is met, every later candidate is admitted.
    #[test]
    fn all_met_admits_everyone(
        cfg in scenario_strategy(),
        stream in prop::collection::vec(any::<u16>(), 0..400),
    ) {
        let (steps, _) = drive(&cfg, &stream);
        let mut met = false;
        for s in &steps {
            met |= s.before.phase() == Phase::AllMet;
            if met {
                prop_assert!(s.decision.accepted());
                prop_assert_eq!(s.decision.stage, DecisionStage::AllMet);
            }
        }
    }

    /// Decisions and scores are pure functions of (candidate, ledger).
    #[test]
    fn decisions_are_idempotent(
        cfg in scenario_strategy(),
        stream in prop::collection::vec(any::<u16>(), 0..200),
    ) {
        let engine = Engine::new(&cfg).unwrap();
        let (steps, _) = drive(&cfg, &stream);
        for s in steps.iter().filter(|s| s.before.phase() != Phase::Closed) {
            let c = Candidate::new(s.combo);
            let again = engine.decide(&c, &s.before).unwrap();
            prop_assert_eq!(&again, &s.decision);
            prop_assert_eq!(
                engine.score(s.combo, &s.before).unwrap(),
                engine.score(s.combo, &s.before).unwrap()
            );
        }
    }

    /// Frequency estimates stay inside the clamp for any window and prior.
    #[test]
    fn estimates_stay_in_bounds(
        prior in 0.0f64..=1.0,
        window in prop::collection::vec(any::<bool>(), 0..300),
        window_cap in 1usize..200,
    ) {
        let mut cfg = ScenarioConfig::new(vec![AttributeSpec::new("a", 0, prior)], 1000);
        cfg.engine.window_cap = window_cap;
        let mut ledger = Ledger::new(&cfg).unwrap();
        for has in window {
            ledger.record_accept(Combo::from_flags(&[has])).unwrap();
        }
        let p = adjusted_p(&ledger, 0, &EstimatorConfig::default());
        prop_assert!((0.01..=0.99).contains(&p), "p={}", p);
    }
}
