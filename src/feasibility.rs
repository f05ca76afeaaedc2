//! Hard feasibility guard.
//!
//! Exact integer arithmetic, no estimation.  This is always evaluated first:
//!
//! - For an attribute `a` the candidate **lacks**: if `R - 1 < need[a]`, even
//!   filling every later seat with `a`-carriers could not close the gap once
//!   this seat is spent, so the candidate must be rejected.
//! - For an attribute `a` the candidate **has**: if `need[a] >= R`, every
//!   remaining seat is required for `a`, so the candidate must be accepted.
//!   (`need[a] > R` only happens for an externally supplied state that is
//!   already lost; taking carriers still shrinks the shortfall.)
//!
//! When both signals fire for different attributes, reject wins: a
//! provably-unreachable quota is never risked.

use crate::{Combo, Ledger};

/// Outcome of the feasibility guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GuardVerdict {
    ForceAccept,
    ForceReject,
    NoDecision,
}

/// Guard verdict plus the attributes behind each signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeasibilityDecision {
    pub verdict: GuardVerdict,
    /// Attributes the candidate lacks whose quota would become unreachable.
    pub reject_for: Combo,
    /// Attributes the candidate has whose quota needs every remaining seat.
    pub accept_for: Combo,
}

impl FeasibilityDecision {
    /// Whether the guard decided outright.
    pub fn is_forced(&self) -> bool {
        self.verdict != GuardVerdict::NoDecision
    }

    /// Whether accept and reject signals fired together (resolved to reject).
    pub fn is_conflict(&self) -> bool {
        !self.reject_for.is_empty() && !self.accept_for.is_empty()
    }
}

/// Apply the feasibility guard to `combo` against the current ledger.
///
/// With `R = 0` nothing can be admitted; every attribute with a shortfall
/// then counts as a reject signal.
pub fn check_feasibility(combo: Combo, ledger: &Ledger) -> FeasibilityDecision {
    let r = ledger.remaining();
    let mut reject_for = Combo::EMPTY;
    let mut accept_for = Combo::EMPTY;

    for a in 0..ledger.attribute_count() {
        let need = ledger.need(a);
        if need == 0 {
            continue;
        }
        if combo.has(a) {
            if r > 0 && need >= r {
                accept_for = accept_for.with(a);
            }
        } else if r == 0 || r - 1 < need {
            reject_for = reject_for.with(a);
        }
    }

    let verdict = if !reject_for.is_empty() || (r == 0 && !ledger.unmet().is_empty()) {
        GuardVerdict::ForceReject
    } else if !accept_for.is_empty() {
        GuardVerdict::ForceAccept
    } else {
        GuardVerdict::NoDecision
    };

    FeasibilityDecision {
        verdict,
        reject_for,
        accept_for,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttributeSpec, EngineConfig, LedgerSnapshot, ScenarioConfig};

    fn single(min: u32, cap: u32) -> ScenarioConfig {
        ScenarioConfig::new(vec![AttributeSpec::new("a", min, 0.5)], cap)
    }

    fn resume(cfg: &ScenarioConfig, admitted: u32, counts: Vec<u32>) -> Ledger {
        let snap = LedgerSnapshot {
            capacity: cfg.engine.capacity,
            minimums: cfg.effective_minimums(),
            admitted,
            counts,
            window: vec![],
        };
        Ledger::from_snapshot(cfg, snap).unwrap()
    }

    #[test]
    fn slack_means_no_decision() {
        // N=1000, min=500, admitted=400, count=100 → R=600, need=400, R-1=599 >= 400.
        let cfg = single(500, 1000);
        let l = resume(&cfg, 400, vec![100]);
        assert_eq!(l.remaining(), 600);
        assert_eq!(l.need(0), 400);
        let d = check_feasibility(Combo::EMPTY, &l);
        assert_eq!(d.verdict, GuardVerdict::NoDecision);
        assert!(!d.is_forced());
    }

    #[test]
    fn need_equal_to_remaining_forces_reject_for_non_carrier() {
        // admitted=600, count=100 → R=400, need=400.
        let cfg = single(500, 1000);
        let l = resume(&cfg, 600, vec![100]);
        assert_eq!(l.remaining(), 400);
        let d = check_feasibility(Combo::EMPTY, &l);
        assert_eq!(d.verdict, GuardVerdict::ForceReject);
        assert_eq!(d.reject_for, Combo::from_bits(1));
    }

    #[test]
    fn need_equal_to_remaining_forces_accept_for_carrier() {
        let cfg = single(500, 1000);
        let l = resume(&cfg, 600, vec![100]);
        let d = check_feasibility(Combo::from_bits(1), &l);
        assert_eq!(d.verdict, GuardVerdict::ForceAccept);
        assert_eq!(d.accept_for, Combo::from_bits(1));
    }

    #[test]
    fn one_seat_of_slack_is_not_forced() {
        // R=401, need=400: R-1=400 is not < 400.
        let cfg = single(500, 1000);
        let l = resume(&cfg, 599, vec![100]);
        assert_eq!(check_feasibility(Combo::EMPTY, &l).verdict, GuardVerdict::NoDecision);
        assert_eq!(check_feasibility(Combo::from_bits(1), &l).verdict, GuardVerdict::NoDecision);
    }

    #[test]
    fn conflict_resolves_to_reject() {
        let cfg = ScenarioConfig::new(
            vec![AttributeSpec::new("a", 10, 0.5), AttributeSpec::new("b", 10, 0.5)],
            20,
        )
        .with_engine(EngineConfig::default().with_capacity(20));
        // R=10, need a=10, need b=10.
        let l = resume(&cfg, 10, vec![0, 0]);
        let d = check_feasibility(Combo::from_bits(0b01), &l);
        assert!(d.is_conflict());
        assert_eq!(d.verdict, GuardVerdict::ForceReject);
        assert_eq!(d.accept_for, Combo::from_bits(0b01));
        assert_eq!(d.reject_for, Combo::from_bits(0b10));

        let both = check_feasibility(Combo::from_bits(0b11), &l);
        assert_eq!(both.verdict, GuardVerdict::ForceAccept);
        assert!(!both.is_conflict());
    }

    #[test]
    fn met_quotas_never_force() {
        let cfg = single(5, 10);
        let l = resume(&cfg, 9, vec![5]);
        assert_eq!(check_feasibility(Combo::EMPTY, &l).verdict, GuardVerdict::NoDecision);
    }
}
