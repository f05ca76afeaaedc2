//! Adaptive admission threshold.
//!
//! ```text
//!   threshold = base * health * progress        (R > endgame_remaining)
//!   threshold = endgame_threshold               (R <= endgame_remaining)
//! ```
//!
//! - **health** lowers the bar when the worst projected final count falls
//!   behind its quota.  Projections are `count[a] / admitted * N`; they are
//!   only trusted after `min_admitted_for_projection` admissions.
//! - **progress** is lenient at the start of a run and stricter near the end,
//!   when surplus admissions cost seats the quotas may still need.
//! - the **endgame** replaces the threshold outright: with few seats left a
//!   feasible candidate is admitted iff its net score is non-negative.
//!
//! The engine finally caps the threshold at the score of the *ideal*
//! candidate, one carrying exactly the unmet attributes (see
//! [`ThresholdBreakdown::capped_at`]).  Rejections never change the ledger,
//! so without the cap a state where every combination scores below the bar
//! would reject forever.

use crate::{Ledger, ThresholdConfig};

/// The threshold and the factors that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThresholdBreakdown {
    /// Effective threshold.
    pub threshold: f64,
    pub base: f64,
    /// Multiplier from quota health (1 when healthy or not yet projected).
    pub health_factor: f64,
    /// Multiplier from run progress.
    pub progress_factor: f64,
    /// Worst `projected / min` over quota-bearing attributes, once projected.
    pub worst_projection: Option<f64>,
    /// Whether the endgame override applied.
    pub endgame: bool,
    /// Whether the ideal-candidate cap lowered the threshold.
    pub capped: bool,
}

impl ThresholdBreakdown {
    /// Lower the threshold to `ceiling` if it is higher.
    ///
    /// A non-finite ceiling is ignored.
    #[must_use]
    pub fn capped_at(mut self, ceiling: f64) -> Self {
        if ceiling.is_finite() && ceiling < self.threshold {
            self.threshold = ceiling;
            self.capped = true;
        }
        self
    }
}

/// Worst projected `final / min` ratio, or `None` before projections are trusted.
pub fn worst_projection(ledger: &Ledger, cfg: &ThresholdConfig) -> Option<f64> {
    let admitted = ledger.admitted();
    if admitted == 0 || admitted < cfg.min_admitted_for_projection {
        return None;
    }
    let n = f64::from(ledger.capacity());
    let scale = n / f64::from(admitted);
    (0..ledger.attribute_count())
        .filter(|&a| ledger.min_count(a) > 0)
        .map(|a| f64::from(ledger.count(a)) * scale / f64::from(ledger.min_count(a)))
        .reduce(f64::min)
}

/// Health multiplier for a worst projection ratio.
pub fn health_factor(worst: Option<f64>, cfg: &ThresholdConfig) -> f64 {
    let Some(worst) = worst else {
        return 1.0;
    };
    let cutoff = cfg.health_cutoff;
    if !(cutoff.is_finite() && cutoff > 0.0) || worst >= cutoff {
        return 1.0;
    }
    let floor = if cfg.health_floor.is_finite() {
        cfg.health_floor.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (1.0 - cfg.health_gain * (cutoff - worst) / cutoff).clamp(floor, 1.0)
}

/// Progress multiplier for `admitted / N`.
pub fn progress_factor(progress: f64, cfg: &ThresholdConfig) -> f64 {
    if progress < cfg.early_progress {
        cfg.early_factor
    } else if progress >= cfg.late_progress {
        cfg.late_factor
    } else {
        1.0
    }
}

/// Compute the admission threshold for the current ledger state.
pub fn admission_threshold(ledger: &Ledger, cfg: &ThresholdConfig) -> ThresholdBreakdown {
    let worst = worst_projection(ledger, cfg);
    let health = health_factor(worst, cfg);
    let progress = progress_factor(1.0 - ledger.remaining_fraction(), cfg);

    if ledger.remaining() <= cfg.endgame_remaining {
        return ThresholdBreakdown {
            threshold: cfg.endgame_threshold,
            base: cfg.base,
            health_factor: health,
            progress_factor: progress,
            worst_projection: worst,
            endgame: true,
            capped: false,
        };
    }

    ThresholdBreakdown {
        threshold: cfg.base * health * progress,
        base: cfg.base,
        health_factor: health,
        progress_factor: progress,
        worst_projection: worst,
        endgame: false,
        capped: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttributeSpec, LedgerSnapshot, ScenarioConfig};

    fn cfg() -> ScenarioConfig {
        ScenarioConfig::new(
            vec![AttributeSpec::new("a", 500, 0.5), AttributeSpec::new("b", 0, 0.5)],
            1000,
        )
    }

    fn at(cfg: &ScenarioConfig, admitted: u32, counts: Vec<u32>) -> Ledger {
        Ledger::from_snapshot(
            cfg,
            LedgerSnapshot {
                capacity: cfg.engine.capacity,
                minimums: cfg.effective_minimums(),
                admitted,
                counts,
                window: vec![],
            },
        )
        .unwrap()
    }

    #[test]
    fn early_run_is_lenient() {
        let c = cfg();
        let t = admission_threshold(&at(&c, 0, vec![0, 0]), &c.engine.threshold);
        assert!(t.worst_projection.is_none());
        assert!((t.threshold - 0.8).abs() < 1e-12);
        assert!(!t.endgame);
    }

    #[test]
    fn healthy_mid_run_uses_base() {
        let c = cfg();
        // 300 admitted, 150 carriers → projected 500 = min.
        let t = admission_threshold(&at(&c, 300, vec![150, 0]), &c.engine.threshold);
        assert!((t.worst_projection.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(t.health_factor, 1.0);
        assert!((t.threshold - 1.0).abs() < 1e-12);
    }

    #[test]
    fn lagging_quota_lowers_threshold() {
        let c = cfg();
        // projected 0.45 of min: factor 1 - (0.9 - 0.45) / 0.9 = 0.5.
        let t = admission_threshold(&at(&c, 400, vec![90, 0]), &c.engine.threshold);
        assert!((t.worst_projection.unwrap() - 0.45).abs() < 1e-12);
        assert!((t.health_factor - 0.5).abs() < 1e-12);
        assert!((t.threshold - 0.5).abs() < 1e-12);
    }

    #[test]
    fn health_factor_is_floored() {
        let c = ThresholdConfig::default();
        assert_eq!(health_factor(Some(0.0), &c), 0.25);
        assert_eq!(health_factor(Some(2.0), &c), 1.0);
        assert_eq!(health_factor(None, &c), 1.0);
    }

    #[test]
    fn late_run_is_stricter() {
        let c = cfg();
        let t = admission_threshold(&at(&c, 850, vec![425, 0]), &c.engine.threshold);
        assert!((t.progress_factor - 1.2).abs() < 1e-12);
        assert!((t.threshold - 1.2).abs() < 1e-12);
    }

    #[test]
    fn endgame_overrides_threshold() {
        let c = cfg();
        let t = admission_threshold(&at(&c, 950, vec![500, 0]), &c.engine.threshold);
        assert!(t.endgame);
        assert_eq!(t.threshold, 0.0);
    }

    #[test]
    fn cap_only_lowers() {
        let c = cfg();
        let t = admission_threshold(&at(&c, 300, vec![150, 0]), &c.engine.threshold);
        let up = t.capped_at(5.0);
        assert_eq!(up, t);
        let down = t.capped_at(0.7);
        assert!(down.capped);
        assert_eq!(down.threshold, 0.7);
        assert_eq!(t.capped_at(f64::NAN), t);
    }

    #[test]
    fn few_admissions_are_not_projected() {
        let c = cfg();
        let l = at(&c, 19, vec![0, 0]);
        assert!(worst_projection(&l, &c.engine.threshold).is_none());
    }
}
