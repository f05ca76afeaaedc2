//! Combination scoring.
//!
//! One scoring rule for every attribute count.  Static data (per-attribute
//! weights and, for every combination key `0..2^k`, the correlated pairs it
//! contains) is computed once per run in [`ScoreTable::new`]; the dynamic part
//! reads the ledger on each call.
//!
//! Per unmet attribute `a`, with scarcity `S[a] = need[a] / (R * p[a])`
//! (clipped):
//!
//! ```text
//!   a present:  + W[a] * (1 + scarcity_gain * S[a])
//!   a absent:   - miss_penalty * W[a] * S[a]
//! ```
//!
//! Already-met attributes earn a small `surplus_credit * W[a]`.  Correlated
//! pairs add terms:
//!
//! - `rho > 0`, both unmet and both at least `joint_scarcity`: bonus (a rare
//!   pair, seize it);
//! - `rho < 0`, both unmet: bonus (co-occurrence against the correlation is
//!   especially rare);
//! - `rho > 0`, both met, and the candidate helps nothing unmet: penalty
//!   (redundant).
//!
//! The unmet attribute(s) with the highest scarcity are *critical*; a
//! candidate carrying one is floored to always-accept once that scarcity
//! reaches `critical_scarcity`.

use crate::{Combo, Ledger, Result, ScenarioConfig, ScoringConfig};

/// A correlated attribute pair present in some combination.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairTerm {
    pub a: usize,
    pub b: usize,
    pub rho: f64,
    /// `sqrt(W[a] * W[b])`.
    pub weight: f64,
}

/// Per-run scoring tables.
#[derive(Debug, Clone)]
pub struct ScoreTable {
    weights: Vec<f64>,
    pairs: Vec<Vec<PairTerm>>,
}

/// Score of one candidate, itemized.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreBreakdown {
    /// `direct + pairs`.
    pub score: f64,
    /// Per-attribute contributions.
    pub direct: f64,
    /// Correlated-pair contributions.
    pub pairs: f64,
    /// Critical attributes (highest scarcity among unmet, at or above the floor cutoff).
    pub critical: Combo,
    /// Scarcity of the critical attributes (0 when none are unmet).
    pub critical_scarcity: f64,
    /// Whether the candidate carries a critical attribute.
    pub floor_applied: bool,
}

/// Clipped scarcity `need / (R * p)`.
///
/// With no remaining seats, any shortfall is maximally scarce.
pub fn scarcity(need: u32, remaining: u32, p: f64, clip: f64) -> f64 {
    let clip = if clip.is_finite() && clip > 0.0 { clip } else { 5.0 };
    if need == 0 {
        return 0.0;
    }
    let supply = f64::from(remaining) * p.max(1e-6);
    if supply <= 0.0 {
        return clip;
    }
    (f64::from(need) / supply).min(clip)
}

impl ScoreTable {
    /// Build weights and the per-combination pair lists.
    pub fn new(cfg: &ScenarioConfig) -> Result<Self> {
        let schema = cfg.validate()?;
        let k = schema.len();
        let s = &cfg.engine.scoring;
        let n = f64::from(cfg.engine.capacity);
        let d = ScoringConfig::default();
        let lo = if s.weight_low.is_finite() { s.weight_low } else { d.weight_low };
        let hi = if s.weight_high.is_finite() { s.weight_high } else { d.weight_high };
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };

        let weights: Vec<f64> = cfg
            .effective_minimums()
            .iter()
            .zip(cfg.attributes.iter())
            .map(|(&min, spec)| {
                let required = f64::from(min) / n;
                if spec.prior > 0.0 {
                    (required / spec.prior).clamp(lo, hi)
                } else {
                    hi
                }
            })
            .collect();

        let corr = cfg.correlation_matrix(&schema);
        let mut significant: Vec<PairTerm> = Vec::new();
        for a in 0..k {
            for b in (a + 1)..k {
                let rho = corr[a * k + b];
                if rho.abs() >= s.min_correlation && rho != 0.0 {
                    significant.push(PairTerm {
                        a,
                        b,
                        rho,
                        weight: (weights[a] * weights[b]).sqrt(),
                    });
                }
            }
        }

        let pairs = (0..(1usize << k))
            .map(|key| {
                let c = Combo::from_bits(key as u16);
                significant
                    .iter()
                    .filter(|p| c.has(p.a) && c.has(p.b))
                    .copied()
                    .collect()
            })
            .collect();

        Ok(Self { weights, pairs })
    }

    /// Base weight of attribute `a`.
    pub fn weight(&self, a: usize) -> f64 {
        self.weights.get(a).copied().unwrap_or(0.0)
    }

    /// All base weights in schema order.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of combination rows (`2^k`).
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Correlated pairs present in `combo`.
    pub fn pairs_in(&self, combo: Combo) -> &[PairTerm] {
        self.pairs
            .get(combo.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Score `combo` against the current ledger.
    ///
    /// Pure: the same combo, ledger and estimates always give the same result.
    /// Ledger attributes beyond this table's width are ignored.
    pub fn score(
        &self,
        combo: Combo,
        ledger: &Ledger,
        adjusted: &[f64],
        cfg: &ScoringConfig,
    ) -> ScoreBreakdown {
        let r = ledger.remaining();
        let k = self.weights.len();
        let unmet = ledger.unmet().and(Combo::below(k));

        let scarce: Vec<f64> = (0..k)
            .map(|a| {
                let p = adjusted.get(a).copied().unwrap_or_else(|| ledger.prior(a));
                scarcity(ledger.need(a), r, p, cfg.scarcity_clip)
            })
            .collect();

        let mut direct = 0.0;
        for (a, (&w, &s)) in self.weights.iter().zip(scarce.iter()).enumerate() {
            match (unmet.has(a), combo.has(a)) {
                (true, true) => direct += w * (1.0 + cfg.scarcity_gain * s),
                (true, false) => direct -= cfg.miss_penalty * w * s,
                (false, true) => direct += cfg.surplus_credit * w,
                (false, false) => {}
            }
        }

        let helps_unmet = !combo.and(unmet).is_empty();
        let mut pairs = 0.0;
        for t in self.pairs_in(combo) {
            let both_unmet = unmet.has(t.a) && unmet.has(t.b);
            let both_met = !unmet.has(t.a) && !unmet.has(t.b);
            if t.rho > 0.0 {
                if both_unmet && scarce[t.a].min(scarce[t.b]) >= cfg.joint_scarcity {
                    pairs += cfg.positive_pair_bonus * t.rho * t.weight;
                } else if both_met && !helps_unmet {
                    pairs -= cfg.redundancy_penalty * t.rho;
                }
            } else if both_unmet {
                pairs += cfg.negative_pair_bonus * t.rho.abs() * t.weight;
            }
        }

        let top = unmet
            .iter()
            .map(|a| scarce[a])
            .fold(0.0_f64, f64::max);
        let mut critical = Combo::EMPTY;
        if !unmet.is_empty() && top >= cfg.critical_scarcity {
            for a in unmet.iter() {
                if scarce[a] >= top - 1e-9 {
                    critical = critical.with(a);
                }
            }
        }

        ScoreBreakdown {
            score: direct + pairs,
            direct,
            pairs,
            critical,
            critical_scarcity: top,
            floor_applied: !combo.and(critical).is_empty(),
        }
    }
}
