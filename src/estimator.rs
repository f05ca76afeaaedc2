//! Frequency estimation: blend the scenario prior with the admission window.
//!
//! The window reflects who the policy *admitted*, not who arrived, so the
//! observed share carries the policy's own selection effect.  Early on the
//! prior dominates; as the window fills, up to `max_obs_weight` of the
//! estimate comes from the window.  Estimates are clamped away from 0 and 1
//! so the downstream bound math never degenerates.

use crate::{EstimatorConfig, Ledger};

/// Weight given to the observed frequency for a window holding `samples` entries.
///
/// Grows linearly from 0 to `cfg.max_obs_weight` at `cfg.full_weight_samples`.
pub fn observation_weight(samples: usize, cfg: &EstimatorConfig) -> f64 {
    let cap = if cfg.max_obs_weight.is_finite() {
        cfg.max_obs_weight.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if samples == 0 || cap == 0.0 {
        return 0.0;
    }
    let full = cfg.full_weight_samples.max(1) as f64;
    cap * (samples as f64 / full).min(1.0)
}

/// Blend a prior with an observed rate and clamp into `[floor, ceil]`.
///
/// A non-finite prior is treated as 0.5; a non-finite observation is ignored.
pub fn blend_frequency(prior: f64, observed: f64, samples: usize, cfg: &EstimatorConfig) -> f64 {
    let (lo, hi) = clamp_bounds(cfg);
    let prior = if prior.is_finite() { prior.clamp(0.0, 1.0) } else { 0.5 };
    let w = if observed.is_finite() {
        observation_weight(samples, cfg)
    } else {
        0.0
    };
    let observed = if observed.is_finite() { observed.clamp(0.0, 1.0) } else { 0.0 };
    ((1.0 - w) * prior + w * observed).clamp(lo, hi)
}

/// Estimated probability that a future arrival carries attribute `a`.
pub fn adjusted_p(ledger: &Ledger, a: usize, cfg: &EstimatorConfig) -> f64 {
    let w = ledger.window();
    blend_frequency(ledger.prior(a), w.observed_rate(a), w.len(), cfg)
}

/// [`adjusted_p`] for every attribute, in schema order.
pub fn adjusted_frequencies(ledger: &Ledger, cfg: &EstimatorConfig) -> Vec<f64> {
    (0..ledger.attribute_count())
        .map(|a| adjusted_p(ledger, a, cfg))
        .collect()
}

fn clamp_bounds(cfg: &EstimatorConfig) -> (f64, f64) {
    let d = EstimatorConfig::default();
    let lo = if cfg.floor.is_finite() { cfg.floor.clamp(0.0, 1.0) } else { d.floor };
    let hi = if cfg.ceil.is_finite() { cfg.ceil.clamp(0.0, 1.0) } else { d.ceil };
    if lo <= hi {
        (lo, hi)
    } else {
        (d.floor, d.ceil)
    }
}
