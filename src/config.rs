//! Run configuration: attributes, correlations and every tunable constant.
//!
//! Start from [`ScenarioConfig::preset`] or build a [`ScenarioConfig`] by hand
//! and adjust [`EngineConfig`] fields directly or via the `with_*` helpers.
//! Nothing in the engine reads a constant that is not reachable from here.

use crate::{AttributeSchema, Error, Result};

// ============================================================================
// Attributes and correlations
// ============================================================================

/// One quota-bearing attribute.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeSpec {
    /// Attribute name as it appears on incoming candidates.
    pub name: String,
    /// Minimum number of admitted candidates that must carry this attribute.
    pub min_count: u32,
    /// Population frequency of the attribute, in `[0, 1]`.
    pub prior: f64,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, min_count: u32, prior: f64) -> Self {
        Self {
            name: name.into(),
            min_count,
            prior,
        }
    }
}

/// Static pairwise correlation between two attributes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Correlation {
    pub a: String,
    pub b: String,
    /// Correlation coefficient; clamped into `[-1, 1]`, non-finite values count as 0.
    pub rho: f64,
}

impl Correlation {
    pub fn new(a: impl Into<String>, b: impl Into<String>, rho: f64) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            rho,
        }
    }
}

// ============================================================================
// Component configs
// ============================================================================

/// Frequency estimator knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimatorConfig {
    /// Weight given to the observed window frequency once the window holds
    /// `full_weight_samples` entries.
    pub max_obs_weight: f64,
    /// Window fill at which `max_obs_weight` is reached (weight grows linearly before).
    pub full_weight_samples: usize,
    /// Lower clamp on estimates.
    pub floor: f64,
    /// Upper clamp on estimates.
    pub ceil: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_obs_weight: 0.3,
            full_weight_samples: 50,
            floor: 0.01,
            ceil: 0.99,
        }
    }
}

/// Safety margin (lower confidence bound) knobs.
///
/// The z-score is `z_min + z_span * R / N`: most conservative at the start
/// of a run, relaxing toward `z_min` as capacity runs out.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafetyConfig {
    pub z_min: f64,
    pub z_span: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            z_min: 1.0,
            z_span: 1.5,
        }
    }
}

/// Scoring knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoringConfig {
    /// Lower clamp on the base weight `(min/N) / prior`.
    pub weight_low: f64,
    /// Upper clamp on the base weight.
    pub weight_high: f64,
    /// Clip applied to scarcity ratios before they enter the score.
    pub scarcity_clip: f64,
    /// How strongly scarcity amplifies the credit for a present unmet attribute.
    pub scarcity_gain: f64,
    /// Penalty factor for each unmet attribute the candidate lacks.
    pub miss_penalty: f64,
    /// Small credit for attributes whose quota is already met.
    pub surplus_credit: f64,
    /// Pairs with `|rho|` below this are ignored.
    pub min_correlation: f64,
    /// Both members of a positively correlated pair must be at least this scarce.
    pub joint_scarcity: f64,
    /// Bonus factor for a jointly scarce, positively correlated pair.
    pub positive_pair_bonus: f64,
    /// Bonus factor for a negatively correlated pair of unmet attributes co-occurring.
    pub negative_pair_bonus: f64,
    /// Penalty factor for a positively correlated pair of already-met attributes
    /// on a candidate that helps nothing unmet.
    pub redundancy_penalty: f64,
    /// Scarcity at which the most-behind attribute triggers the always-accept floor.
    ///
    /// 0.5 means the attribute still needs half of its expected future supply.
    pub critical_scarcity: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_low: 0.8,
            weight_high: 6.0,
            scarcity_clip: 5.0,
            scarcity_gain: 1.0,
            miss_penalty: 0.5,
            surplus_credit: 0.05,
            min_correlation: 0.1,
            joint_scarcity: 1.0,
            positive_pair_bonus: 1.0,
            negative_pair_bonus: 1.5,
            redundancy_penalty: 0.5,
            critical_scarcity: 0.5,
        }
    }
}

/// Admission threshold knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThresholdConfig {
    /// Threshold before any scaling.
    pub base: f64,
    /// Admissions required before projected final counts are trusted.
    pub min_admitted_for_projection: u32,
    /// Worst projected `final/min` ratio below which the threshold drops.
    pub health_cutoff: f64,
    /// How fast the threshold drops with the projection shortfall.
    pub health_gain: f64,
    /// Smallest multiplier the health stage may apply.
    pub health_floor: f64,
    /// Progress (`admitted / N`) below which `early_factor` applies.
    pub early_progress: f64,
    pub early_factor: f64,
    /// Progress at or above which `late_factor` applies.
    pub late_progress: f64,
    pub late_factor: f64,
    /// Remaining seats at or below which the endgame threshold takes over.
    pub endgame_remaining: u32,
    /// Threshold used in the endgame.
    pub endgame_threshold: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            base: 1.0,
            min_admitted_for_projection: 20,
            health_cutoff: 0.9,
            health_gain: 1.0,
            health_floor: 0.25,
            early_progress: 0.1,
            early_factor: 0.8,
            late_progress: 0.8,
            late_factor: 1.2,
            endgame_remaining: 50,
            endgame_threshold: 0.0,
        }
    }
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Total seats `N`.
    pub capacity: u32,
    /// Rolling window size for frequency estimation.
    pub window_cap: usize,
    /// Quota inflation `β`: effective min is `min + ceil(β * sqrt(N))`, capped at `N`.
    pub quota_buffer: f64,
    pub estimator: EstimatorConfig,
    pub safety: SafetyConfig,
    pub scoring: ScoringConfig,
    pub threshold: ThresholdConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            window_cap: 100,
            quota_buffer: 0.0,
            estimator: EstimatorConfig::default(),
            safety: SafetyConfig::default(),
            scoring: ScoringConfig::default(),
            threshold: ThresholdConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Set capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the rolling window size.
    pub fn with_window_cap(mut self, window_cap: usize) -> Self {
        self.window_cap = window_cap;
        self
    }

    /// Set the quota buffer.
    pub fn with_quota_buffer(mut self, quota_buffer: f64) -> Self {
        self.quota_buffer = quota_buffer;
        self
    }

    /// Set the endgame cutoff.
    pub fn with_endgame_remaining(mut self, remaining: u32) -> Self {
        self.threshold.endgame_remaining = remaining;
        self
    }

    /// Extra seats added to every quota by `quota_buffer`.
    pub fn buffer_seats(&self) -> u32 {
        let b = self.quota_buffer;
        if !(b.is_finite() && b > 0.0) {
            return 0;
        }
        (b * f64::from(self.capacity).sqrt()).ceil() as u32
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// The three shipped scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scenario {
    /// `young`, `well_dressed`: two symmetric, mildly correlated quotas.
    TwoAttributes,
    /// `techno_lover`, `well_connected`, `creative`, `berlin_local`.
    FourAttributes,
    /// Six attributes, including two rare ones and an anti-correlated pair.
    SixAttributes,
}

/// Everything a run needs: attributes, correlations and engine knobs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioConfig {
    pub attributes: Vec<AttributeSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub correlations: Vec<Correlation>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub engine: EngineConfig,
}

impl ScenarioConfig {
    /// A scenario with default engine knobs and no correlations.
    pub fn new(attributes: Vec<AttributeSpec>, capacity: u32) -> Self {
        Self {
            attributes,
            correlations: Vec::new(),
            engine: EngineConfig::default().with_capacity(capacity),
        }
    }

    /// Add a correlation entry.
    pub fn with_correlation(mut self, a: impl Into<String>, b: impl Into<String>, rho: f64) -> Self {
        self.correlations.push(Correlation::new(a, b, rho));
        self
    }

    /// Replace the engine config.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Preset for one of the shipped scenarios (capacity 1000).
    ///
    /// Frequencies and correlations are the published population statistics,
    /// rounded; the per-scenario endgame cutoff and quota buffer grow with the
    /// number of attributes.
    pub fn preset(scenario: Scenario) -> Self {
        match scenario {
            Scenario::TwoAttributes => Self::new(
                vec![
                    AttributeSpec::new("young", 600, 0.3225),
                    AttributeSpec::new("well_dressed", 600, 0.3225),
                ],
                1000,
            )
            .with_correlation("young", "well_dressed", 0.183)
            .with_engine(EngineConfig::default().with_endgame_remaining(30)),
            Scenario::FourAttributes => Self::new(
                vec![
                    AttributeSpec::new("techno_lover", 650, 0.6265),
                    AttributeSpec::new("well_connected", 450, 0.47),
                    AttributeSpec::new("creative", 300, 0.0623),
                    AttributeSpec::new("berlin_local", 750, 0.398),
                ],
                1000,
            )
            .with_correlation("techno_lover", "well_connected", -0.47)
            .with_correlation("techno_lover", "creative", 0.095)
            .with_correlation("techno_lover", "berlin_local", -0.655)
            .with_correlation("well_connected", "creative", 0.142)
            .with_correlation("well_connected", "berlin_local", 0.572)
            .with_correlation("creative", "berlin_local", 0.144)
            .with_engine(
                EngineConfig::default()
                    .with_endgame_remaining(80)
                    .with_quota_buffer(0.05),
            ),
            Scenario::SixAttributes => Self::new(
                vec![
                    AttributeSpec::new("underground_veteran", 500, 0.6795),
                    AttributeSpec::new("international", 650, 0.5735),
                    AttributeSpec::new("fashion_forward", 550, 0.6910),
                    AttributeSpec::new("queer_friendly", 250, 0.0461),
                    AttributeSpec::new("vinyl_collector", 200, 0.0445),
                    AttributeSpec::new("german_speaker", 800, 0.4565),
                ],
                1000,
            )
            .with_correlation("underground_veteran", "fashion_forward", -0.169)
            .with_correlation("underground_veteran", "vinyl_collector", 0.147)
            .with_correlation("underground_veteran", "german_speaker", 0.194)
            .with_correlation("international", "fashion_forward", 0.375)
            .with_correlation("international", "german_speaker", -0.717)
            .with_correlation("fashion_forward", "german_speaker", -0.352)
            .with_correlation("queer_friendly", "vinyl_collector", 0.480)
            .with_engine(
                EngineConfig::default()
                    .with_endgame_remaining(120)
                    .with_quota_buffer(0.1),
            ),
        }
    }

    /// Ordered attribute schema (validates names only).
    pub fn schema(&self) -> Result<AttributeSchema> {
        AttributeSchema::new(self.attributes.iter().map(|a| a.name.clone()))
    }

    /// Validate the whole configuration and return its schema.
    ///
    /// Fails on an empty/duplicate/oversized attribute list, zero capacity,
    /// a prior outside `[0, 1]`, a quota above capacity, or a correlation
    /// naming an unknown attribute.
    pub fn validate(&self) -> Result<AttributeSchema> {
        let schema = self.schema()?;
        let capacity = self.engine.capacity;
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        for a in &self.attributes {
            if !(a.prior.is_finite() && (0.0..=1.0).contains(&a.prior)) {
                return Err(Error::InvalidPrior {
                    attribute: a.name.clone(),
                    prior: a.prior,
                });
            }
            if a.min_count > capacity {
                return Err(Error::InfeasibleQuota {
                    attribute: a.name.clone(),
                    min_count: a.min_count,
                    capacity,
                });
            }
        }
        for c in &self.correlations {
            for name in [&c.a, &c.b] {
                if schema.index_of(name).is_none() {
                    return Err(Error::UnknownCorrelationAttribute(name.clone()));
                }
            }
        }
        Ok(schema)
    }

    /// Quotas after applying the quota buffer, in schema order.
    pub fn effective_minimums(&self) -> Vec<u32> {
        let extra = self.engine.buffer_seats();
        let cap = self.engine.capacity;
        self.attributes
            .iter()
            .map(|a| {
                if a.min_count == 0 {
                    0
                } else {
                    a.min_count.saturating_add(extra).min(cap)
                }
            })
            .collect()
    }

    /// Priors in schema order.
    pub fn priors(&self) -> Vec<f64> {
        self.attributes.iter().map(|a| a.prior).collect()
    }

    /// Dense symmetric correlation matrix (`k * k`, row-major, zero diagonal).
    ///
    /// Unknown names are skipped here; [`validate`](Self::validate) reports them.
    pub fn correlation_matrix(&self, schema: &AttributeSchema) -> Vec<f64> {
        let k = schema.len();
        let mut m = vec![0.0; k * k];
        for c in &self.correlations {
            let (Some(i), Some(j)) = (schema.index_of(&c.a), schema.index_of(&c.b)) else {
                continue;
            };
            if i == j {
                continue;
            }
            let rho = if c.rho.is_finite() {
                c.rho.clamp(-1.0, 1.0)
            } else {
                0.0
            };
            m[i * k + j] = rho;
            m[j * k + i] = rho;
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for s in [
            Scenario::TwoAttributes,
            Scenario::FourAttributes,
            Scenario::SixAttributes,
        ] {
            let cfg = ScenarioConfig::preset(s);
            let schema = cfg.validate().unwrap();
            assert_eq!(schema.len(), cfg.attributes.len());
        }
    }

    #[test]
    fn preset_sizes_are_two_four_six() {
        assert_eq!(ScenarioConfig::preset(Scenario::TwoAttributes).attributes.len(), 2);
        assert_eq!(ScenarioConfig::preset(Scenario::FourAttributes).attributes.len(), 4);
        assert_eq!(ScenarioConfig::preset(Scenario::SixAttributes).attributes.len(), 6);
    }

    #[test]
    fn quota_above_capacity_is_infeasible() {
        let cfg = ScenarioConfig::new(vec![AttributeSpec::new("a", 101, 0.5)], 100);
        assert!(matches!(
            cfg.validate(),
            Err(Error::InfeasibleQuota { min_count: 101, capacity: 100, .. })
        ));
    }

    #[test]
    fn invalid_prior_and_zero_capacity_are_rejected() {
        let cfg = ScenarioConfig::new(vec![AttributeSpec::new("a", 1, 1.5)], 10);
        assert!(matches!(cfg.validate(), Err(Error::InvalidPrior { .. })));
        let cfg = ScenarioConfig::new(vec![AttributeSpec::new("a", 0, 0.5)], 0);
        assert!(matches!(cfg.validate(), Err(Error::ZeroCapacity)));
    }

    #[test]
    fn unknown_correlation_attribute_is_rejected() {
        let cfg = ScenarioConfig::new(vec![AttributeSpec::new("a", 1, 0.5)], 10)
            .with_correlation("a", "b", 0.3);
        assert!(matches!(
            cfg.validate(),
            Err(Error::UnknownCorrelationAttribute(n)) if n == "b"
        ));
    }

    #[test]
    fn quota_buffer_inflates_and_caps_minimums() {
        let cfg = ScenarioConfig::new(
            vec![
                AttributeSpec::new("a", 50, 0.5),
                AttributeSpec::new("b", 99, 0.5),
                AttributeSpec::new("c", 0, 0.5),
            ],
            100,
        )
        .with_engine(EngineConfig::default().with_capacity(100).with_quota_buffer(0.25));
        // ceil(0.25 * sqrt(100)) = 3
        assert_eq!(cfg.engine.buffer_seats(), 3);
        assert_eq!(cfg.effective_minimums(), vec![53, 100, 0]);
    }

    #[test]
    fn correlation_matrix_is_symmetric_and_clamped() {
        let cfg = ScenarioConfig::new(
            vec![AttributeSpec::new("a", 1, 0.5), AttributeSpec::new("b", 1, 0.5)],
            10,
        )
        .with_correlation("a", "b", -1.7)
        .with_correlation("a", "a", 0.9);
        let schema = cfg.validate().unwrap();
        let m = cfg.correlation_matrix(&schema);
        assert_eq!(m, vec![0.0, -1.0, -1.0, 0.0]);
    }
}
