//! Decision dispatcher.
//!
//! [`Engine`] owns the configuration and the per-run scoring tables; the
//! [`Ledger`] is borrowed on every call.  `decide` never mutates anything,
//! so the same engine, ledger and candidate always yield the same decision.
//!
//! Stage order (first to settle wins):
//!
//! 1. feasibility guard (forced accept / forced reject)
//! 2. all quotas met → accept
//! 3. safety margin over unmet attributes the candidate lacks → reject if unsafe
//! 4. critical-attribute floor → accept
//! 5. `score >= threshold`, with the threshold capped at the score of a
//!    candidate carrying exactly the unmet attributes

use tracing::debug;

use crate::{
    adjusted_frequencies, admission_threshold, check_feasibility, safety_margin_check,
    AttributeSchema, Candidate, Combo, Decision, DecisionNote, DecisionStage, EngineConfig,
    Error, GuardVerdict, Ledger, Phase, Result, ScenarioConfig, ScoreBreakdown, ScoreTable,
    ThresholdBreakdown,
};

/// Admission engine for one scenario.
#[derive(Debug, Clone)]
pub struct Engine {
    cfg: EngineConfig,
    schema: AttributeSchema,
    table: ScoreTable,
}

impl Engine {
    /// Validate the scenario and precompute scoring tables.
    pub fn new(cfg: &ScenarioConfig) -> Result<Self> {
        let schema = cfg.validate()?;
        let table = ScoreTable::new(cfg)?;
        Ok(Self {
            cfg: cfg.engine,
            schema,
            table,
        })
    }

    /// Attribute order used by this engine.
    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    /// Engine-wide configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Precomputed scoring tables.
    pub fn table(&self) -> &ScoreTable {
        &self.table
    }

    /// Estimated arrival frequency per attribute, schema order.
    pub fn adjusted_frequencies(&self, ledger: &Ledger) -> Vec<f64> {
        adjusted_frequencies(ledger, &self.cfg.estimator)
    }

    /// Score `combo` against the current ledger.
    ///
    /// Errors with [`Error::SchemaMismatch`] when the ledger does not match
    /// this engine's schema.
    pub fn score(&self, combo: Combo, ledger: &Ledger) -> Result<ScoreBreakdown> {
        self.check_ledger(ledger)?;
        let adjusted = self.adjusted_frequencies(ledger);
        Ok(self
            .table
            .score(combo, ledger, &adjusted, &self.cfg.scoring))
    }

    /// Current admission threshold.
    ///
    /// Errors with [`Error::SchemaMismatch`] when the ledger does not match
    /// this engine's schema.
    pub fn threshold(&self, ledger: &Ledger) -> Result<ThresholdBreakdown> {
        self.check_ledger(ledger)?;
        let adjusted = self.adjusted_frequencies(ledger);
        Ok(self.threshold_with(ledger, &adjusted))
    }

    fn check_ledger(&self, ledger: &Ledger) -> Result<()> {
        let k = self.schema.len();
        if ledger.attribute_count() != k {
            return Err(Error::SchemaMismatch {
                expected: k,
                got: ledger.attribute_count(),
            });
        }
        Ok(())
    }

    fn threshold_with(&self, ledger: &Ledger, adjusted: &[f64]) -> ThresholdBreakdown {
        let t = admission_threshold(ledger, &self.cfg.threshold);
        let unmet = ledger.unmet();
        if unmet.is_empty() {
            return t;
        }
        let ideal = self
            .table
            .score(unmet, ledger, adjusted, &self.cfg.scoring);
        t.capped_at(ideal.score)
    }

    /// Decide on one candidate.
    ///
    /// Errors:
    /// - [`Error::CapacityExhausted`] when the ledger is `Closed`;
    /// - [`Error::SchemaMismatch`] when the ledger or candidate does not
    ///   match this engine's schema.
    pub fn decide(&self, candidate: &Candidate, ledger: &Ledger) -> Result<Decision> {
        if ledger.phase() == Phase::Closed {
            return Err(Error::CapacityExhausted);
        }
        self.check_ledger(ledger)?;
        let k = self.schema.len();
        let combo = candidate.combo();
        if !combo.fits(k) {
            return Err(Error::SchemaMismatch {
                expected: k,
                got: combo.width(),
            });
        }

        let guard = check_feasibility(combo, ledger);
        match guard.verdict {
            GuardVerdict::ForceReject => {
                let mut notes = vec![DecisionNote::ForcedReject {
                    attributes: guard.reject_for,
                }];
                if guard.is_conflict() {
                    notes.push(DecisionNote::GuardConflict {
                        accept_for: guard.accept_for,
                        reject_for: guard.reject_for,
                    });
                }
                debug!(
                    id = ?candidate.id,
                    combo = combo.bits(),
                    reject_for = guard.reject_for.bits(),
                    conflict = guard.is_conflict(),
                    remaining = ledger.remaining(),
                    "forced reject"
                );
                return Ok(Decision::reject(DecisionStage::Feasibility, notes));
            }
            GuardVerdict::ForceAccept => {
                debug!(
                    id = ?candidate.id,
                    combo = combo.bits(),
                    accept_for = guard.accept_for.bits(),
                    remaining = ledger.remaining(),
                    "forced accept"
                );
                return Ok(Decision::accept(
                    DecisionStage::Feasibility,
                    vec![DecisionNote::ForcedAccept {
                        attributes: guard.accept_for,
                    }],
                ));
            }
            GuardVerdict::NoDecision => {}
        }

        if ledger.phase() == Phase::AllMet {
            return Ok(Decision::accept(
                DecisionStage::AllMet,
                vec![DecisionNote::AllQuotasMet],
            ));
        }

        let adjusted = self.adjusted_frequencies(ledger);
        let safety = safety_margin_check(combo, ledger, &adjusted, &self.cfg.safety);
        if let Some(worst) = safety.worst() {
            debug!(
                id = ?candidate.id,
                combo = combo.bits(),
                attribute = self.schema.name(worst.attribute).unwrap_or("?"),
                projected = worst.projected,
                min_count = worst.min_count,
                z = safety.z,
                "unsafe margin"
            );
            return Ok(Decision::reject(
                DecisionStage::SafetyMargin,
                vec![DecisionNote::UnsafeMargin {
                    attribute: worst.attribute,
                    projected: worst.projected,
                    min_count: worst.min_count,
                    z: safety.z,
                }],
            ));
        }

        let score = self
            .table
            .score(combo, ledger, &adjusted, &self.cfg.scoring);
        let threshold = self.threshold_with(ledger, &adjusted);
        let scored = DecisionNote::Scored {
            score: score.score,
            threshold: threshold.threshold,
            endgame: threshold.endgame,
        };

        if score.floor_applied {
            return Ok(Decision::accept(
                DecisionStage::CriticalFloor,
                vec![
                    DecisionNote::CriticalAttribute {
                        attributes: score.critical.and(combo),
                        scarcity: score.critical_scarcity,
                    },
                    scored,
                ],
            ));
        }

        let notes = vec![scored];
        if score.score >= threshold.threshold {
            Ok(Decision::accept(DecisionStage::Score, notes))
        } else {
            Ok(Decision::reject(DecisionStage::Score, notes))
        }
    }
}
