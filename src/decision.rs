//! Audit-friendly decision envelope.
//!
//! Every admit/reject comes back as a [`Decision`] that records the stage of
//! the pipeline that settled it plus a list of typed [`DecisionNote`]s
//! explaining why.  Decisions can be:
//! - logged (debugging / post-run review)
//! - replayed (compare two engine configs over the same stream)
//! - persisted alongside a ledger snapshot (with the `serde` feature)

use crate::Combo;

/// Which pipeline stage settled a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionStage {
    /// Hard feasibility guard (exact arithmetic).
    Feasibility,
    /// Every quota already met.
    AllMet,
    /// Lower confidence bound on an unmet quota the candidate does not help.
    SafetyMargin,
    /// Candidate carries the most-behind attribute.
    CriticalFloor,
    /// Score compared against the adaptive threshold.
    Score,
}

/// Audit notes attached to a decision.
///
/// Notes are small, typed, and stable. Prefer adding new variants over
/// changing existing semantics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionNote {
    /// Every remaining seat is needed for these attributes, which the candidate has.
    ForcedAccept { attributes: Combo },

    /// Spending the seat would make these quotas unreachable.
    ForcedReject { attributes: Combo },

    /// Accept and reject signals fired together; reject won.
    GuardConflict { accept_for: Combo, reject_for: Combo },

    /// All quotas met; admission is unconditional.
    AllQuotasMet,

    /// The projected final count of an unmet attribute falls short.
    UnsafeMargin {
        attribute: usize,
        projected: f64,
        min_count: u32,
        z: f64,
    },

    /// The candidate carries the critical (most scarce) attribute(s).
    CriticalAttribute { attributes: Combo, scarcity: f64 },

    /// Score and threshold at the time of the decision.
    Scored {
        score: f64,
        threshold: f64,
        endgame: bool,
    },
}

/// A single admission decision.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decision {
    /// Admit (`true`) or reject.
    pub accept: bool,
    /// The stage that settled it.
    pub stage: DecisionStage,
    /// Audit notes describing why.
    pub notes: Vec<DecisionNote>,
}

impl Decision {
    pub(crate) fn accept(stage: DecisionStage, notes: Vec<DecisionNote>) -> Self {
        Self {
            accept: true,
            stage,
            notes,
        }
    }

    pub(crate) fn reject(stage: DecisionStage, notes: Vec<DecisionNote>) -> Self {
        Self {
            accept: false,
            stage,
            notes,
        }
    }

    /// Whether the candidate was admitted.
    pub fn accepted(&self) -> bool {
        self.accept
    }

    /// Whether the feasibility guard settled this decision.
    pub fn is_forced(&self) -> bool {
        self.stage == DecisionStage::Feasibility
    }

    /// The score note, if the decision reached the scoring stage.
    pub fn scored(&self) -> Option<(f64, f64)> {
        self.notes.iter().find_map(|n| match n {
            DecisionNote::Scored {
                score, threshold, ..
            } => Some((*score, *threshold)),
            _ => None,
        })
    }
}
