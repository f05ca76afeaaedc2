//! `bouncer`: deterministic online admission control under per-attribute quotas.
//!
//! Candidates arrive one at a time.  Each carries a fixed set of boolean
//! attributes and must be admitted or rejected on the spot, irrevocably.  A run
//! has a fixed capacity `N`, and every attribute `a` has a minimum count
//! `min[a]` that the admitted population must reach by the time capacity is
//! exhausted.  The goal is to meet every quota while rejecting as few
//! candidates as possible.
//!
//! The engine is a fixed-precedence pipeline over a caller-owned [`Ledger`]:
//!
//! 1. **Feasibility guard** ([`check_feasibility`]): exact arithmetic.  Rejects
//!    a candidate when spending the seat on it would make some quota
//!    provably unreachable; accepts one when every remaining seat is needed
//!    for a quota it helps.  A conflict resolves to reject.
//! 2. **All met**: once every quota is satisfied, everyone is admitted.
//! 3. **Safety margin** ([`safety_margin_check`]): a Gaussian lower confidence
//!    bound on the attainable final count of every unmet attribute the
//!    candidate does not help.  Probably-unreachable quotas reject.
//! 4. **Score vs threshold** ([`ScoreTable`], [`admission_threshold`]): a
//!    scarcity-weighted score over the candidate's attribute combination,
//!    compared against a threshold that adapts to quota health, progress and
//!    the endgame.
//!
//! Frequencies of future arrivals are estimated by blending the scenario
//! prior with the attribute mix of a rolling window of recent admissions
//! ([`adjusted_p`]).
//!
//! **Goals:**
//! - **Deterministic**: same config + ledger + candidate → same decision.
//! - **Small k**: 1–12 attributes; combinations are indexed by a bit vector
//!   ([`Combo`]) so scoring tables are plain arrays.
//! - **Audit-friendly**: every [`Decision`] records the stage that decided it
//!   and typed notes explaining why.
//!
//! **Non-goals:**
//! - Not a constraint solver: no lookahead beyond the current candidate, no
//!   undo, no re-admission.
//! - No transport: fetching candidates and submitting decisions belong to a
//!   [`CandidateSource`] / [`DecisionSink`] supplied by the caller.
//!
//! # Example
//!
//! ```rust
//! use bouncer::{run, Engine, Ledger, MemorySink, ReplaySource, Scenario, ScenarioConfig};
//!
//! let cfg = ScenarioConfig::preset(Scenario::TwoAttributes);
//! let engine = Engine::new(&cfg).unwrap();
//! let mut ledger = Ledger::new(&cfg).unwrap();
//!
//! let schema = engine.schema();
//! let candidates = (0..50u64)
//!     .map(|i| {
//!         let young = i % 3 == 0;
//!         let well_dressed = i % 4 == 0;
//!         bouncer::Candidate::from_pairs(
//!             schema,
//!             [("young", young), ("well_dressed", well_dressed)],
//!         )
//!         .unwrap()
//!         .with_id(i)
//!     })
//!     .collect::<Vec<_>>();
//!
//! let mut source = ReplaySource::new(candidates);
//! let mut sink = MemorySink::default();
//! let report = run(&engine, &mut ledger, &mut source, &mut sink).unwrap();
//! assert_eq!(report.admitted + report.rejected, 50);
//! assert_eq!(sink.len(), 50);
//! ```

mod error;
pub use error::*;

mod candidate;
pub use candidate::*;

mod config;
pub use config::*;

mod ledger;
pub use ledger::*;

mod estimator;
pub use estimator::*;

mod feasibility;
pub use feasibility::*;

mod safety;
pub use safety::*;

mod scoring;
pub use scoring::*;

mod threshold;
pub use threshold::*;

mod decision;
pub use decision::*;

mod engine;
pub use engine::*;

mod driver;
pub use driver::*;

#[cfg(feature = "stochastic")]
mod sim;
#[cfg(feature = "stochastic")]
pub use sim::*;

/// Maximum number of attributes per scenario.
///
/// Scoring precomputes one entry per attribute combination, so the table has
/// `2^MAX_ATTRIBUTES` rows at most.
pub const MAX_ATTRIBUTES: usize = 12;

/// Crate version, for audit logs.
pub const BOUNCER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// An attribute combination: bit `i` is set iff attribute `i` is present.
///
/// Also used as an attribute *mask* (e.g. "the attributes that forced this
/// decision").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Combo(u16);

impl Combo {
    /// The empty combination.
    pub const EMPTY: Combo = Combo(0);

    /// Wrap raw bits.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Build from a slice of presence flags, attribute `i` at position `i`.
    ///
    /// Flags beyond [`MAX_ATTRIBUTES`] are ignored.
    pub fn from_flags(flags: &[bool]) -> Self {
        let mut c = Self::EMPTY;
        for (i, &f) in flags.iter().enumerate().take(MAX_ATTRIBUTES) {
            if f {
                c = c.with(i);
            }
        }
        c
    }

    /// Raw bits.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Table index of this combination.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether attribute `i` is present.
    pub const fn has(self, i: usize) -> bool {
        i < MAX_ATTRIBUTES && (self.0 >> i) & 1 == 1
    }

    /// Copy with attribute `i` set.
    #[must_use]
    pub const fn with(self, i: usize) -> Self {
        if i < MAX_ATTRIBUTES {
            Self(self.0 | (1 << i))
        } else {
            self
        }
    }

    /// Number of attributes present.
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Whether no attribute is present.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Attributes present in both.
    #[must_use]
    pub const fn and(self, other: Combo) -> Combo {
        Combo(self.0 & other.0)
    }

    /// Attributes present in `self` but not in `other`.
    #[must_use]
    pub const fn minus(self, other: Combo) -> Combo {
        Combo(self.0 & !other.0)
    }

    /// Every attribute with index below `k`.
    pub const fn below(k: usize) -> Self {
        if k >= MAX_ATTRIBUTES {
            Self((1 << MAX_ATTRIBUTES) - 1)
        } else {
            Self((1 << k) - 1)
        }
    }

    /// Whether every bit lies below attribute index `k`.
    pub const fn fits(self, k: usize) -> bool {
        k >= 16 || (self.0 >> k) == 0
    }

    /// Number of attribute slots this combination needs (highest set bit + 1).
    pub const fn width(self) -> usize {
        16 - self.0.leading_zeros() as usize
    }

    /// Indices of the attributes present, ascending.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MAX_ATTRIBUTES).filter(move |&i| self.has(i))
    }
}
