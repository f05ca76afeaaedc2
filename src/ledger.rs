//! Run state: capacity, quota progress, admission window and phase.
//!
//! The [`Ledger`] is owned by whoever drives the run and is passed by
//! reference to every check.  It changes only through
//! [`Ledger::record_accept`]; rejected candidates leave it untouched.

use std::collections::VecDeque;

use tracing::info;

use crate::{Combo, Error, Result, ScenarioConfig};

/// Run phase.
///
/// `Filling → AllMet → Closed`.  `AllMet` is entered the first time every
/// quota is satisfied and never left except to close; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Some quota is still unmet.
    #[default]
    Filling,
    /// Every quota is met; everything is admitted from here on.
    AllMet,
    /// Capacity exhausted.
    Closed,
}

/// Rolling FIFO window of recently admitted attribute combinations.
///
/// Keeps a per-attribute hit count alongside the buffer so observed
/// frequencies are O(1).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdmitWindow {
    cap: usize,
    buf: VecDeque<Combo>,
    hits: Vec<u32>,
}

impl AdmitWindow {
    /// Create an empty window over `k` attributes with capacity `cap` (minimum 1).
    pub fn new(cap: usize, k: usize) -> Self {
        Self {
            cap: cap.max(1),
            buf: VecDeque::new(),
            hits: vec![0; k],
        }
    }

    /// Maximum number of combinations retained.
    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Combo> + '_ {
        self.buf.iter()
    }

    /// Push a combination, evicting the oldest if at capacity.
    pub fn push(&mut self, c: Combo) {
        if self.buf.len() == self.cap {
            if let Some(old) = self.buf.pop_front() {
                for i in old.iter() {
                    if let Some(h) = self.hits.get_mut(i) {
                        *h = h.saturating_sub(1);
                    }
                }
            }
        }
        for i in c.iter() {
            if let Some(h) = self.hits.get_mut(i) {
                *h += 1;
            }
        }
        self.buf.push_back(c);
    }

    /// Number of retained combinations carrying attribute `i`.
    pub fn hits(&self, i: usize) -> u32 {
        self.hits.get(i).copied().unwrap_or(0)
    }

    /// Fraction of retained combinations carrying attribute `i` (0 when empty).
    pub fn observed_rate(&self, i: usize) -> f64 {
        if self.buf.is_empty() {
            0.0
        } else {
            f64::from(self.hits(i)) / self.buf.len() as f64
        }
    }
}

/// Quota bookkeeping for one run.
#[derive(Debug, Clone)]
pub struct Ledger {
    capacity: u32,
    admitted: u32,
    minimums: Vec<u32>,
    counts: Vec<u32>,
    priors: Vec<f64>,
    window: AdmitWindow,
    phase: Phase,
}

impl Ledger {
    /// Fresh ledger for a run.
    ///
    /// Fails if the configuration is invalid, including any quota larger than
    /// capacity ([`Error::InfeasibleQuota`]).
    pub fn new(cfg: &ScenarioConfig) -> Result<Self> {
        let schema = cfg.validate()?;
        let k = schema.len();
        let mut ledger = Self {
            capacity: cfg.engine.capacity,
            admitted: 0,
            minimums: cfg.effective_minimums(),
            counts: vec![0; k],
            priors: cfg.priors(),
            window: AdmitWindow::new(cfg.engine.window_cap, k),
            phase: Phase::Filling,
        };
        ledger.phase = ledger.derive_phase();
        Ok(ledger)
    }

    /// Total seats `N`.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Seats filled so far.
    pub fn admitted(&self) -> u32 {
        self.admitted
    }

    /// Seats left, `R = N - admitted`.
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.admitted)
    }

    /// Number of attributes.
    pub fn attribute_count(&self) -> usize {
        self.minimums.len()
    }

    /// Effective quota for attribute `a`.
    pub fn min_count(&self, a: usize) -> u32 {
        self.minimums.get(a).copied().unwrap_or(0)
    }

    /// Admitted candidates carrying attribute `a`.
    pub fn count(&self, a: usize) -> u32 {
        self.counts.get(a).copied().unwrap_or(0)
    }

    /// Remaining shortfall `max(0, min[a] - count[a])`.
    pub fn need(&self, a: usize) -> u32 {
        self.min_count(a).saturating_sub(self.count(a))
    }

    /// Prior population frequency of attribute `a`.
    pub fn prior(&self, a: usize) -> f64 {
        self.priors.get(a).copied().unwrap_or(0.5)
    }

    /// Effective quotas in schema order.
    pub fn minimums(&self) -> &[u32] {
        &self.minimums
    }

    /// Counts in schema order.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Attributes whose quota is still unmet.
    pub fn unmet(&self) -> Combo {
        let mut c = Combo::EMPTY;
        for a in 0..self.attribute_count() {
            if self.need(a) > 0 {
                c = c.with(a);
            }
        }
        c
    }

    /// Rolling window of recent admissions.
    pub fn window(&self) -> &AdmitWindow {
        &self.window
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Fraction of capacity still open, `R / N`.
    pub fn remaining_fraction(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            f64::from(self.remaining()) / f64::from(self.capacity)
        }
    }

    /// Apply an accepted candidate.
    ///
    /// Increments `admitted` and the matching counts, pushes the combination
    /// into the window and advances the phase.  Returns the phase after the
    /// update.
    pub fn record_accept(&mut self, combo: Combo) -> Result<Phase> {
        if self.phase == Phase::Closed {
            return Err(Error::CapacityExhausted);
        }
        let k = self.attribute_count();
        if !combo.fits(k) {
            return Err(Error::SchemaMismatch {
                expected: k,
                got: combo.width(),
            });
        }
        self.admitted += 1;
        for a in combo.iter() {
            self.counts[a] += 1;
        }
        self.window.push(combo);

        let next = self.derive_phase();
        if next != self.phase {
            info!(
                from = ?self.phase,
                to = ?next,
                admitted = self.admitted,
                capacity = self.capacity,
                "ledger phase transition"
            );
            self.phase = next;
        }
        Ok(self.phase)
    }

    fn derive_phase(&self) -> Phase {
        if self.remaining() == 0 {
            Phase::Closed
        } else if self.phase == Phase::AllMet || self.unmet().is_empty() {
            Phase::AllMet
        } else {
            Phase::Filling
        }
    }

    /// Capture the resumable state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            capacity: self.capacity,
            minimums: self.minimums.clone(),
            admitted: self.admitted,
            counts: self.counts.clone(),
            window: self.window.iter().copied().collect(),
        }
    }

    /// Rebuild a ledger from a persisted snapshot.
    ///
    /// The snapshot must agree with `cfg` (capacity, effective quotas,
    /// attribute count) and be internally consistent
    /// (`count[a] <= admitted <= capacity`, window entries within the schema).
    /// Windows longer than `window_cap` keep their newest entries.  The phase
    /// is recomputed from the counts.
    pub fn from_snapshot(cfg: &ScenarioConfig, snap: LedgerSnapshot) -> Result<Self> {
        let mut ledger = Self::new(cfg)?;
        let k = ledger.attribute_count();

        if snap.counts.len() != k {
            return Err(Error::SchemaMismatch {
                expected: k,
                got: snap.counts.len(),
            });
        }
        if snap.minimums.len() != k {
            return Err(Error::SchemaMismatch {
                expected: k,
                got: snap.minimums.len(),
            });
        }
        if snap.capacity != ledger.capacity {
            return Err(Error::InvalidSnapshot(format!(
                "capacity {} does not match configured {}",
                snap.capacity, ledger.capacity
            )));
        }
        if snap.minimums != ledger.minimums {
            return Err(Error::InvalidSnapshot(format!(
                "quotas {:?} do not match configured {:?}",
                snap.minimums, ledger.minimums
            )));
        }
        if snap.admitted > snap.capacity {
            return Err(Error::InvalidSnapshot(format!(
                "admitted {} exceeds capacity {}",
                snap.admitted, snap.capacity
            )));
        }
        if let Some((a, c)) = snap
            .counts
            .iter()
            .enumerate()
            .find(|(_, c)| **c > snap.admitted)
        {
            return Err(Error::InvalidSnapshot(format!(
                "count[{a}] = {c} exceeds admitted {}",
                snap.admitted
            )));
        }
        if snap.window.len() > snap.admitted as usize {
            return Err(Error::InvalidSnapshot(format!(
                "window holds {} entries but only {} were admitted",
                snap.window.len(),
                snap.admitted
            )));
        }
        if let Some(bad) = snap.window.iter().find(|c| !c.fits(k)) {
            return Err(Error::SchemaMismatch {
                expected: k,
                got: bad.width(),
            });
        }

        ledger.admitted = snap.admitted;
        ledger.counts = snap.counts;
        let skip = snap.window.len().saturating_sub(ledger.window.cap());
        for c in snap.window.into_iter().skip(skip) {
            ledger.window.push(c);
        }
        ledger.phase = ledger.derive_phase();
        Ok(ledger)
    }
}

/// Persistable ledger state.
///
/// Enough to resume decisions after an interruption: capacity, quotas,
/// progress and the window used for frequency estimation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedgerSnapshot {
    pub capacity: u32,
    pub minimums: Vec<u32>,
    pub admitted: u32,
    pub counts: Vec<u32>,
    /// Oldest to newest.
    pub window: Vec<Combo>,
}
