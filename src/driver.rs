//! Run driver: the loop that feeds candidates through an [`Engine`].
//!
//! The driver is the only writer of the [`Ledger`].  Transport stays outside
//! the crate: candidates come from a [`CandidateSource`] and every decision
//! goes to a [`DecisionSink`] after the ledger reflects it, before the next
//! candidate is fetched.
//!
//! Small in-memory collaborators are provided for tests, replays and demos:
//! [`ReplaySource`], [`MemorySink`] and [`NullSink`].

use std::collections::VecDeque;

use tracing::{info, warn};

use crate::{Candidate, Combo, Decision, Engine, Ledger, Phase, Result};

/// Supplies candidates one at a time.
///
/// `Ok(None)` ends the run.  Failures should be wrapped in
/// [`Error::Source`](crate::Error::Source).
pub trait CandidateSource {
    fn next_candidate(&mut self) -> Result<Option<Candidate>>;
}

/// Receives every decision.
///
/// Called after the ledger has been updated for `decision`.  Failures should
/// be wrapped in [`Error::Sink`](crate::Error::Sink).
pub trait DecisionSink {
    fn record(&mut self, candidate: &Candidate, decision: &Decision, ledger: &Ledger)
        -> Result<()>;
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunStatus {
    /// Capacity filled with every quota met.
    Completed,
    /// Capacity filled with these quotas unmet.
    Failed { unmet: Combo },
    /// The source ran dry before capacity was filled.
    SourceExhausted,
}

/// Counters for one call to [`run`].
///
/// Counts cover this call only; a resumed ledger's earlier admissions are
/// not included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunReport {
    pub admitted: u32,
    pub rejected: u32,
    pub forced_rejects: u32,
    pub forced_accepts: u32,
    pub status: RunStatus,
}

impl RunReport {
    /// Candidates seen.
    pub fn seen(&self) -> u32 {
        self.admitted + self.rejected
    }
}

/// Drive `engine` until capacity is exhausted or `source` ends.
///
/// Errors from the engine, the source or the sink abort the run; the ledger
/// then reflects every decision made so far and can be snapshotted.
pub fn run<S, D>(
    engine: &Engine,
    ledger: &mut Ledger,
    source: &mut S,
    sink: &mut D,
) -> Result<RunReport>
where
    S: CandidateSource + ?Sized,
    D: DecisionSink + ?Sized,
{
    let mut admitted = 0u32;
    let mut rejected = 0u32;
    let mut forced_rejects = 0u32;
    let mut forced_accepts = 0u32;

    while ledger.phase() != Phase::Closed {
        let Some(candidate) = source.next_candidate()? else {
            info!(
                admitted = ledger.admitted(),
                capacity = ledger.capacity(),
                unmet = ledger.unmet().count(),
                "source exhausted"
            );
            return Ok(RunReport {
                admitted,
                rejected,
                forced_rejects,
                forced_accepts,
                status: RunStatus::SourceExhausted,
            });
        };

        let decision = engine.decide(&candidate, ledger)?;
        if decision.is_forced() {
            if decision.accepted() {
                forced_accepts += 1;
            } else {
                forced_rejects += 1;
            }
        }
        if decision.accepted() {
            ledger.record_accept(candidate.combo())?;
            admitted += 1;
            if ledger.admitted() % 100 == 0 {
                info!(
                    admitted = ledger.admitted(),
                    rejected,
                    counts = ?ledger.counts(),
                    minimums = ?ledger.minimums(),
                    "progress"
                );
            }
        } else {
            rejected += 1;
        }
        sink.record(&candidate, &decision, ledger)?;
    }

    let unmet = ledger.unmet();
    let status = if unmet.is_empty() {
        info!(admitted = ledger.admitted(), rejected, "run completed");
        RunStatus::Completed
    } else {
        let names: Vec<&str> = unmet
            .iter()
            .filter_map(|a| engine.schema().name(a))
            .collect();
        warn!(unmet = ?names, counts = ?ledger.counts(), rejected, "run failed");
        RunStatus::Failed { unmet }
    };
    Ok(RunReport {
        admitted,
        rejected,
        forced_rejects,
        forced_accepts,
        status,
    })
}

/// Replays a fixed list of candidates in order.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    queue: VecDeque<Candidate>,
}

impl ReplaySource {
    pub fn new(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        Self {
            queue: candidates.into_iter().collect(),
        }
    }

    /// Candidates not yet handed out.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl CandidateSource for ReplaySource {
    fn next_candidate(&mut self) -> Result<Option<Candidate>> {
        Ok(self.queue.pop_front())
    }
}

/// One recorded decision.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditEntry {
    pub candidate: Candidate,
    pub decision: Decision,
    /// Ledger `admitted` after the decision was applied.
    pub admitted: u32,
}

/// Keeps an ordered audit trail in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Vec<AuditEntry>,
}

impl MemorySink {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<AuditEntry> {
        self.entries
    }
}

impl DecisionSink for MemorySink {
    fn record(&mut self, candidate: &Candidate, decision: &Decision, ledger: &Ledger) -> Result<()> {
        self.entries.push(AuditEntry {
            candidate: *candidate,
            decision: decision.clone(),
            admitted: ledger.admitted(),
        });
        Ok(())
    }
}

/// Discards every decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DecisionSink for NullSink {
    fn record(&mut self, _: &Candidate, _: &Decision, _: &Ledger) -> Result<()> {
        Ok(())
    }
}
