//! Worker-side coverage recording.

use super::{CoverageSnapshot, FunctionCoverageRecord, IdeCoverage, IdePosition};
use crate::protocol::{Uplink, WorkerMessage};
use crate::result::FuzzResult;
use std::fmt;
use std::sync::Arc;

fn bump(coverage: &mut IdeCoverage, file: &str, position: IdePosition, name: &str, hits: u64) {
    let record = coverage
        .entry(file.to_string())
        .or_default()
        .entry(position)
        .or_insert_with(|| FunctionCoverageRecord::new(name, 0));
    record.coverage_hits = record.coverage_hits.saturating_add(hits);
}

/// Coverage recorder handed to a test that asked for `coverage`
///
/// Hits are accumulated locally and published to the orchestrator with
/// [`CoverageProbe::export`]. Each export replaces the worker's previous
/// snapshot on the orchestrator side.
pub struct CoverageProbe {
    starting_block: u64,
    full: IdeCoverage,
    per_transaction: IdeCoverage,
    uplink: Arc<dyn Uplink>,
}

impl fmt::Debug for CoverageProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoverageProbe")
            .field("starting_block", &self.starting_block)
            .field("files", &self.full.len())
            .finish_non_exhaustive()
    }
}

impl CoverageProbe {
    /// Create a probe that starts tracking at `starting_block`
    #[must_use]
    pub fn new(starting_block: u64, uplink: Arc<dyn Uplink>) -> Self {
        Self {
            starting_block,
            full: IdeCoverage::new(),
            per_transaction: IdeCoverage::new(),
            uplink,
        }
    }

    /// Block number the chain was at when the test started
    #[must_use]
    pub fn starting_block(&self) -> u64 {
        self.starting_block
    }

    /// Record one hit of `name` at `position` in `file`
    pub fn record_hit(&mut self, file: &str, position: IdePosition, name: &str) {
        self.record_hits(file, position, name, 1);
    }

    /// Record `hits` hits at once
    pub fn record_hits(&mut self, file: &str, position: IdePosition, name: &str, hits: u64) {
        if hits == 0 {
            return;
        }
        bump(&mut self.full, file, position, name, hits);
        bump(&mut self.per_transaction, file, position, name, hits);
    }

    /// Start a new transaction; per-transaction hits are cleared
    pub fn begin_transaction(&mut self) {
        self.per_transaction.clear();
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> CoverageSnapshot {
        CoverageSnapshot {
            full: self.full.clone(),
            per_transaction: self.per_transaction.clone(),
        }
    }

    /// Publish the current snapshot to the orchestrator
    pub fn export(&self) -> FuzzResult<()> {
        self.uplink.send(WorkerMessage::Coverage(self.snapshot()))
    }
}

impl Drop for CoverageProbe {
    fn drop(&mut self) {
        // Final snapshot; the orchestrator may already be gone
        if !self.full.is_empty() {
            let _ = self.export();
        }
    }
}
