//! Coverage model.
//!
//! Per-worker coverage is a mapping from source file to source position to
//! the function at that position and how often it was hit. Workers publish
//! snapshots; the orchestrator merges the latest snapshot of each worker.
//!
//! ```text
//! worker #0 ──┐
//! worker #1 ──┼─► CoverageAggregator ─► merge ─► chainfuzz-coverage.cov
//! worker #2 ──┘                              └─► chainfuzz-coverage-per-trans.cov
//! ```

mod aggregator;
mod merge;
mod position;
mod probe;

#[cfg(test)]
mod tests;

pub use aggregator::{
    read_coverage_file, CoverageAggregator, FULL_COVERAGE_FILE, PER_TRANSACTION_COVERAGE_FILE,
};
pub use merge::{function_summary, merge, ranked_functions, MergedCoverage};
pub use position::IdePosition;
pub use probe::CoverageProbe;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Function at a position and its hit count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCoverageRecord {
    /// Function name
    pub name: String,
    /// Number of hits
    #[serde(rename = "coverageHits")]
    pub coverage_hits: u64,
}

impl FunctionCoverageRecord {
    /// Create a record
    #[must_use]
    pub fn new(name: impl Into<String>, coverage_hits: u64) -> Self {
        Self {
            name: name.into(),
            coverage_hits,
        }
    }
}

/// Source file -> position -> function record
pub type IdeCoverage = BTreeMap<String, BTreeMap<IdePosition, FunctionCoverageRecord>>;

/// One worker's coverage at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    /// Hits accumulated over the whole run
    pub full: IdeCoverage,
    /// Hits of the most recent transaction
    pub per_transaction: IdeCoverage,
}
