//! Orchestrator-side coverage aggregation.

use super::{merge, ranked_functions, CoverageSnapshot, IdeCoverage, MergedCoverage};
use crate::result::FuzzResult;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File holding the merged whole-run coverage
pub const FULL_COVERAGE_FILE: &str = "chainfuzz-coverage.cov";

/// File holding the merged per-transaction coverage
pub const PER_TRANSACTION_COVERAGE_FILE: &str = "chainfuzz-coverage-per-trans.cov";

/// Keeps the latest snapshot of each coverage-enabled worker
#[derive(Debug, Clone, Default)]
pub struct CoverageAggregator {
    latest: BTreeMap<usize, CoverageSnapshot>,
    full: MergedCoverage,
    per_transaction: MergedCoverage,
}

impl CoverageAggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace worker `index`'s snapshot and re-merge
    pub fn submit(&mut self, index: usize, snapshot: CoverageSnapshot) {
        self.latest.insert(index, snapshot);
        self.full = merge(self.latest.values().map(|s| &s.full));
        self.per_transaction = merge(self.latest.values().map(|s| &s.per_transaction));
        debug!(
            worker = index,
            total_hits = self.full.total_hits(),
            "coverage updated"
        );
    }

    /// Number of workers that reported
    #[must_use]
    pub fn reporters(&self) -> usize {
        self.latest.len()
    }

    /// Merged whole-run coverage
    #[must_use]
    pub fn full(&self) -> &MergedCoverage {
        &self.full
    }

    /// Merged per-transaction coverage
    #[must_use]
    pub fn per_transaction(&self) -> &MergedCoverage {
        &self.per_transaction
    }

    /// Verbose progress lines, `name: hits`, highest first
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        ranked_functions(&self.full)
            .into_iter()
            .map(|(name, hits)| format!("{name}: {hits}"))
            .collect()
    }

    /// Write both coverage files into `dir` unless nothing was hit
    pub fn persist(&self, dir: &Path) -> FuzzResult<Vec<PathBuf>> {
        if self.full.is_empty() {
            debug!("no coverage recorded, skipping coverage files");
            return Ok(Vec::new());
        }
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(2);
        for (name, coverage) in [
            (FULL_COVERAGE_FILE, &self.full),
            (PER_TRANSACTION_COVERAGE_FILE, &self.per_transaction),
        ] {
            let path = dir.join(name);
            fs::write(&path, coverage.to_json_pretty()?)?;
            info!(path = %path.display(), "wrote coverage");
            written.push(path);
        }
        Ok(written)
    }
}

/// Load a persisted coverage file
pub fn read_coverage_file(path: &Path) -> FuzzResult<IdeCoverage> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
