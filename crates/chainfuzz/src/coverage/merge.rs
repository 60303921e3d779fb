//! Merging coverage records from many workers.

use super::{FunctionCoverageRecord, IdeCoverage};
use crate::result::FuzzResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of merging any number of coverage records
///
/// Only positions with a positive total hit count are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedCoverage {
    files: IdeCoverage,
}

impl MergedCoverage {
    /// Whether nothing was hit
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The merged record
    #[must_use]
    pub fn as_record(&self) -> &IdeCoverage {
        &self.files
    }

    /// Take the merged record
    #[must_use]
    pub fn into_record(self) -> IdeCoverage {
        self.files
    }

    /// Hits recorded for a position, if any
    #[must_use]
    pub fn hits(&self, file: &str, position: &super::IdePosition) -> Option<u64> {
        self.files
            .get(file)
            .and_then(|positions| positions.get(position))
            .map(|record| record.coverage_hits)
    }

    /// Sum of all hits
    #[must_use]
    pub fn total_hits(&self) -> u64 {
        self.files
            .values()
            .flat_map(BTreeMap::values)
            .map(|record| record.coverage_hits)
            .sum()
    }

    /// Pretty JSON with four-space indentation and sorted keys
    pub fn to_json_pretty(&self) -> FuzzResult<String> {
        // Position keys sort by their text form in the persisted file
        let textual: BTreeMap<&str, BTreeMap<String, &FunctionCoverageRecord>> = self
            .files
            .iter()
            .map(|(file, positions)| {
                let positions = positions
                    .iter()
                    .map(|(position, record)| (position.to_string(), record))
                    .collect();
                (file.as_str(), positions)
            })
            .collect();

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        textual.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Merge coverage records.
///
/// Hit counts are summed per `(file, position)`; zero counts are dropped.
/// When records disagree on the function name for a position, the
/// lexicographically smallest name wins, so the result does not depend on
/// input order.
pub fn merge<'a, I>(records: I) -> MergedCoverage
where
    I: IntoIterator<Item = &'a IdeCoverage>,
{
    let mut files = IdeCoverage::new();
    for record in records {
        for (file, positions) in record {
            for (position, function) in positions {
                if function.coverage_hits == 0 {
                    continue;
                }
                let entry = files
                    .entry(file.clone())
                    .or_default()
                    .entry(*position)
                    .or_insert_with(|| FunctionCoverageRecord::new(function.name.clone(), 0));
                entry.coverage_hits = entry.coverage_hits.saturating_add(function.coverage_hits);
                if function.name < entry.name {
                    entry.name.clone_from(&function.name);
                }
            }
        }
    }
    MergedCoverage { files }
}

/// Per-function hit totals.
///
/// A function is keyed by its bare name when that name is unique among hit
/// records, otherwise by `file:name`.
#[must_use]
pub fn function_summary(coverage: &MergedCoverage) -> BTreeMap<String, u64> {
    let mut name_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in coverage.files.values().flat_map(BTreeMap::values) {
        *name_counts.entry(record.name.as_str()).or_default() += 1;
    }

    let mut summary = BTreeMap::new();
    for (file, positions) in &coverage.files {
        for record in positions.values() {
            let key = if name_counts.get(record.name.as_str()).copied().unwrap_or(0) > 1 {
                format!("{file}:{}", record.name)
            } else {
                record.name.clone()
            };
            *summary.entry(key).or_insert(0u64) += record.coverage_hits;
        }
    }
    summary
}

/// Summary lines ordered by hit count, highest first
#[must_use]
pub fn ranked_functions(coverage: &MergedCoverage) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = function_summary(coverage).into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
