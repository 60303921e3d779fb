//! Coverage model tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use super::*;
use std::path::Path;

fn record(entries: &[(&str, IdePosition, &str, u64)]) -> IdeCoverage {
    let mut coverage = IdeCoverage::new();
    for (file, position, name, hits) in entries {
        coverage
            .entry((*file).to_string())
            .or_default()
            .insert(*position, FunctionCoverageRecord::new(*name, *hits));
    }
    coverage
}

const TRANSFER: IdePosition = IdePosition::new(10, 4, 18, 5);
const APPROVE: IdePosition = IdePosition::new(20, 4, 25, 5);

// ============================================================================
// Merge
// ============================================================================

mod merge_tests {
    use super::*;

    #[test]
    fn test_two_workers_sum_hits() {
        let a = record(&[("Token.sol", TRANSFER, "transfer", 5)]);
        let b = record(&[("Token.sol", TRANSFER, "transfer", 5)]);
        let merged = merge([&a, &b]);
        assert_eq!(merged.hits("Token.sol", &TRANSFER), Some(10));
        assert_eq!(merged.total_hits(), 10);
    }

    #[test]
    fn test_disjoint_positions_are_kept() {
        let a = record(&[("Token.sol", TRANSFER, "transfer", 1)]);
        let b = record(&[("Token.sol", APPROVE, "approve", 2)]);
        let merged = merge([&a, &b]);
        assert_eq!(merged.hits("Token.sol", &TRANSFER), Some(1));
        assert_eq!(merged.hits("Token.sol", &APPROVE), Some(2));
    }

    #[test]
    fn test_zero_hits_are_dropped() {
        let a = record(&[
            ("Token.sol", TRANSFER, "transfer", 0),
            ("Vault.sol", APPROVE, "deposit", 0),
        ]);
        let merged = merge([&a]);
        assert!(merged.is_empty());
        assert_eq!(merged.hits("Token.sol", &TRANSFER), None);
    }

    #[test]
    fn test_name_conflict_resolves_to_smallest() {
        let a = record(&[("Token.sol", TRANSFER, "transferFrom", 1)]);
        let b = record(&[("Token.sol", TRANSFER, "transfer", 1)]);
        let ab = merge([&a, &b]);
        let ba = merge([&b, &a]);
        assert_eq!(ab, ba);
        assert_eq!(ab.as_record()["Token.sol"][&TRANSFER].name, "transfer");
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(merge(std::iter::empty::<&IdeCoverage>()).is_empty());
    }

    #[test]
    fn test_pretty_json_shape() {
        let a = record(&[("Token.sol", TRANSFER, "transfer", 3)]);
        let json = merge([&a]).to_json_pretty().unwrap();
        let expected = "{\n    \"Token.sol\": {\n        \"10:4-18:5\": {\n            \"name\": \"transfer\",\n            \"coverageHits\": 3\n        }\n    }\n}";
        assert_eq!(json, expected);
    }
}

// ============================================================================
// Function summary
// ============================================================================

mod summary_tests {
    use super::*;

    #[test]
    fn test_unique_names_are_bare() {
        let a = record(&[
            ("Token.sol", TRANSFER, "transfer", 4),
            ("Vault.sol", APPROVE, "deposit", 1),
        ]);
        let summary = function_summary(&merge([&a]));
        assert_eq!(summary.get("transfer"), Some(&4));
        assert_eq!(summary.get("deposit"), Some(&1));
    }

    #[test]
    fn test_shared_names_are_qualified() {
        let a = record(&[
            ("Token.sol", TRANSFER, "transfer", 4),
            ("Wrapped.sol", TRANSFER, "transfer", 2),
        ]);
        let summary = function_summary(&merge([&a]));
        assert_eq!(summary.get("Token.sol:transfer"), Some(&4));
        assert_eq!(summary.get("Wrapped.sol:transfer"), Some(&2));
        assert!(!summary.contains_key("transfer"));
    }

    #[test]
    fn test_ranked_highest_first() {
        let a = record(&[
            ("Token.sol", TRANSFER, "transfer", 1),
            ("Token.sol", APPROVE, "approve", 9),
        ]);
        let ranked = ranked_functions(&merge([&a]));
        assert_eq!(ranked[0], ("approve".to_string(), 9));
        assert_eq!(ranked[1], ("transfer".to_string(), 1));
    }
}

// ============================================================================
// Aggregator
// ============================================================================

mod aggregator_tests {
    use super::*;

    fn snapshot(hits: u64) -> CoverageSnapshot {
        CoverageSnapshot {
            full: record(&[("Token.sol", TRANSFER, "transfer", hits)]),
            per_transaction: record(&[("Token.sol", TRANSFER, "transfer", 1)]),
        }
    }

    #[test]
    fn test_latest_snapshot_replaces_previous() {
        let mut agg = CoverageAggregator::new();
        agg.submit(0, snapshot(3));
        agg.submit(0, snapshot(7));
        agg.submit(1, snapshot(5));
        assert_eq!(agg.reporters(), 2);
        assert_eq!(agg.full().hits("Token.sol", &TRANSFER), Some(12));
        assert_eq!(agg.per_transaction().hits("Token.sol", &TRANSFER), Some(2));
    }

    #[test]
    fn test_summary_lines() {
        let mut agg = CoverageAggregator::new();
        agg.submit(0, snapshot(3));
        assert_eq!(agg.summary_lines(), vec!["transfer: 3".to_string()]);
    }

    #[test]
    fn test_persist_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut agg = CoverageAggregator::new();
        agg.submit(0, snapshot(5));
        agg.submit(1, snapshot(5));

        let written = agg.persist(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with(FULL_COVERAGE_FILE));
        assert!(written[1].ends_with(PER_TRANSACTION_COVERAGE_FILE));

        let full = read_coverage_file(&written[0]).unwrap();
        assert_eq!(full["Token.sol"][&TRANSFER].coverage_hits, 10);
    }

    #[test]
    fn test_persist_skips_empty_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let agg = CoverageAggregator::new();
        assert!(agg.persist(dir.path()).unwrap().is_empty());
        assert!(!dir.path().join(FULL_COVERAGE_FILE).exists());
    }

    #[test]
    fn test_read_missing_file_fails() {
        assert!(read_coverage_file(Path::new("/nonexistent/chainfuzz.cov")).is_err());
    }
}

// ============================================================================
// Probe
// ============================================================================

mod probe_tests {
    use super::*;
    use crate::protocol::channel_pair;
    use std::sync::Arc;

    #[test]
    fn test_probe_tracks_transactions() {
        let (uplink, _channels) = channel_pair();
        let mut probe = CoverageProbe::new(42, Arc::new(uplink));
        assert_eq!(probe.starting_block(), 42);

        probe.record_hit("Token.sol", TRANSFER, "transfer");
        probe.begin_transaction();
        probe.record_hits("Token.sol", TRANSFER, "transfer", 2);
        probe.record_hits("Token.sol", APPROVE, "approve", 0);

        let snapshot = probe.snapshot();
        assert_eq!(snapshot.full["Token.sol"][&TRANSFER].coverage_hits, 3);
        assert_eq!(snapshot.per_transaction["Token.sol"][&TRANSFER].coverage_hits, 2);
        assert!(!snapshot.full["Token.sol"].contains_key(&APPROVE));
    }

    #[test]
    fn test_export_reaches_orchestrator() {
        let (uplink, channels) = channel_pair();
        let mut probe = CoverageProbe::new(0, Arc::new(uplink));
        probe.record_hit("Token.sol", TRANSFER, "transfer");
        probe.export().unwrap();

        let received = channels.coverage.try_recv().unwrap();
        assert_eq!(received, probe.snapshot());
    }
}

// ============================================================================
// Algebraic properties of merge
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_coverage() -> impl Strategy<Value = IdeCoverage> {
        let entry = (
            prop::sample::select(vec!["A.sol", "B.sol"]),
            0u32..4,
            prop::sample::select(vec!["f", "g", "h"]),
            0u64..50,
        );
        prop::collection::vec(entry, 0..8).prop_map(|entries| {
            let mut coverage = IdeCoverage::new();
            for (file, line, name, hits) in entries {
                coverage
                    .entry(file.to_string())
                    .or_default()
                    .insert(IdePosition::new(line, 0, line, 1), FunctionCoverageRecord::new(name, hits));
            }
            coverage
        })
    }

    proptest! {
        #[test]
        fn prop_merge_commutative(a in arb_coverage(), b in arb_coverage()) {
            prop_assert_eq!(merge([&a, &b]), merge([&b, &a]));
        }

        #[test]
        fn prop_merge_associative(a in arb_coverage(), b in arb_coverage(), c in arb_coverage()) {
            let ab = merge([&a, &b]).into_record();
            let bc = merge([&b, &c]).into_record();
            prop_assert_eq!(merge([&ab, &c]), merge([&a, &bc]));
            prop_assert_eq!(merge([&ab, &c]), merge([&a, &b, &c]));
        }

        #[test]
        fn prop_merge_single_is_stable(a in arb_coverage()) {
            let once = merge([&a]);
            let twice = merge([once.as_record()]);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_resubmission_does_not_double_count(a in arb_coverage(), b in arb_coverage(), repeats in 1usize..4) {
            let snapshot = CoverageSnapshot { full: a.clone(), per_transaction: a.clone() };
            let mut agg = CoverageAggregator::new();
            agg.submit(1, CoverageSnapshot { full: b.clone(), per_transaction: b.clone() });
            for _ in 0..repeats {
                agg.submit(0, snapshot.clone());
            }
            prop_assert_eq!(agg.full(), &merge([&a, &b]));
        }

        #[test]
        fn prop_merge_preserves_total(a in arb_coverage(), b in arb_coverage()) {
            let total = merge([&a]).total_hits() + merge([&b]).total_hits();
            prop_assert_eq!(merge([&a, &b]).total_hits(), total);
        }
    }
}
