//! Coverage Merge Benchmarks
//!
//! Benchmarks for merging per-worker coverage and summarising it.
//!
//! Run with: `cargo bench --bench merge_ops`

use chainfuzz::coverage::{
    function_summary, merge, CoverageAggregator, CoverageSnapshot, FunctionCoverageRecord,
    IdeCoverage, IdePosition,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn worker_record(worker: u64, files: u32, functions: u32) -> IdeCoverage {
    let mut record = IdeCoverage::new();
    for file in 0..files {
        let entries = record.entry(format!("contracts/C{file}.sol")).or_default();
        for function in 0..functions {
            let line = function * 10 + 1;
            entries.insert(
                IdePosition::new(line, 4, line + 8, 5),
                FunctionCoverageRecord::new(format!("f{function}"), worker + u64::from(function)),
            );
        }
    }
    record
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for workers in [2_u64, 8, 32] {
        let records: Vec<IdeCoverage> = (0..workers).map(|w| worker_record(w, 10, 20)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &records, |bench, records| {
            bench.iter(|| black_box(merge(black_box(records.iter()))));
        });
    }

    group.finish();
}

fn bench_function_summary(c: &mut Criterion) {
    let records: Vec<IdeCoverage> = (0..8).map(|w| worker_record(w, 25, 40)).collect();
    let merged = merge(records.iter());
    c.bench_function("function_summary", |bench| {
        bench.iter(|| black_box(function_summary(black_box(&merged))));
    });
}

fn bench_aggregator_resubmit(c: &mut Criterion) {
    let snapshot = CoverageSnapshot {
        full: worker_record(1, 10, 20),
        per_transaction: worker_record(1, 2, 5),
    };
    c.bench_function("aggregator_resubmit_8_workers", |bench| {
        let mut aggregator = CoverageAggregator::new();
        bench.iter(|| {
            for worker in 0..8 {
                aggregator.submit(worker, snapshot.clone());
            }
            black_box(aggregator.full().total_hits());
        });
    });
}

criterion_group!(
    benches,
    bench_merge,
    bench_function_summary,
    bench_aggregator_resubmit
);
criterion_main!(benches);
