//! Resolution and snapshot comparison benchmarks.
//!
//! Measures the engine overhead on top of the in-memory browser:
//! - Fallback depth: winner at candidate 1, 4, 16
//! - Snapshot sizes: 10, 100, 1000 values
//!
//! Run with: cargo bench --bench resolve
//! Results saved to: target/criterion/

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use resilient_driver::ordering::{self, Snapshot};
use resilient_driver::sim::{SimBrowser, SimNode};
use resilient_driver::{By, LocatorSpec, Session};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const FALLBACK_DEPTHS: &[usize] = &[1, 4, 16];
const SNAPSHOT_SIZES: &[usize] = &[10, 100, 1000];

const PAGE: &str = "https://bench.test/";

// ============================================================================
// Fixtures
// ============================================================================

/// A page with `rows` list items and one email field.
fn session_with_rows(rows: usize) -> Session {
    let browser = SimBrowser::new();
    let mut nodes: Vec<SimNode> = (0..rows)
        .map(|i| SimNode::new("li").class("row").text(format!("row {i}")))
        .collect();
    nodes.push(SimNode::new("input").attr("type", "email"));
    browser.page(PAGE, nodes);
    browser.open(PAGE);
    Session::new(browser)
}

/// `depth - 1` candidates that miss, then one that hits.
fn spec_with_depth(depth: usize) -> LocatorSpec {
    let misses = (1..depth).map(|i| By::id(format!("missing-{i}")));
    LocatorSpec::from_candidates(misses.chain(std::iter::once(By::attr("type", "email")))).unwrap()
}

fn numeric_snapshot(len: usize, descending: bool) -> Snapshot {
    Snapshot::from_values((0..len).map(|i| {
        let v = if descending { len - i } else { i };
        format!("${v}.99")
    }))
}

// ============================================================================
// Benchmark: Fallback Resolution
// ============================================================================

fn bench_fallback_resolution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let session = rt.block_on(async { session_with_rows(200) });

    let mut group = c.benchmark_group("fallback_resolution");

    for &depth in FALLBACK_DEPTHS {
        let spec = spec_with_depth(depth);
        group.bench_with_input(BenchmarkId::new("depth", depth), &spec, |b, spec| {
            b.to_async(&rt).iter(|| async {
                let found = session.resolve(spec).await.unwrap();
                assert!(found.is_some());
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Snapshot Capture
// ============================================================================

fn bench_snapshot_capture(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("snapshot_capture");
    group.sample_size(20);

    for &rows in SNAPSHOT_SIZES {
        let session = rt.block_on(async { session_with_rows(rows) });
        let spec = LocatorSpec::new(By::class("row"));
        group.bench_with_input(BenchmarkId::new("rows", rows), &spec, |b, spec| {
            b.to_async(&rt)
                .iter(|| async { Snapshot::capture(&session, spec).await.unwrap() });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Snapshot Diff
// ============================================================================

fn bench_snapshot_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_diff");

    for &len in SNAPSHOT_SIZES {
        let before = numeric_snapshot(len, true);
        let after = numeric_snapshot(len, false);
        group.bench_with_input(BenchmarkId::new("values", len), &(before, after), |b, (before, after)| {
            b.iter(|| ordering::diff(before, after));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fallback_resolution,
    bench_snapshot_capture,
    bench_snapshot_diff
);
criterion_main!(benches);
