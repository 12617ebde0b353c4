//! Feature flag query benchmarks
//!
//! Measures the `is_enabled` hot path, snapshot rebuilds, and reads under
//! concurrent refreshes.
//!
//! Run with: `cargo bench --bench features_bench -p ivy-infra`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ivy_core::{keys, FeatureRegistry, Features, FlagSnapshot, OverrideMap};
use ivy_domain::FlagValue;
use ivy_infra::{IvyFeatures, StaticOverrideSource};

// ============================================================================
// Query Benchmarks
// ============================================================================

fn bench_is_enabled(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_enabled");
    group.throughput(Throughput::Elements(1));

    let features = IvyFeatures::new(Arc::new(FeatureRegistry::ivy_defaults()));

    group.bench_function("known_flag", |b| {
        b.iter(|| black_box(features.is_enabled(black_box(keys::DARK_MODE_V2))));
    });
    group.bench_function("unknown_flag", |b| {
        b.iter(|| black_box(features.is_enabled(black_box("no_such_flag"))));
    });
    group.bench_function("snapshot_clone", |b| {
        b.iter(|| black_box(features.snapshot()));
    });

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_resolve");
    let registry = FeatureRegistry::ivy_defaults();

    for overridden in [0usize, 5, 10] {
        let remote: OverrideMap = registry
            .iter()
            .filter(|flag| flag.default.as_bool().is_some())
            .take(overridden)
            .map(|flag| (flag.key.clone(), FlagValue::Bool(true)))
            .collect();
        let local = OverrideMap::new();

        group.bench_with_input(BenchmarkId::new("remote_overrides", overridden), &remote, |b, remote| {
            b.iter(|| black_box(FlagSnapshot::resolve(&registry, remote, &local, 1)));
        });
    }

    group.finish();
}

// ============================================================================
// Concurrent Benchmarks
// ============================================================================

fn bench_reads_during_refresh(c: &mut Criterion) {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => panic!("failed to build runtime: {err}"),
    };

    let source = Arc::new(StaticOverrideSource::default());
    let features = Arc::new(
        IvyFeatures::new(Arc::new(FeatureRegistry::ivy_defaults()))
            .with_source(Arc::clone(&source) as _),
    );

    let writer = {
        let features = Arc::clone(&features);
        let source = Arc::clone(&source);
        runtime.spawn(async move {
            let mut on = false;
            loop {
                on = !on;
                source.set(keys::DARK_MODE_V2, on);
                features.refresh().await;
                tokio::task::yield_now().await;
            }
        })
    };

    c.bench_function("is_enabled_during_refresh", |b| {
        b.iter(|| black_box(features.is_enabled(black_box(keys::DARK_MODE_V2))));
    });

    writer.abort();
}

criterion_group!(queries, bench_is_enabled, bench_resolve);
criterion_group!(concurrent, bench_reads_during_refresh);

criterion_main!(queries, concurrent);
