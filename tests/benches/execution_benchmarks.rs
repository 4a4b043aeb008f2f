//! # Contract Execution Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Registry lookup by name | < 1us |
//! | Registry lookup by displayed id | < 1us |
//! | Committed transaction, end to end | < 1ms |

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qc_11_contract_execution::registry::DISPLAY_ID_OFFSET;
use qc_tests::integration::{Harness, CONTRACT_TABLE_ID, ECOSYSTEM};
use std::time::Duration;

fn bench_registry_lookup(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let harness = runtime.block_on(Harness::private());
    let registry = harness.service.registry();

    let mut group = c.benchmark_group("qc-11-registry");
    group.bench_function("lookup_by_name", |b| {
        b.iter(|| black_box(registry.lookup_by_name(black_box("Register"), ECOSYSTEM)))
    });
    group.bench_function("lookup_by_display_id", |b| {
        b.iter(|| black_box(registry.lookup_by_id(black_box(CONTRACT_TABLE_ID + DISPLAY_ID_OFFSET))))
    });
    group.finish();
}

fn bench_execute_transaction(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let harness = runtime.block_on(Harness::paid());

    let mut group = c.benchmark_group("qc-11-execution");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("commit_insert", |b| {
        b.iter(|| black_box(runtime.block_on(harness.execute("Register"))))
    });
    group.bench_function("fee_charged_failure", |b| {
        b.iter(|| black_box(runtime.block_on(harness.execute("Crash"))))
    });
    group.finish();
}

criterion_group!(benches, bench_registry_lookup, bench_execute_transaction);
criterion_main!(benches);
