//! Performance benchmarks for the watchdog registry.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use openracing_link_watchdog::prelude::*;
use std::hint::black_box;

fn populated(size: usize, dispatch: CallbackDispatch) -> WatchdogRegistry {
    let config = RegistryConfig {
        dispatch,
        ..RegistryConfig::default()
    };
    let registry = WatchdogRegistry::with_config(config).unwrap();
    for i in 0..size {
        registry
            .register(&format!("link_{i}"), u32::MAX, || {}, || {})
            .unwrap();
    }
    registry
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    let sizes: [usize; 4] = [1, 10, 50, 200];
    for &size in &sizes {
        group.bench_with_input(
            BenchmarkId::new("within_lock", size),
            &size,
            |b: &mut criterion::Bencher, &size| {
                let registry = populated(size, CallbackDispatch::WithinLock);
                b.iter(|| registry.tick(black_box(1)));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("after_unlock", size),
            &size,
            |b: &mut criterion::Bencher, &size| {
                let registry = populated(size, CallbackDispatch::AfterUnlock);
                b.iter(|| registry.tick(black_box(1)));
            },
        );
    }

    group.finish();
}

fn bench_refresh(c: &mut Criterion) {
    let registry = populated(50, CallbackDispatch::WithinLock);
    let head = registry.handle_of("link_0").unwrap();
    let tail = registry.handle_of("link_49").unwrap();

    c.bench_function("refresh_by_handle", |b| {
        b.iter(|| registry.refresh_by_handle(black_box(tail)));
    });

    c.bench_function("refresh_by_name_head", |b| {
        b.iter(|| registry.refresh_by_name(black_box("link_0")));
    });

    c.bench_function("refresh_by_name_tail", |b| {
        b.iter(|| registry.refresh_by_name(black_box("link_49")));
    });

    c.bench_function("entry_snapshot", |b| {
        b.iter(|| registry.entry(black_box(head)));
    });
}

fn bench_register_remove(c: &mut Criterion) {
    c.bench_function("register_then_remove", |b| {
        let registry = populated(10, CallbackDispatch::WithinLock);
        b.iter(|| {
            let handle = registry
                .register(black_box("transient"), 10, || {}, || {})
                .unwrap();
            registry.remove_by_handle(handle).unwrap();
        });
    });
}

criterion_group!(benches, bench_tick, bench_refresh, bench_register_remove);

criterion_main!(benches);
