//! Criterion benchmarks for the virtual display registry.
//!
//! Measures the create/release cycle against the in-memory display server,
//! i.e. the registry and id allocation overhead alone, plus listing with a
//! populated registry.
//!
//! Run with:
//! ```bash
//! cargo bench --package droidctl-server --bench registry_bench
//! ```

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use droidctl_core::DisplaySpec;
use droidctl_server::application::manage_displays::{VirtualDisplayManager, DEFAULT_ID_BASE};
use droidctl_server::infrastructure::display_server::mock::MockDisplayServer;

fn bench_create_release(c: &mut Criterion) {
    let manager = VirtualDisplayManager::new(Arc::new(MockDisplayServer::new()), DEFAULT_ID_BASE);
    let spec = DisplaySpec::new("bench", 1080, 1920, 240);

    c.bench_function("create_release_cycle", |b| {
        b.iter(|| {
            let id = manager.create(black_box(&spec)).expect("create");
            manager.release(black_box(id)).expect("release");
        })
    });
}

fn bench_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_active");
    for count in [1usize, 16, 128] {
        let manager =
            VirtualDisplayManager::new(Arc::new(MockDisplayServer::new()), DEFAULT_ID_BASE);
        let spec = DisplaySpec::new("bench", 720, 1280, 320);
        for _ in 0..count {
            manager.create(&spec).expect("create");
        }
        group.bench_with_input(BenchmarkId::from_parameter(count), &manager, |b, m| {
            b.iter(|| black_box(m.list()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_create_release, bench_list);
criterion_main!(benches);
