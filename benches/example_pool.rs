//! Example pool benchmarks.
//!
//! Measures lease and return overhead for both pool modes, and a full
//! learner lease through the engine boundary.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gg_learner::engine::RawExample;
use gg_learner::{ExamplePool, InMemoryEngine, Learner, LearnerSettings, PoolMode};

fn bench_pool_lease_return(c: &mut Criterion) {
    let mut group = c.benchmark_group("example_pool_lease_return");

    for (name, mode) in [
        ("synchronized", PoolMode::Synchronized),
        ("unsynchronized", PoolMode::Unsynchronized),
    ] {
        let pool = ExamplePool::new(mode);
        for id in 0..64 {
            drop(pool.adopt(RawExample::new(id)));
        }

        group.throughput(Throughput::Elements(1));
        group.bench_function(BenchmarkId::new("take_release", name), |b| {
            b.iter(|| {
                let leased = pool.take().unwrap().unwrap();
                black_box(leased.raw());
                leased.release().unwrap()
            })
        });
    }

    group.finish();
}

fn bench_learner_get_or_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("learner_get_or_create_example");

    for thread_safe in [false, true] {
        let learner = Learner::new(
            Arc::new(InMemoryEngine::new()),
            LearnerSettings::new("-b 10").with_thread_safe_example_pooling(thread_safe),
        )
        .unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_function(BenchmarkId::new("warm_pool", thread_safe), |b| {
            b.iter(|| {
                let example = learner.get_or_create_example().unwrap();
                black_box(example.raw())
            })
        });
    }

    group.finish();
}

fn bench_pool_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("example_pool_drain");

    for size in [16usize, 256, 4096] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(BenchmarkId::new("drain", size), |b| {
            b.iter_batched(
                || {
                    let pool = ExamplePool::new(PoolMode::Synchronized);
                    for id in 0..size as u64 {
                        drop(pool.adopt(RawExample::new(id)));
                    }
                    pool
                },
                |pool| black_box(pool.drain().len()),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_pool_lease_return,
    bench_learner_get_or_create,
    bench_pool_drain
);
criterion_main!(benches);
