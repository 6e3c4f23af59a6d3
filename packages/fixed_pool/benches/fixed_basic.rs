//! Basic benchmarks for the `fixed_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use fixed_pool::Pool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;
const TEST_VALUE: TestItem = 1024;

const CAPACITY: usize = 10_000;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("fixed_basic");

    let allocs_op = allocs.operation("build");
    group.bench_function("build", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(Pool::<TestItem>::with_capacity(CAPACITY).unwrap()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("make_unique");
    group.bench_function("make_unique", |b| {
        b.iter_custom(|iters| {
            let pool = Pool::<TestItem>::with_capacity(CAPACITY).unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(pool.make_unique(black_box(TEST_VALUE)).unwrap()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("make_shared");
    group.bench_function("make_shared", |b| {
        b.iter_custom(|iters| {
            let pool = Pool::<TestItem>::with_capacity(CAPACITY).unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(pool.make_shared(black_box(TEST_VALUE)).unwrap()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("read_shared");
    group.bench_function("read_shared", |b| {
        b.iter_custom(|iters| {
            let pool = Pool::<TestItem>::with_capacity(1).unwrap();
            let item = pool.make_shared(TEST_VALUE).unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                _ = black_box(*item);
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("clone_shared");
    group.bench_function("clone_shared", |b| {
        b.iter_custom(|iters| {
            let pool = Pool::<TestItem>::with_capacity(1).unwrap();
            let item = pool.make_shared(TEST_VALUE).unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(item.clone()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("lock_weak");
    group.bench_function("lock_weak", |b| {
        b.iter_custom(|iters| {
            let pool = Pool::<TestItem>::with_capacity(1).unwrap();
            let item = pool.make_shared(TEST_VALUE).unwrap();
            let weak = item.make_weak();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(weak.lock()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("fill_and_release_10k");
    group.bench_function("fill_and_release_10k", |b| {
        b.iter_custom(|iters| {
            let pools = iter::repeat_with(|| Pool::<TestItem>::with_capacity(CAPACITY).unwrap())
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &pools {
                let items = iter::repeat_with(|| pool.make_unique(TEST_VALUE).unwrap())
                    .take(CAPACITY)
                    .collect::<Vec<_>>();

                drop(black_box(items));
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
