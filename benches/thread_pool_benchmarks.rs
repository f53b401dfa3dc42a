use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use worker_pool::prelude::*;

fn benchmark_thread_pool_creation(c: &mut Criterion) {
    c.bench_function("thread_pool_creation", |b| {
        b.iter(|| {
            let pool = ThreadPool::with_threads(4).expect("Failed to create pool");
            pool.shutdown().expect("Failed to shutdown pool");
        });
    });
}

fn benchmark_job_submission(c: &mut Criterion) {
    let mut group = c.benchmark_group("job_submission");

    // Lightweight jobs
    group.bench_function("lightweight_jobs_100", |b| {
        b.iter_batched(
            || ThreadPool::with_threads(4).expect("Failed to create pool"),
            |pool| {
                for _ in 0..100 {
                    pool.execute(|| {
                        black_box(1 + 1);
                        Ok(())
                    })
                    .expect("Failed to submit job");
                }
                pool.shutdown().expect("Failed to shutdown pool");
            },
            BatchSize::SmallInput,
        );
    });

    // Jobs whose values are collected through handles
    group.bench_function("submit_and_join_100", |b| {
        b.iter_batched(
            || ThreadPool::with_threads(4).expect("Failed to create pool"),
            |pool| {
                let sum: u64 = pool
                    .submit_all_and_wait((0..100u64).map(|i| {
                        move || {
                            let mut acc = 0u64;
                            for j in 0..1000 {
                                acc = acc.wrapping_add(i ^ j);
                            }
                            acc
                        }
                    }))
                    .expect("Failed to submit batch")
                    .into_iter()
                    .map(|r| r.expect("job result"))
                    .sum();
                black_box(sum);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn benchmark_concurrent_submission(c: &mut Criterion) {
    c.bench_function("concurrent_submission_4_threads", |b| {
        b.iter_batched(
            || Arc::new(ThreadPool::with_threads(4).expect("Failed to create pool")),
            |pool| {
                let handles: Vec<_> = (0..4)
                    .map(|_| {
                        let pool = Arc::clone(&pool);
                        std::thread::spawn(move || {
                            for _ in 0..25 {
                                pool.execute(|| Ok(())).expect("Failed to submit job");
                            }
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.join().expect("Thread panicked");
                }

                pool.wait_for_idle();
            },
            BatchSize::SmallInput,
        );
    });
}

fn benchmark_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("tasks_per_second", |b| {
        let pool = ThreadPool::with_threads(8).expect("Failed to create pool");
        b.iter(|| {
            let counter = Arc::new(AtomicU64::new(0));
            for _ in 0..1000 {
                let counter = Arc::clone(&counter);
                pool.execute(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
                .expect("Failed to submit job");
            }

            pool.wait_for_idle();
            assert_eq!(counter.load(Ordering::Relaxed), 1000, "Not all tasks completed");
        });
    });

    group.finish();
}

fn benchmark_resize(c: &mut Criterion) {
    c.bench_function("resize_2_to_8_and_back", |b| {
        let pool = ThreadPool::with_threads(2).expect("Failed to create pool");
        b.iter(|| {
            pool.resize(8).expect("Failed to resize pool");
            pool.resize(2).expect("Failed to resize pool");
        });
    });
}

criterion_group!(
    benches,
    benchmark_thread_pool_creation,
    benchmark_job_submission,
    benchmark_concurrent_submission,
    benchmark_throughput,
    benchmark_resize
);
criterion_main!(benches);
