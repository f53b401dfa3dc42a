//! Basic worker pool usage example
//!
//! Walks through submission, counters, clearing, resizing and batches.
//!
//! Run with: RUST_LOG=worker_pool=debug cargo run --example basic_usage

use std::thread;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use worker_pool::prelude::*;

fn print_counts(pool: &ThreadPool) {
    let snapshot = pool.snapshot();
    println!(
        "   queued: {} ongoing: {} total: {}",
        snapshot.pending,
        snapshot.ongoing,
        snapshot.total()
    );
}

fn slow_identity(x: i32) -> i32 {
    thread::sleep(Duration::from_millis(500));
    x
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_names(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,worker_pool=info")),
        )
        .init();

    println!("=== Worker Pool - Basic Usage Example ===\n");

    let pool = ThreadPool::new()?;
    println!("1. Pool size: {}", pool.pool_size());
    print_counts(&pool);

    println!("\n2. Jobs without a value:");
    let hello = pool.submit(|| println!("   Hello world"))?;
    print_counts(&pool);
    hello.wait()?;
    print_counts(&pool);

    let input = vec![1, 2, 3];
    pool.submit(move || drop(input))?.wait()?;

    println!("\n3. Jobs returning values:");
    let float = pool.submit(|| {
        thread::sleep(Duration::from_millis(500));
        0.0f64
    })?;
    let int = pool.submit(|| slow_identity(1))?;
    thread::sleep(Duration::from_millis(250));
    print_counts(&pool);
    println!("   float job: {}", float.wait()?);
    println!("   int job: {}", int.wait()?);

    println!("\n4. Waiting for a burst of jobs:");
    for _ in 0..32 {
        pool.execute(|| {
            thread::sleep(Duration::from_millis(50));
            Ok(())
        })?;
    }
    print_counts(&pool);
    pool.wait_for_idle();
    print_counts(&pool);

    println!("\n5. Clearing the queue:");
    for _ in 0..10_000 {
        pool.execute(|| {
            thread::sleep(Duration::from_millis(50));
            Ok(())
        })?;
    }
    print_counts(&pool);
    println!("   discarded {} jobs", pool.clear_queue());
    print_counts(&pool);
    pool.wait_for_idle();
    print_counts(&pool);

    println!("\n6. Resizing:");
    for _ in 0..8 {
        pool.execute(|| {
            thread::sleep(Duration::from_millis(50));
            Ok(())
        })?;
    }
    pool.resize(32)?;
    println!("   Pool size: {}", pool.pool_size());

    for _ in 0..32 {
        pool.execute(|| {
            thread::sleep(Duration::from_millis(50));
            Ok(())
        })?;
    }
    pool.resize(4)?;
    println!("   Pool size: {}", pool.pool_size());

    println!("\n7. Batches:");
    let flag = true;
    let batch: Vec<Box<dyn FnOnce() -> i32 + Send>> = vec![
        Box::new(|| slow_identity(2)),
        Box::new(|| 3),
        Box::new(move || if flag { 12 } else { 0 }),
        Box::new(|| 22),
    ];
    let values = pool
        .submit_all_and_wait(batch)?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    println!("   {:?}", values);

    let unit_batch: Vec<Box<dyn FnOnce() + Send>> = vec![Box::new(|| {}), Box::new(|| {})];
    for outcome in pool.submit_all_and_wait(unit_batch)? {
        outcome?;
    }

    println!("\n8. Failures:");
    let failing = pool.submit_fallible(|| -> Result<u32> { Err(ThreadError::other("bad input")) })?;
    let panicking = pool.submit(|| -> u32 { panic!("job blew up") })?;
    println!("   failing job: {}", failing.wait().unwrap_err());
    println!("   panicking job: {}", panicking.wait().unwrap_err());

    println!("\n9. Statistics:");
    println!("   Total jobs submitted: {}", pool.total_jobs_submitted());
    println!("   Total jobs processed: {}", pool.total_jobs_processed());
    println!("   Total jobs failed: {}", pool.total_jobs_failed());
    println!("   Total jobs panicked: {}", pool.total_jobs_panicked());
    for (i, stat) in pool.get_stats().iter().enumerate() {
        println!(
            "   Worker {}: {} processed, avg time: {:.2}μs",
            i,
            stat.get_jobs_processed(),
            stat.get_average_processing_time_us()
        );
    }

    println!("\n10. Shutting down worker pool...");
    pool.shutdown()?;
    println!("   Pool shut down successfully");

    Ok(())
}
