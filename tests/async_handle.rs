//! Awaiting job handles from async code

use std::time::Duration;
use worker_pool::prelude::*;

#[tokio::test]
async fn test_await_job_handle() {
    let pool = ThreadPool::with_threads(2).expect("Failed to create pool");

    let handle = pool
        .submit(|| {
            std::thread::sleep(Duration::from_millis(20));
            String::from("from a worker")
        })
        .expect("Failed to submit job");

    assert_eq!(handle.await.expect("job result"), "from a worker");
}

#[tokio::test]
async fn test_await_many_handles() {
    let pool = ThreadPool::with_threads(4).expect("Failed to create pool");

    let handles = pool
        .submit_all((0..32u32).map(|i| move || i * 2))
        .expect("Failed to submit jobs");

    let mut total = 0;
    for handle in handles {
        total += handle.await.expect("job result");
    }
    assert_eq!(total, (0..32u32).map(|i| i * 2).sum::<u32>());
}

#[tokio::test]
async fn test_await_panicked_job() {
    let pool = ThreadPool::with_threads(1).expect("Failed to create pool");

    let handle = pool
        .submit(|| -> u8 { panic!("async caller sees this") })
        .expect("Failed to submit job");

    let err = handle.await.expect_err("job should panic");
    assert!(matches!(
        err.as_job_error(),
        Some(JobError::Panicked { message, .. }) if message == "async caller sees this"
    ));
}

#[tokio::test]
async fn test_await_with_timeout() {
    let pool = ThreadPool::with_threads(1).expect("Failed to create pool");

    let slow = pool
        .submit(|| std::thread::sleep(Duration::from_millis(200)))
        .expect("Failed to submit job");

    let early = tokio::time::timeout(Duration::from_millis(10), slow).await;
    assert!(early.is_err());
    pool.wait_for_idle();
}
