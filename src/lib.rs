//! # Worker Pool
//!
//! A bounded-lifetime, resizable pool of worker threads that run submitted
//! closures in FIFO order and hand each result back through a one-shot handle.
//!
//! ## Features
//!
//! - **Thread Pool**: Fixed set of named worker threads fed from one queue
//! - **Result Handles**: Every submission returns a [`JobHandle`] that can be
//!   waited on, polled, or awaited from async code
//! - **Failure Capture**: Errors and panics inside jobs reach the handle;
//!   workers keep running
//! - **Resizing**: Drain the pool and restart it with a different worker count
//! - **Graceful Shutdown**: Every accepted job runs before the workers exit
//! - **Worker Statistics**: Per-worker counters that survive resizes
//!
//! ## Quick Start
//!
//! ```rust
//! use worker_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = ThreadPool::with_threads(4)?;
//!
//! let handles: Vec<_> = (0..10u64)
//!     .map(|i| pool.submit(move || i * i))
//!     .collect::<Result<_>>()?;
//!
//! let squares: Vec<u64> = handles
//!     .into_iter()
//!     .map(JobHandle::join)
//!     .collect::<Result<_>>()?;
//! assert_eq!(squares[9], 81);
//!
//! pool.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Pool Configuration
//!
//! ```rust
//! use worker_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let config = ThreadPoolConfig::new(8).with_thread_name_prefix("my-worker");
//!
//! let pool = ThreadPool::with_config(config)?;
//! assert_eq!(pool.pool_size(), 8);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failures
//!
//! ```rust
//! use worker_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = ThreadPool::with_threads(2)?;
//!
//! let handle = pool.submit(|| -> u32 { panic!("boom") })?;
//! match handle.wait() {
//!     Err(ThreadError::Job(JobError::Panicked { message, .. })) => assert_eq!(message, "boom"),
//!     other => panic!("unexpected outcome: {:?}", other),
//! }
//!
//! // The pool is still usable
//! assert_eq!(pool.submit(|| 1)?.wait()?, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Resizing and Statistics
//!
//! ```rust
//! use worker_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = ThreadPool::with_threads(2)?;
//! for _ in 0..10 {
//!     pool.execute(|| Ok(()))?;
//! }
//!
//! pool.resize(4)?;
//! assert_eq!(pool.pool_size(), 4);
//!
//! for (i, stat) in pool.get_stats().iter().enumerate() {
//!     println!("Worker {}: {} jobs processed", i, stat.get_jobs_processed());
//! }
//! assert_eq!(pool.total_jobs_processed(), 10);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;
pub mod queue;

pub use core::{BoxedJob, ClosureJob, Job, JobError, JobHandle, Result, ThreadError};
pub use pool::{ThreadPool, ThreadPoolConfig, WorkerStats};
pub use queue::{PoolState, QueueSnapshot};
