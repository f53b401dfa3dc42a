//! Convenient re-exports for common types and traits

pub use crate::core::{
    BoxedJob, ClosureJob, Job, JobError, JobHandle, JobStatus, Result, ThreadError,
};
pub use crate::pool::{ThreadPool, ThreadPoolConfig, WorkerStats};
pub use crate::queue::{PoolState, QueueSnapshot};
