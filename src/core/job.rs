//! Job trait and related types

use crate::core::error::{JobError, Result};
use crate::core::promise::{self, JobHandle, Promise};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Generates a unique job ID
pub fn next_job_id() -> u64 {
    NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed)
}

/// How a job finished, as seen by the worker that ran it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// The job produced a value
    Completed,
    /// The job returned an error
    Failed(String),
    /// The job panicked
    Panicked(String),
}

/// A type-erased unit of work queued in the pool.
///
/// Implementors own whatever delivers their outcome to the submitter; the
/// worker only learns the [`JobStatus`].
pub trait Job: Send {
    /// Run the job once and publish its outcome.
    ///
    /// Implementations must not let a panic from user code escape.
    fn run(self: Box<Self>) -> JobStatus;

    /// Unique job ID
    fn job_id(&self) -> u64;

    /// Get the job's type name for debugging and statistics
    fn job_type(&self) -> &str {
        "Job"
    }
}

impl fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({}#{})", self.job_type(), self.job_id())
    }
}

/// A boxed job that can be sent across threads
pub type BoxedJob = Box<dyn Job>;

/// A job built from a closure and the promise for its result
pub struct ClosureJob<F, T>
where
    F: FnOnce() -> Result<T> + Send,
    T: Send,
{
    id: u64,
    name: String,
    closure: F,
    promise: Promise<T>,
}

impl<F, T> ClosureJob<F, T>
where
    F: FnOnce() -> Result<T> + Send,
    T: Send,
{
    /// Create a new closure job and the handle that receives its result
    pub fn new(closure: F) -> (Self, JobHandle<T>) {
        Self::with_name(closure, "ClosureJob")
    }

    /// Create a new closure job with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> (Self, JobHandle<T>) {
        let id = next_job_id();
        let (promise, handle) = promise::channel(id);
        let job = Self {
            id,
            name: name.into(),
            closure,
            promise,
        };
        (job, handle)
    }
}

impl<F, T> Job for ClosureJob<F, T>
where
    F: FnOnce() -> Result<T> + Send,
    T: Send,
{
    fn run(self: Box<Self>) -> JobStatus {
        let ClosureJob {
            id,
            closure,
            promise,
            ..
        } = *self;

        match catch_unwind(AssertUnwindSafe(closure)) {
            Ok(Ok(value)) => {
                promise.resolve(value);
                JobStatus::Completed
            }
            Ok(Err(err)) => {
                let message = err.to_string();
                promise.fail(JobError::failed(id, message.clone()));
                JobStatus::Failed(message)
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                promise.fail(JobError::panicked(id, message.clone()));
                JobStatus::Panicked(message)
            }
        }
    }

    fn job_id(&self) -> u64 {
        self.id
    }

    fn job_type(&self) -> &str {
        &self.name
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
