//! Core types and traits for the worker pool

pub mod error;
pub mod job;
pub mod promise;

pub use error::{JobError, Result, ThreadError};
pub use job::{BoxedJob, ClosureJob, Job, JobStatus};
pub use promise::{JobHandle, Promise};
