//! Error types for the worker pool

use crate::queue::PoolState;

/// Result type for worker pool operations
pub type Result<T> = std::result::Result<T, ThreadError>;

/// Outcome error of a single job, delivered through its [`JobHandle`].
///
/// Cheap to clone so that repeated waits on one handle observe the same error.
///
/// [`JobHandle`]: crate::core::JobHandle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// The job returned an error
    #[error("Job execution failed (job_id: {job_id}): {message}")]
    Failed {
        /// ID of the failed job
        job_id: u64,
        /// Error message
        message: String,
    },

    /// The job panicked
    #[error("Job panicked (job_id: {job_id}): {message}")]
    Panicked {
        /// ID of the panicked job
        job_id: u64,
        /// Panic message
        message: String,
    },
}

impl JobError {
    /// Create a failed job error
    pub fn failed(job_id: u64, message: impl Into<String>) -> Self {
        JobError::Failed {
            job_id,
            message: message.into(),
        }
    }

    /// Create a panicked job error
    pub fn panicked(job_id: u64, message: impl Into<String>) -> Self {
        JobError::Panicked {
            job_id,
            message: message.into(),
        }
    }

    /// ID of the job this error belongs to
    pub fn job_id(&self) -> u64 {
        match self {
            JobError::Failed { job_id, .. } | JobError::Panicked { job_id, .. } => *job_id,
        }
    }
}

/// Errors that can occur in the worker pool
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ThreadError {
    /// The pool does not accept submissions in its current state
    #[error("Worker pool is closed for submissions (state: {state})")]
    PoolClosed {
        /// State the pool was in when the submission was rejected
        state: PoolState,
    },

    /// The job itself failed or panicked
    #[error(transparent)]
    Job(#[from] JobError),

    /// Failed to spawn a worker thread with details
    #[error("Failed to spawn worker thread #{thread_id}: {message}")]
    SpawnError {
        /// ID of the thread that failed to spawn
        thread_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker thread #{thread_id}: {message}")]
    JoinError {
        /// ID of the thread that failed to join
        thread_id: usize,
        /// Error message
        message: String,
    },

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

impl ThreadError {
    /// Create a pool closed error
    pub fn pool_closed(state: PoolState) -> Self {
        ThreadError::PoolClosed { state }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        thread_id: usize,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        ThreadError::SpawnError {
            thread_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(thread_id: usize, message: impl Into<String>) -> Self {
        ThreadError::JoinError {
            thread_id,
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        ThreadError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        ThreadError::Other(msg.into())
    }

    /// Returns true if this error means the pool refused a submission
    pub fn is_pool_closed(&self) -> bool {
        matches!(self, ThreadError::PoolClosed { .. })
    }

    /// Returns the job error if this error is a job outcome
    pub fn as_job_error(&self) -> Option<&JobError> {
        match self {
            ThreadError::Job(e) => Some(e),
            _ => None,
        }
    }
}
