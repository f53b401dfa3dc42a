//! Thread pool implementation

use crate::core::{BoxedJob, ClosureJob, JobHandle, Result, ThreadError};
use crate::pool::worker::{Worker, WorkerStats};
use crate::queue::{JobQueue, PoolState, QueueError, QueueSnapshot};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// Configuration for thread pool
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Number of worker threads
    pub num_threads: usize,
    /// Thread name prefix
    pub thread_name_prefix: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            thread_name_prefix: "worker".to_string(),
        }
    }
}

impl ThreadPoolConfig {
    /// Create a new configuration with specified number of threads
    /// (0 = number of CPUs)
    #[must_use]
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads: if num_threads == 0 {
                num_cpus::get()
            } else {
                num_threads
            },
            ..Default::default()
        }
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(ThreadError::invalid_config(
                "num_threads",
                "Number of threads must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// A resizable pool of worker threads fed from one FIFO queue
///
/// Every submission returns a [`JobHandle`] through which the job's value,
/// error or panic is delivered.
///
/// # Lifecycle
///
/// The pool starts accepting as soon as it is constructed. [`resize`] and
/// [`shutdown`] both drain it first: new submissions fail with
/// [`ThreadError::PoolClosed`] while every queued and running job finishes,
/// then the workers are stopped and joined. Resize then starts a fresh worker
/// set and accepts again; shutdown leaves the pool terminated. Dropping the
/// pool shuts it down.
///
/// `wait_for_idle`, `resize` and `shutdown` block until the queue is empty,
/// so they must not be called from a job running on the same pool.
///
/// [`resize`]: ThreadPool::resize
/// [`shutdown`]: ThreadPool::shutdown
pub struct ThreadPool {
    config: ThreadPoolConfig,
    queue: Arc<JobQueue>,
    workers: Mutex<Vec<Worker>>,
    worker_stats: RwLock<Vec<Arc<WorkerStats>>>,
    retired_stats: WorkerStats,
    pool_size: AtomicUsize,
    total_jobs_submitted: AtomicU64,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("config", &self.config)
            .field("pool_size", &self.pool_size())
            .field("queue", &self.queue)
            .field(
                "total_jobs_submitted",
                &self.total_jobs_submitted.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl ThreadPool {
    /// Create a thread pool with one worker per CPU
    pub fn new() -> Result<Self> {
        Self::with_config(ThreadPoolConfig::default())
    }

    /// Create a thread pool with specified number of threads
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        Self::with_config(ThreadPoolConfig::new(num_threads))
    }

    /// Create a thread pool with custom configuration and start its workers
    pub fn with_config(config: ThreadPoolConfig) -> Result<Self> {
        config.validate()?;

        let pool = Self {
            config,
            queue: Arc::new(JobQueue::new()),
            workers: Mutex::new(Vec::new()),
            worker_stats: RwLock::new(Vec::new()),
            retired_stats: WorkerStats::new(),
            pool_size: AtomicUsize::new(0),
            total_jobs_submitted: AtomicU64::new(0),
        };

        let started = {
            let mut workers = pool.workers.lock();
            pool.spawn_workers(&mut workers, pool.config.num_threads)
        };
        // On failure the pool is dropped here, which stops the workers that did start
        started?;

        info!(
            workers = pool.config.num_threads,
            prefix = %pool.config.thread_name_prefix,
            "worker pool started"
        );
        Ok(pool)
    }

    /// Submit a closure and get a handle to its return value.
    ///
    /// Arguments are bound by capturing them in the closure. A panic inside
    /// the closure is delivered through the handle as
    /// [`JobError::Panicked`](crate::core::JobError::Panicked).
    ///
    /// # Errors
    ///
    /// [`ThreadError::PoolClosed`] if the pool is draining or terminated.
    /// Retry after the resize completes.
    ///
    /// # Example
    ///
    /// ```
    /// use worker_pool::prelude::*;
    ///
    /// # fn main() -> Result<()> {
    /// let pool = ThreadPool::with_threads(2)?;
    ///
    /// let (a, b) = (20, 22);
    /// let handle = pool.submit(move || a + b)?;
    /// assert_eq!(handle.wait()?, 42);
    /// # Ok(())
    /// # }
    /// ```
    pub fn submit<F, T>(&self, f: F) -> Result<JobHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (job, handle) = ClosureJob::new(move || Ok(f()));
        self.enqueue(Box::new(job))?;
        Ok(handle)
    }

    /// Submit a closure with a custom name used in log events
    pub fn submit_named<F, T, S>(&self, name: S, f: F) -> Result<JobHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
        S: Into<String>,
    {
        let (job, handle) = ClosureJob::with_name(move || Ok(f()), name);
        self.enqueue(Box::new(job))?;
        Ok(handle)
    }

    /// Submit a closure that can fail.
    ///
    /// An `Err` returned by the closure is delivered through the handle as
    /// [`JobError::Failed`](crate::core::JobError::Failed).
    pub fn submit_fallible<F, T>(&self, f: F) -> Result<JobHandle<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (job, handle) = ClosureJob::new(f);
        self.enqueue(Box::new(job))?;
        Ok(handle)
    }

    /// Submit a closure as a job without keeping its handle
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.submit_fallible(f).map(drop)
    }

    /// Submit every closure in order and return their handles.
    ///
    /// Stops at the first rejected submission; jobs submitted before it
    /// still run.
    pub fn submit_all<I, F, T>(&self, jobs: I) -> Result<Vec<JobHandle<T>>>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        jobs.into_iter().map(|f| self.submit(f)).collect()
    }

    /// Submit every closure in order, then wait for all of them.
    ///
    /// The outcomes come back in submission order, one per closure.
    ///
    /// # Example
    ///
    /// ```
    /// use worker_pool::prelude::*;
    ///
    /// # fn main() -> Result<()> {
    /// let pool = ThreadPool::with_threads(4)?;
    ///
    /// let jobs: Vec<Box<dyn FnOnce() -> i32 + Send>> = vec![
    ///     Box::new(|| 2),
    ///     Box::new(move || 2 + 3),
    ///     Box::new(|| 22),
    /// ];
    /// let values: Vec<i32> = pool
    ///     .submit_all_and_wait(jobs)?
    ///     .into_iter()
    ///     .collect::<Result<_>>()?;
    /// assert_eq!(values, vec![2, 5, 22]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn submit_all_and_wait<I, F, T>(&self, jobs: I) -> Result<Vec<Result<T>>>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let handles = self.submit_all(jobs)?;
        Ok(handles.into_iter().map(JobHandle::join).collect())
    }

    fn enqueue(&self, job: BoxedJob) -> Result<()> {
        let job_id = job.job_id();
        match self.queue.push(job) {
            Ok(queue_depth) => {
                self.total_jobs_submitted.fetch_add(1, Ordering::Relaxed);
                trace!(job_id, queue_depth, "job submitted");
                Ok(())
            }
            Err(QueueError::Closed { state }) => {
                debug!(job_id, %state, "job submission rejected");
                Err(ThreadError::pool_closed(state))
            }
        }
    }

    /// Block until no job is pending or running
    pub fn wait_for_idle(&self) {
        self.queue.wait_for_idle();
    }

    /// Block until no job is pending or running, or the timeout passes.
    ///
    /// Returns true if the pool became idle.
    pub fn wait_for_idle_timeout(&self, timeout: Duration) -> bool {
        self.queue.wait_for_idle_timeout(timeout)
    }

    /// Remove every job that has not started yet.
    ///
    /// Running jobs are unaffected. The removed jobs never run and their
    /// handles never resolve; `wait` on such a handle blocks forever.
    /// Returns the number of jobs removed.
    pub fn clear_queue(&self) -> usize {
        let discarded = self.queue.clear();
        debug!(discarded, "job queue cleared");
        discarded
    }

    /// Change the number of worker threads.
    ///
    /// Waits for every queued and running job to finish, joins the current
    /// workers and starts `new_size` fresh ones. Submissions made meanwhile
    /// fail with [`ThreadError::PoolClosed`]. No-op if the size is unchanged.
    ///
    /// # Errors
    ///
    /// - `ThreadError::InvalidConfig` - `new_size` is zero
    /// - `ThreadError::PoolClosed` - the pool has been shut down
    /// - `ThreadError::SpawnError` - a new worker could not be started; the
    ///   workers that did start keep serving the queue
    pub fn resize(&self, new_size: usize) -> Result<()> {
        if new_size == 0 {
            return Err(ThreadError::invalid_config(
                "num_threads",
                "Number of threads must be greater than 0",
            ));
        }

        let mut workers = self.workers.lock();
        let state = self.queue.state();
        if state == PoolState::Terminated {
            return Err(ThreadError::pool_closed(state));
        }

        let old_size = workers.len();
        if new_size == old_size {
            return Ok(());
        }

        self.drain();
        let stopped = self.stop_workers(&mut workers);

        self.queue.reset_terminate();
        let spawned = self.spawn_workers(&mut workers, new_size);
        if !workers.is_empty() {
            self.queue.set_state(PoolState::Accepting);
        }

        info!(from = old_size, to = workers.len(), "worker pool resized");
        stopped.and(spawned)
    }

    /// Shut the pool down.
    ///
    /// Rejects new submissions, waits for every queued and running job,
    /// then stops and joins the workers. Calling it again is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        let mut workers = self.workers.lock();
        if self.queue.state() == PoolState::Terminated {
            return Ok(());
        }

        self.drain();
        let stopped = self.stop_workers(&mut workers);
        self.queue.set_state(PoolState::Terminated);

        info!(
            jobs_processed = self.total_jobs_processed(),
            jobs_failed = self.total_jobs_failed(),
            jobs_panicked = self.total_jobs_panicked(),
            "worker pool shutdown complete"
        );
        stopped
    }

    fn drain(&self) {
        self.queue.set_state(PoolState::Draining);
        debug!(
            outstanding = self.queue.snapshot().total(),
            "draining worker pool"
        );
        self.queue.wait_for_idle();
    }

    fn spawn_workers(&self, workers: &mut Vec<Worker>, count: usize) -> Result<()> {
        let spawned = (0..count).try_for_each(|id| -> Result<()> {
            let worker = Worker::new(
                id,
                Arc::clone(&self.queue),
                &self.config.thread_name_prefix,
            )?;
            workers.push(worker);
            Ok(())
        });

        *self.worker_stats.write() = workers.iter().map(Worker::stats).collect();
        self.pool_size.store(workers.len(), Ordering::Release);

        if let Err(e) = &spawned {
            error!(requested = count, started = workers.len(), error = %e, "failed to start workers");
        }
        spawned
    }

    fn stop_workers(&self, workers: &mut Vec<Worker>) -> Result<()> {
        self.queue.signal_terminate();

        let mut first_error = None;
        for worker in workers.drain(..) {
            let id = worker.id();
            if let Err(e) = worker.join() {
                error!(worker = id, error = %e, "worker did not stop cleanly");
                first_error.get_or_insert(e);
            }
        }

        {
            let mut registry = self.worker_stats.write();
            for stats in registry.drain(..) {
                self.retired_stats.absorb(&stats);
            }
        }
        self.pool_size.store(0, Ordering::Release);

        first_error.map_or(Ok(()), Err)
    }

    /// Get number of worker threads
    pub fn pool_size(&self) -> usize {
        self.pool_size.load(Ordering::Acquire)
    }

    /// Get number of queued jobs that have not started
    pub fn pending_count(&self) -> usize {
        self.queue.snapshot().pending
    }

    /// Get number of jobs currently executing
    pub fn ongoing_count(&self) -> usize {
        self.queue.snapshot().ongoing
    }

    /// Get number of queued plus executing jobs
    pub fn total_count(&self) -> usize {
        self.queue.snapshot().total()
    }

    /// Pending, ongoing and state read together
    pub fn snapshot(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        self.queue.state()
    }

    /// Check if the pool currently accepts submissions
    pub fn is_accepting(&self) -> bool {
        self.state() == PoolState::Accepting
    }

    /// Thread name prefix of the workers
    pub fn thread_name_prefix(&self) -> &str {
        &self.config.thread_name_prefix
    }

    /// Get total number of jobs accepted by the pool
    pub fn total_jobs_submitted(&self) -> u64 {
        self.total_jobs_submitted.load(Ordering::Relaxed)
    }

    /// Get statistics of the current workers
    pub fn get_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.worker_stats.read().clone()
    }

    /// Get total jobs completed successfully, including by retired workers
    pub fn total_jobs_processed(&self) -> u64 {
        self.sum_stats(WorkerStats::get_jobs_processed)
    }

    /// Get total jobs that returned an error, including on retired workers
    pub fn total_jobs_failed(&self) -> u64 {
        self.sum_stats(WorkerStats::get_jobs_failed)
    }

    /// Get total jobs that panicked, including on retired workers
    pub fn total_jobs_panicked(&self) -> u64 {
        self.sum_stats(WorkerStats::get_jobs_panicked)
    }

    fn sum_stats(&self, counter: fn(&WorkerStats) -> u64) -> u64 {
        let registry = self.worker_stats.read();
        counter(&self.retired_stats) + registry.iter().map(|s| counter(s)).sum::<u64>()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(
                pool = %self.config.thread_name_prefix,
                error = %e,
                "failed to shut down worker pool during drop"
            );
        }
    }
}
