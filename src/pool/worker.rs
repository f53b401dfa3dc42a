//! Worker thread implementation

use crate::core::job::panic_message;
use crate::core::{BoxedJob, JobStatus, Result, ThreadError};
use crate::queue::JobQueue;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, span, warn, Level};

/// Outcome counters of one worker, updated after every job it runs.
///
/// Counters use relaxed ordering; readers get eventually consistent totals.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Jobs whose closure returned a value
    pub jobs_processed: AtomicU64,
    /// Jobs whose closure returned an error
    pub jobs_failed: AtomicU64,
    /// Jobs whose closure panicked
    pub jobs_panicked: AtomicU64,
    /// Wall time spent inside jobs of any outcome (microseconds)
    pub total_processing_time_us: AtomicU64,
}

/// Plain copy of [`WorkerStats`] at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStatSnapshot {
    /// Jobs that completed successfully
    pub jobs_processed: u64,
    /// Jobs that failed
    pub jobs_failed: u64,
    /// Jobs that panicked
    pub jobs_panicked: u64,
    /// Time spent processing jobs (microseconds)
    pub total_processing_time_us: u64,
}

impl WorkerStats {
    /// Zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one job by how it finished and add its running time
    pub fn record(&self, status: &JobStatus, elapsed_us: u64) {
        let counter = match status {
            JobStatus::Completed => &self.jobs_processed,
            JobStatus::Failed(_) => &self.jobs_failed,
            JobStatus::Panicked(_) => &self.jobs_panicked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.total_processing_time_us
            .fetch_add(elapsed_us, Ordering::Relaxed);
    }

    /// Jobs that completed successfully
    pub fn get_jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Relaxed)
    }

    /// Jobs that returned an error
    pub fn get_jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    /// Jobs that panicked
    pub fn get_jobs_panicked(&self) -> u64 {
        self.jobs_panicked.load(Ordering::Relaxed)
    }

    /// Mean time per job across all outcomes, in microseconds
    pub fn get_average_processing_time_us(&self) -> f64 {
        let snapshot = self.snapshot();
        let jobs = snapshot.jobs_processed + snapshot.jobs_failed + snapshot.jobs_panicked;
        if jobs == 0 {
            return 0.0;
        }
        snapshot.total_processing_time_us as f64 / jobs as f64
    }

    /// Copy the counters out
    pub fn snapshot(&self) -> WorkerStatSnapshot {
        WorkerStatSnapshot {
            jobs_processed: self.get_jobs_processed(),
            jobs_failed: self.get_jobs_failed(),
            jobs_panicked: self.get_jobs_panicked(),
            total_processing_time_us: self.total_processing_time_us.load(Ordering::Relaxed),
        }
    }

    /// Add another worker's counters to these
    pub fn absorb(&self, other: &WorkerStats) {
        let snapshot = other.snapshot();
        self.jobs_processed
            .fetch_add(snapshot.jobs_processed, Ordering::Relaxed);
        self.jobs_failed
            .fetch_add(snapshot.jobs_failed, Ordering::Relaxed);
        self.jobs_panicked
            .fetch_add(snapshot.jobs_panicked, Ordering::Relaxed);
        self.total_processing_time_us
            .fetch_add(snapshot.total_processing_time_us, Ordering::Relaxed);
    }
}

/// Calls `complete_one` when the current job is done, even on unwind
struct CompletionGuard<'a> {
    queue: &'a JobQueue,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.queue.complete_one();
    }
}

/// A worker thread that processes jobs from a queue
#[derive(Debug)]
pub struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Create and start a new worker
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier for this worker, unique within its worker set
    /// * `queue` - Queue shared with the pool
    /// * `thread_name_prefix` - Thread is named `{prefix}-{id}`
    ///
    /// # Shutdown Behavior
    ///
    /// The worker exits when [`JobQueue::signal_terminate`] is called. The
    /// pool only signals after the queue has drained.
    pub fn new(id: usize, queue: Arc<JobQueue>, thread_name_prefix: &str) -> Result<Self> {
        let stats = Arc::new(WorkerStats::new());
        let stats_clone = Arc::clone(&stats);

        let thread = thread::Builder::new()
            .name(format!("{}-{}", thread_name_prefix, id))
            .spawn(move || {
                Self::run(id, queue, stats_clone);
            })
            .map_err(|e| ThreadError::spawn_with_source(id, e.to_string(), e))?;

        Ok(Self {
            id,
            thread: Some(thread),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Join the worker thread
    pub fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|payload| ThreadError::join(self.id, panic_message(&*payload)))?;
        }
        Ok(())
    }

    /// Main worker loop
    fn run(id: usize, queue: Arc<JobQueue>, stats: Arc<WorkerStats>) {
        let worker_span = span!(Level::DEBUG, "worker", id = id);
        let _guard = worker_span.enter();

        debug!("worker started");

        while let Some(job) = queue.take() {
            let _completion = CompletionGuard { queue: &queue };
            Self::execute_job(job, &stats);
        }

        debug!(
            jobs_processed = stats.get_jobs_processed(),
            jobs_failed = stats.get_jobs_failed(),
            jobs_panicked = stats.get_jobs_panicked(),
            "worker stopped"
        );
    }

    /// Run a single job and record how it went
    fn execute_job(job: BoxedJob, stats: &WorkerStats) {
        let job_id = job.job_id();
        let job_type = job.job_type().to_string();

        let start = Instant::now();
        let status = job.run();
        let elapsed_us = start.elapsed().as_micros() as u64;

        stats.record(&status, elapsed_us);

        match status {
            JobStatus::Completed => {
                debug!(
                    job_id,
                    job_type = %job_type,
                    duration_us = elapsed_us,
                    "job completed"
                );
            }
            JobStatus::Failed(message) => {
                warn!(
                    job_id,
                    job_type = %job_type,
                    error = %message,
                    duration_us = elapsed_us,
                    "job failed"
                );
            }
            JobStatus::Panicked(message) => {
                error!(
                    job_id,
                    job_type = %job_type,
                    panic_message = %message,
                    duration_us = elapsed_us,
                    "job panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClosureJob, JobError};
    use std::time::Duration;

    #[test]
    fn test_worker_creation() {
        let queue = Arc::new(JobQueue::new());

        let worker = Worker::new(0, Arc::clone(&queue), "test").expect("Failed to create worker");
        assert_eq!(worker.id(), 0);

        queue.signal_terminate();
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_worker_job_execution() {
        let queue = Arc::new(JobQueue::new());

        let worker = Worker::new(0, Arc::clone(&queue), "test").expect("Failed to create worker");
        let stats = worker.stats();

        let (job, handle) = ClosureJob::new(|| Ok(String::from("ok")));
        queue.push(Box::new(job)).expect("Failed to push job");

        assert_eq!(handle.wait().expect("job result"), "ok");
        queue.wait_for_idle();

        assert_eq!(stats.get_jobs_processed(), 1);
        assert_eq!(stats.get_jobs_failed(), 0);

        queue.signal_terminate();
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_worker_thread_name() {
        let queue = Arc::new(JobQueue::new());
        let worker = Worker::new(3, Arc::clone(&queue), "named").expect("Failed to create worker");

        let (job, handle) =
            ClosureJob::new(|| Ok(thread::current().name().map(str::to_string)));
        queue.push(Box::new(job)).expect("Failed to push job");
        assert_eq!(
            handle.wait().expect("job result").as_deref(),
            Some("named-3")
        );

        queue.signal_terminate();
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_worker_panic_handling() {
        let queue = Arc::new(JobQueue::new());

        let worker = Worker::new(0, Arc::clone(&queue), "test").expect("Failed to create worker");
        let stats = worker.stats();

        let (panicking, panicked_handle) = ClosureJob::new(|| -> Result<()> {
            panic!("Intentional panic for testing");
        });
        queue.push(Box::new(panicking)).expect("Failed to push job");

        assert!(matches!(
            panicked_handle.wait(),
            Err(ThreadError::Job(JobError::Panicked { .. }))
        ));

        // Worker is still alive
        let (normal, normal_handle) = ClosureJob::new(|| Ok(1));
        queue.push(Box::new(normal)).expect("Failed to push job");
        assert_eq!(normal_handle.wait().expect("job result"), 1);
        queue.wait_for_idle();

        assert_eq!(stats.get_jobs_processed(), 1);
        assert_eq!(stats.get_jobs_panicked(), 1);
        assert_eq!(stats.get_jobs_failed(), 0);

        queue.signal_terminate();
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_stats_absorb() {
        let retired = WorkerStats::new();
        let stats = WorkerStats::new();
        stats.record(&JobStatus::Completed, 30);
        stats.record(&JobStatus::Failed("bad input".to_string()), 10);

        retired.absorb(&stats);
        retired.absorb(&stats);

        let snapshot = retired.snapshot();
        assert_eq!(snapshot.jobs_processed, 2);
        assert_eq!(snapshot.jobs_failed, 2);
        assert_eq!(snapshot.jobs_panicked, 0);
        assert_eq!(snapshot.total_processing_time_us, 80);
        assert!((retired.get_average_processing_time_us() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_idle_worker_stays_idle() {
        let queue = Arc::new(JobQueue::new());
        let worker = Worker::new(0, Arc::clone(&queue), "test").expect("Failed to create worker");

        thread::sleep(Duration::from_millis(30));
        assert_eq!(queue.snapshot().total(), 0);
        assert_eq!(worker.stats().snapshot(), WorkerStatSnapshot::default());

        queue.signal_terminate();
        worker.join().expect("Failed to join worker");
    }
}
