//! FIFO job queue shared by the pool and its workers.
//!
//! The queue, its counters and the pool state word live behind one
//! [`parking_lot::Mutex`]. Two condition variables hang off that lock:
//!
//! - `work_available`: "queue non-empty or workers must terminate", waited on
//!   by workers in [`JobQueue::take`]
//! - `idle`: "no pending and no ongoing jobs", waited on by
//!   [`JobQueue::wait_for_idle`]
//!
//! The predicates differ, so each gets its own condvar; a worker wakeup can
//! never be consumed by an idle-waiter and vice versa.
//!
//! ```rust
//! use worker_pool::core::{ClosureJob, Job};
//! use worker_pool::queue::JobQueue;
//!
//! let queue = JobQueue::new();
//! let (job, handle) = ClosureJob::new(|| Ok(5));
//! queue.push(Box::new(job)).unwrap();
//! assert_eq!(queue.snapshot().pending, 1);
//!
//! let job = queue.take().unwrap();
//! assert_eq!(queue.snapshot().ongoing, 1);
//! job.run();
//! queue.complete_one();
//!
//! assert_eq!(queue.snapshot().total(), 0);
//! assert_eq!(handle.wait().unwrap(), 5);
//! ```

use crate::core::BoxedJob;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle state of a pool, stored alongside its queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    /// Submissions are accepted
    Accepting,
    /// Submissions are rejected while outstanding work finishes
    Draining,
    /// Workers are gone; the pool will never accept work again
    Terminated,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Accepting => "accepting",
            PoolState::Draining => "draining",
            PoolState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Errors returned by queue operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The queue only accepts jobs while the pool is accepting
    #[error("Queue is closed (state: {state})")]
    Closed {
        /// State at the time of the push
        state: PoolState,
    },
}

/// Point-in-time view of the queue counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    /// Jobs waiting in the queue
    pub pending: usize,
    /// Jobs currently executing on a worker
    pub ongoing: usize,
    /// Pool state
    pub state: PoolState,
}

impl QueueSnapshot {
    /// Pending plus ongoing jobs
    pub fn total(&self) -> usize {
        self.pending + self.ongoing
    }
}

struct QueueState {
    jobs: VecDeque<BoxedJob>,
    ongoing: usize,
    state: PoolState,
    terminate: bool,
}

impl QueueState {
    fn total(&self) -> usize {
        self.jobs.len() + self.ongoing
    }
}

/// Mutex-protected FIFO of jobs with pending/ongoing accounting
pub struct JobQueue {
    inner: Mutex<QueueState>,
    work_available: Condvar,
    idle: Condvar,
}

impl JobQueue {
    /// Create an empty queue in the accepting state
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                ongoing: 0,
                state: PoolState::Accepting,
                terminate: false,
            }),
            work_available: Condvar::new(),
            idle: Condvar::new(),
        }
    }

    /// Append a job and wake one waiting worker.
    ///
    /// Returns the number of pending jobs after the push.
    pub fn push(&self, job: BoxedJob) -> Result<usize, QueueError> {
        let depth = {
            let mut inner = self.inner.lock();
            if inner.state != PoolState::Accepting {
                return Err(QueueError::Closed { state: inner.state });
            }
            inner.jobs.push_back(job);
            inner.jobs.len()
        };

        self.work_available.notify_one();
        Ok(depth)
    }

    /// Block until a job is available or termination is signaled.
    ///
    /// Returns `None` when the calling worker should stop. The job moves from
    /// pending to ongoing in the same critical section that dequeues it.
    pub fn take(&self) -> Option<BoxedJob> {
        let mut inner = self.inner.lock();
        loop {
            if inner.terminate {
                return None;
            }
            if let Some(job) = inner.jobs.pop_front() {
                inner.ongoing += 1;
                return Some(job);
            }
            self.work_available.wait(&mut inner);
        }
    }

    /// Mark one ongoing job as finished, waking idle-waiters if nothing is left
    pub fn complete_one(&self) {
        let mut inner = self.inner.lock();
        debug_assert!(inner.ongoing > 0, "complete_one without an ongoing job");
        inner.ongoing = inner.ongoing.saturating_sub(1);
        if inner.total() == 0 {
            self.idle.notify_all();
        }
    }

    /// Discard every queued job that has not started yet.
    ///
    /// The discarded jobs are dropped without running, so their handles
    /// stay pending. Returns how many jobs were discarded.
    pub fn clear(&self) -> usize {
        let discarded: Vec<BoxedJob> = {
            let mut inner = self.inner.lock();
            let discarded = inner.jobs.drain(..).collect();
            if inner.total() == 0 {
                self.idle.notify_all();
            }
            discarded
        };
        // Jobs are dropped after the lock is released
        discarded.len()
    }

    /// Block until there are no pending and no ongoing jobs
    pub fn wait_for_idle(&self) {
        let mut inner = self.inner.lock();
        while inner.total() > 0 {
            self.idle.wait(&mut inner);
        }
    }

    /// Like [`wait_for_idle`](Self::wait_for_idle) with a deadline.
    ///
    /// Returns true if the queue became idle in time.
    pub fn wait_for_idle_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait_for_idle();
            return true;
        };
        let mut inner = self.inner.lock();
        while inner.total() > 0 {
            if self.idle.wait_until(&mut inner, deadline).timed_out() {
                return inner.total() == 0;
            }
        }
        true
    }

    /// Consistent view of pending, ongoing and state
    pub fn snapshot(&self) -> QueueSnapshot {
        let inner = self.inner.lock();
        QueueSnapshot {
            pending: inner.jobs.len(),
            ongoing: inner.ongoing,
            state: inner.state,
        }
    }

    /// Current pool state
    pub fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    /// Move the pool to a new state
    pub fn set_state(&self, state: PoolState) {
        self.inner.lock().state = state;
    }

    /// Tell every worker blocked in [`take`](Self::take) to stop
    pub fn signal_terminate(&self) {
        self.inner.lock().terminate = true;
        self.work_available.notify_all();
    }

    /// Clear the termination flag before a new set of workers starts
    pub fn reset_terminate(&self) {
        self.inner.lock().terminate = false;
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("JobQueue")
            .field("pending", &snapshot.pending)
            .field("ongoing", &snapshot.ongoing)
            .field("state", &snapshot.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClosureJob, Job, JobHandle};
    use std::sync::Arc;
    use std::thread;

    fn job_returning(value: usize) -> (BoxedJob, JobHandle<usize>) {
        let (job, handle) = ClosureJob::new(move || Ok(value));
        (Box::new(job), handle)
    }

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let (job, _handle) = job_returning(i);
            ids.push(job.job_id());
            queue.push(job).expect("push");
        }

        let taken: Vec<u64> = (0..5)
            .map(|_| queue.take().expect("job").job_id())
            .collect();
        assert_eq!(taken, ids);

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.pending, 0);
        assert_eq!(snapshot.ongoing, 5);
    }

    #[test]
    fn test_push_rejected_unless_accepting() {
        let queue = JobQueue::new();
        queue.set_state(PoolState::Draining);

        let (job, _handle) = job_returning(1);
        assert_eq!(
            queue.push(job),
            Err(QueueError::Closed {
                state: PoolState::Draining
            })
        );
        assert_eq!(queue.snapshot().pending, 0);
    }

    #[test]
    fn test_clear_discards_pending_only() {
        let queue = JobQueue::new();
        let mut handles = Vec::new();
        for i in 0..4 {
            let (job, handle) = job_returning(i);
            handles.push(handle);
            queue.push(job).expect("push");
        }
        let running = queue.take().expect("job");

        assert_eq!(queue.clear(), 3);
        let snapshot = queue.snapshot();
        assert_eq!(snapshot.pending, 0);
        assert_eq!(snapshot.ongoing, 1);
        assert!(handles[1..].iter().all(|h| !h.is_finished()));

        running.run();
        queue.complete_one();
        assert_eq!(handles[0].wait().expect("value"), 0);
        assert_eq!(queue.snapshot().total(), 0);
    }

    #[test]
    fn test_take_blocks_until_push() {
        let queue = Arc::new(JobQueue::new());
        let worker_queue = Arc::clone(&queue);

        let worker = thread::spawn(move || {
            let job = worker_queue.take().expect("job");
            job.run();
            worker_queue.complete_one();
        });

        thread::sleep(Duration::from_millis(20));
        let (job, handle) = job_returning(9);
        queue.push(job).expect("push");

        assert_eq!(handle.wait().expect("value"), 9);
        worker.join().expect("worker panicked");
        assert_eq!(queue.snapshot().total(), 0);
    }

    #[test]
    fn test_terminate_wakes_waiting_takers() {
        let queue = Arc::new(JobQueue::new());
        let takers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.take().is_none())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.signal_terminate();

        for taker in takers {
            assert!(taker.join().expect("taker panicked"));
        }

        queue.reset_terminate();
        let (job, _handle) = job_returning(1);
        queue.push(job).expect("push");
        assert!(queue.take().is_some());
    }

    #[test]
    fn test_wait_for_idle_wakes_on_last_completion() {
        let queue = Arc::new(JobQueue::new());
        for i in 0..2 {
            let (job, _handle) = job_returning(i);
            queue.push(job).expect("push");
        }
        assert!(!queue.wait_for_idle_timeout(Duration::from_millis(10)));

        let worker_queue = Arc::clone(&queue);
        let worker = thread::spawn(move || {
            while worker_queue.snapshot().pending > 0 {
                let job = worker_queue.take().expect("job");
                thread::sleep(Duration::from_millis(5));
                job.run();
                worker_queue.complete_one();
            }
        });

        queue.wait_for_idle();
        assert_eq!(queue.snapshot().total(), 0);
        worker.join().expect("worker panicked");
    }

    #[test]
    fn test_clear_wakes_idle_waiters() {
        let queue = Arc::new(JobQueue::new());
        let (job, _handle) = job_returning(1);
        queue.push(job).expect("push");

        let waiter_queue = Arc::clone(&queue);
        let waiter = thread::spawn(move || waiter_queue.wait_for_idle());

        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.clear(), 1);
        waiter.join().expect("waiter panicked");
    }

    #[test]
    fn test_wait_for_idle_with_unbounded_timeout() {
        let queue = Arc::new(JobQueue::new());
        let (job, handle) = job_returning(3);
        queue.push(job).expect("push");

        let worker_queue = Arc::clone(&queue);
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let job = worker_queue.take().expect("job");
            job.run();
            worker_queue.complete_one();
        });

        assert!(queue.wait_for_idle_timeout(Duration::MAX));
        assert_eq!(handle.wait().expect("value"), 3);
        worker.join().expect("worker panicked");
    }

    #[test]
    fn test_snapshot_serializes() {
        let queue = JobQueue::new();
        let json = serde_json::to_string(&queue.snapshot()).expect("serialize");
        assert_eq!(json, r#"{"pending":0,"ongoing":0,"state":"accepting"}"#);
    }
}
