//! One-shot result channel between a job and its submitter
//!
//! [`channel`] creates a [`Promise`] (producer, moved into the job) and a
//! [`JobHandle`] (consumer, returned to the caller). Both share a single cell
//! that starts out pending and is written at most once.
//!
//! # Example
//!
//! ```rust
//! use worker_pool::core::promise;
//!
//! let (promise, handle) = promise::channel::<u32>(1);
//! std::thread::spawn(move || promise.resolve(42));
//!
//! assert_eq!(handle.wait().unwrap(), 42);
//! // Reading again returns the same outcome without blocking
//! assert_eq!(handle.wait().unwrap(), 42);
//! ```

use crate::core::error::{JobError, Result, ThreadError};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

enum Slot<T> {
    Pending,
    Value(T),
    Error(JobError),
    /// Outcome moved out by a consuming read
    Taken,
}

impl<T> Slot<T> {
    fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }

    fn peek(&self) -> Option<Result<T>>
    where
        T: Clone,
    {
        match self {
            Slot::Pending => None,
            Slot::Value(value) => Some(Ok(value.clone())),
            Slot::Error(err) => Some(Err(err.clone().into())),
            Slot::Taken => Some(Err(already_taken())),
        }
    }

    fn take(&mut self) -> Option<Result<T>> {
        match std::mem::replace(self, Slot::Taken) {
            Slot::Pending => {
                *self = Slot::Pending;
                None
            }
            Slot::Value(value) => Some(Ok(value)),
            Slot::Error(err) => Some(Err(err.into())),
            Slot::Taken => Some(Err(already_taken())),
        }
    }
}

fn already_taken() -> ThreadError {
    ThreadError::other("job result already taken")
}

struct CellState<T> {
    slot: Slot<T>,
    waker: Option<Waker>,
}

struct Cell<T> {
    state: Mutex<CellState<T>>,
    ready: Condvar,
}

/// Create a connected promise/handle pair for the job with the given id
pub fn channel<T>(job_id: u64) -> (Promise<T>, JobHandle<T>) {
    let cell = Arc::new(Cell {
        state: Mutex::new(CellState {
            slot: Slot::Pending,
            waker: None,
        }),
        ready: Condvar::new(),
    });

    (
        Promise {
            job_id,
            cell: Arc::clone(&cell),
        },
        JobHandle { job_id, cell },
    )
}

/// Producer side of a job's result channel.
///
/// Resolving consumes the promise. Dropping it unresolved leaves the
/// consumer pending forever, which is what happens to jobs discarded by
/// [`ThreadPool::clear_queue`](crate::pool::ThreadPool::clear_queue).
pub struct Promise<T> {
    job_id: u64,
    cell: Arc<Cell<T>>,
}

impl<T> Promise<T> {
    /// ID of the job this promise belongs to
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// Publish the job's value
    pub fn resolve(self, value: T) {
        self.complete(Slot::Value(value));
    }

    /// Publish the job's error
    pub fn fail(self, error: JobError) {
        self.complete(Slot::Error(error));
    }

    fn complete(self, outcome: Slot<T>) {
        let waker = {
            let mut state = self.cell.state.lock();
            if !state.slot.is_pending() {
                tracing::error!(
                    job_id = self.job_id,
                    "result channel written twice, keeping the first outcome"
                );
                debug_assert!(false, "result channel for job {} written twice", self.job_id);
                return;
            }
            state.slot = outcome;
            state.waker.take()
        };

        self.cell.ready.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("job_id", &self.job_id)
            .finish()
    }
}

/// Consumer side of a job's result channel.
///
/// Blocking reads ([`wait`](Self::wait), [`join`](Self::join)) park the
/// calling thread; async code can `.await` the handle directly.
pub struct JobHandle<T> {
    job_id: u64,
    cell: Arc<Cell<T>>,
}

impl<T> JobHandle<T> {
    /// ID of the job this handle belongs to
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// Returns true once the job has published a value or an error
    pub fn is_finished(&self) -> bool {
        !self.cell.state.lock().slot.is_pending()
    }

    /// Block until the job finishes and return its value or error.
    ///
    /// May be called any number of times; every call after completion
    /// returns the same outcome without blocking.
    ///
    /// A job discarded by `clear_queue` never finishes, so this call never
    /// returns for it. Use [`wait_timeout`](Self::wait_timeout) when that is
    /// possible.
    pub fn wait(&self) -> Result<T>
    where
        T: Clone,
    {
        let mut state = self.cell.state.lock();
        loop {
            if let Some(outcome) = state.slot.peek() {
                return outcome;
            }
            self.cell.ready.wait(&mut state);
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    ///
    /// Returns `None` if the job is still pending when the deadline passes.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>>
    where
        T: Clone,
    {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.wait());
        };
        let mut state = self.cell.state.lock();
        loop {
            if let Some(outcome) = state.slot.peek() {
                return Some(outcome);
            }
            if self.cell.ready.wait_until(&mut state, deadline).timed_out() {
                return state.slot.peek();
            }
        }
    }

    /// Non-blocking poll of the outcome
    pub fn try_get(&self) -> Option<Result<T>>
    where
        T: Clone,
    {
        self.cell.state.lock().slot.peek()
    }

    /// Block until the job finishes and move its outcome out of the channel
    pub fn join(self) -> Result<T> {
        let mut state = self.cell.state.lock();
        loop {
            if let Some(outcome) = state.slot.take() {
                return outcome;
            }
            self.cell.ready.wait(&mut state);
        }
    }
}

impl<T> Future for JobHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.cell.state.lock();
        match state.slot.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                match &state.waker {
                    Some(waker) if waker.will_wake(cx.waker()) => {}
                    _ => state.waker = Some(cx.waker().clone()),
                }
                Poll::Pending
            }
        }
    }
}

impl<T> fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("job_id", &self.job_id)
            .field("finished", &self.is_finished())
            .finish()
    }
}
