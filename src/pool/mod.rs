//! Thread pool and worker implementations

pub mod thread_pool;
pub mod worker;

pub use thread_pool::{ThreadPool, ThreadPoolConfig};
pub use worker::{Worker, WorkerStatSnapshot, WorkerStats};
