//! Job consumption for the dispatcher.
//!
//! - [`JobExecutor`]: performs the simulated work for one job
//! - [`WorkerPool`]: spawns the fixed set of workers
//! - [`run_worker`]: the per-worker loop (dequeue, execute, report)
//!
//! Each worker processes one job at a time to completion and then reports it
//! to the metrics sink: the processed counter goes up for its
//! `(worker_id, category)` and the in-flight gauge for the category goes down.

pub mod executor;
pub mod pool;

pub use executor::{ExecutionResult, JobExecutor};
pub use pool::{run_worker, WorkerPool};
