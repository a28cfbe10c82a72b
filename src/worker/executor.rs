use std::time::Duration;

use tokio::time::Instant;

use crate::scheduler::Job;

/// Result of processing one job.
///
/// There is no failure variant: simulated work always completes. Swapping in
/// real work means adding an explicit failure policy here first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub worker_id: usize,
    pub category: String,
    pub elapsed: Duration,
}

/// Performs the simulated work for a job.
///
/// Processing is a timed suspension for the job's duration. It yields the
/// runtime for the whole wait, so other workers keep running.
#[derive(Debug, Clone, Default)]
pub struct JobExecutor;

impl JobExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Process a job to completion. Not interrupted by shutdown.
    pub async fn execute(&self, worker_id: usize, job: &Job) -> ExecutionResult {
        let start = Instant::now();

        tokio::time::sleep(job.duration()).await;

        let elapsed = start.elapsed();
        tracing::debug!(
            worker_id,
            category = job.category(),
            elapsed_secs = elapsed.as_secs_f64(),
            "Processed job"
        );

        ExecutionResult {
            worker_id,
            category: job.category().to_string(),
            elapsed,
        }
    }
}
