use std::time::Duration;

use crate::error::{DispatchError, Result};

/// Categories used when none are configured.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "email",
    "deactivation",
    "activation",
    "transaction",
    "customer_renew",
    "order_processed",
];

const DEFAULT_WORKER_COUNT: usize = 10;
const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Shape of the generated job stream.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Closed set of category labels jobs are tagged with
    pub categories: Vec<String>,
    /// Shortest simulated processing time, inclusive
    pub min_duration_ms: u64,
    /// Longest simulated processing time, inclusive
    pub max_duration_ms: u64,
    /// Pause after each successful enqueue. Zero disables pacing.
    pub pacing_ms: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            min_duration_ms: 10,
            max_duration_ms: 109,
            pacing_ms: 5,
        }
    }
}

impl JobConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(DispatchError::InvalidConfig(
                "at least one job category is required".to_string(),
            ));
        }
        if self.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(DispatchError::InvalidConfig(
                "job categories must not be empty".to_string(),
            ));
        }
        if self.min_duration_ms > self.max_duration_ms {
            return Err(DispatchError::InvalidConfig(format!(
                "min duration {}ms exceeds max duration {}ms",
                self.min_duration_ms, self.max_duration_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of concurrent workers. Zero is accepted and starves the queue.
    pub worker_count: usize,
    /// Fixed number of slots in the work queue
    pub queue_capacity: usize,
    /// How long shutdown waits for tasks before aborting them
    pub shutdown_grace_ms: u64,
    pub jobs: JobConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_grace_ms: 5_000,
            jobs: JobConfig::default(),
        }
    }
}

impl DispatcherConfig {
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_jobs(mut self, jobs: JobConfig) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Check the configuration before any task is spawned.
    ///
    /// A worker count of zero is valid; it only means nothing drains the queue.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(DispatchError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        self.jobs.validate()
    }
}
