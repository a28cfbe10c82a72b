//! Fixed-size pool of workers draining the shared [`WorkQueue`].
//!
//! Every worker pulls from the same queue, so load spreads across whichever
//! workers are idle. There is no work stealing, priority or per-worker queue.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::TaskKind;
use crate::error::Result;
use crate::metrics::MetricsSink;
use crate::scheduler::WorkQueue;
use crate::worker::executor::JobExecutor;

pub struct WorkerPool {
    worker_count: usize,
    queue: WorkQueue,
    sink: Arc<dyn MetricsSink>,
    executor: JobExecutor,
}

impl WorkerPool {
    pub fn new(
        worker_count: usize,
        queue: WorkQueue,
        sink: Arc<dyn MetricsSink>,
        executor: JobExecutor,
    ) -> Self {
        Self {
            worker_count,
            queue,
            sink,
            executor,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Start every worker at once inside `tasks`.
    ///
    /// With a worker count of zero nothing is spawned and the queue is never
    /// drained.
    pub fn spawn(&self, tasks: &mut JoinSet<(TaskKind, Result<()>)>, shutdown: &CancellationToken) {
        tracing::info!(workers = self.worker_count, "Starting workers");
        if self.worker_count == 0 {
            tracing::warn!("No workers configured, jobs will accumulate until the queue is full");
        }

        for worker_id in 0..self.worker_count {
            let queue = self.queue.clone();
            let sink = self.sink.clone();
            let executor = self.executor.clone();
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                let res = run_worker(worker_id, queue, sink, executor, shutdown).await;
                (TaskKind::Worker(worker_id), res)
            });
        }
    }
}

/// Worker loop: take one job, process it, report it, repeat.
///
/// Waiting on an empty queue is abandoned as soon as shutdown is signalled.
/// A job already taken is always finished and reported, so the counters stay
/// consistent with what left the queue.
pub async fn run_worker(
    worker_id: usize,
    queue: WorkQueue,
    sink: Arc<dyn MetricsSink>,
    executor: JobExecutor,
    shutdown: CancellationToken,
) -> Result<()> {
    tracing::debug!(worker_id, "Worker started");

    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            job = queue.dequeue() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let result = executor.execute(worker_id, &job).await;

        sink.increment_processed(result.worker_id, &result.category);
        sink.add_in_flight(&result.category, -1);
    }

    tracing::debug!(worker_id, "Worker stopped");
    Ok(())
}
