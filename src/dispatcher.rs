use std::fmt;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, Result};
use crate::metrics::MetricsSink;
use crate::scheduler::{produce, JobSource, WorkQueue};
use crate::worker::{JobExecutor, WorkerPool};

/// Identity of a supervised task, used when reporting how it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Producer,
    Worker(usize),
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Producer => write!(f, "producer"),
            TaskKind::Worker(id) => write!(f, "worker {}", id),
        }
    }
}

/// Owns the work queue and runs the producer and the worker pool as
/// supervised tasks.
pub struct Dispatcher {
    config: DispatcherConfig,
    queue: WorkQueue,
    sink: Arc<dyn MetricsSink>,
    executor: JobExecutor,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig, sink: Arc<dyn MetricsSink>) -> Result<Self> {
        config.validate()?;
        let queue = WorkQueue::with_capacity(config.queue_capacity)?;

        Ok(Self {
            config,
            queue,
            sink,
            executor: JobExecutor::new(),
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Handle to the shared queue, for observers such as the metrics endpoint
    pub fn queue(&self) -> WorkQueue {
        self.queue.clone()
    }

    /// Run the producer and the workers until shutdown.
    ///
    /// Lifecycle of the supervised tasks:
    ///
    /// - Cancelling `shutdown` stops the producer and lets each worker finish
    ///   the job it holds. Tasks still running after the grace period are
    ///   aborted.
    /// - The producer returning `Ok` means its source is exhausted. Workers
    ///   keep draining the queue.
    /// - Any worker exiting on its own, any task error and any panic are
    ///   fatal. The remaining tasks are shut down and the error is returned.
    ///
    /// Returns `Ok` after a requested shutdown, or once every task has
    /// finished on its own.
    pub async fn run<S: JobSource>(self, source: S, shutdown: CancellationToken) -> Result<()> {
        // Child token so a fatal task error can stop our tasks without
        // cancelling the caller's token.
        let shutdown = shutdown.child_token();
        let mut tasks: JoinSet<(TaskKind, Result<()>)> = JoinSet::new();

        tracing::info!(
            workers = self.config.worker_count,
            queue_capacity = self.queue.capacity(),
            pacing_ms = self.config.jobs.pacing_ms,
            "Starting dispatcher"
        );

        {
            let queue = self.queue.clone();
            let sink = self.sink.clone();
            let pacing = self.config.jobs.pacing();
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                let res = produce(source, queue, sink, pacing, shutdown).await;
                (TaskKind::Producer, res)
            });
        }

        let pool = WorkerPool::new(
            self.config.worker_count,
            self.queue.clone(),
            self.sink.clone(),
            self.executor.clone(),
        );
        pool.spawn(&mut tasks, &shutdown);

        let mut failure: Option<DispatchError> = None;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                joined = tasks.join_next() => match joined {
                    None => {
                        tracing::info!("All dispatcher tasks finished");
                        return Ok(());
                    }
                    Some(Ok((TaskKind::Producer, Ok(())))) => {
                        tracing::info!(queued = self.queue.len(), "Producer finished");
                    }
                    // Workers return as soon as they see the token, which can
                    // be observed here before the cancellation arm.
                    Some(Ok((_, Ok(())))) if shutdown.is_cancelled() => break,
                    Some(Ok((kind, Ok(())))) => {
                        tracing::error!(task = %kind, "Task exited unexpectedly");
                        failure = Some(DispatchError::TaskExited(kind.to_string()));
                        break;
                    }
                    Some(Ok((kind, Err(e)))) => {
                        tracing::error!(task = %kind, error = %e, "Task failed");
                        failure = Some(e);
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Task panicked");
                        failure = Some(DispatchError::TaskPanicked(e.to_string()));
                        break;
                    }
                },
            }
        }

        shutdown.cancel();
        self.drain(&mut tasks).await;

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Wait for tasks to stop after shutdown, aborting stragglers.
    async fn drain(&self, tasks: &mut JoinSet<(TaskKind, Result<()>)>) {
        let grace = self.config.shutdown_grace();
        tracing::info!(
            running = tasks.len(),
            grace_ms = self.config.shutdown_grace_ms,
            "Draining dispatcher tasks"
        );

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((kind, Err(e))) => {
                        tracing::warn!(task = %kind, error = %e, "Task failed during shutdown");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Task panicked during shutdown");
                    }
                    Ok((_, Ok(()))) => {}
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = tasks.len(),
                "Shutdown grace period elapsed, aborting tasks"
            );
            tasks.shutdown().await;
        }

        tracing::info!(queued = self.queue.len(), "Dispatcher stopped");
    }
}
