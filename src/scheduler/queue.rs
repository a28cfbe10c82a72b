use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::error::{DispatchError, Result};
use crate::scheduler::job::Job;

/// Shared, bounded FIFO buffer between the producer and the workers.
///
/// This is the only backpressure mechanism in the dispatcher: `enqueue` waits
/// while the queue is full and `dequeue` waits while it is empty. Nothing is
/// ever rejected or dropped.
///
/// Handles are cheap to clone. The queue keeps its own sender, so the channel
/// stays open for as long as any handle exists.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: mpsc::Sender<Job>,
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl WorkQueue {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DispatchError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        let (tx, rx) = mpsc::channel(capacity);
        Ok(Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        })
    }

    /// Push a job, waiting for a free slot if the queue is full.
    ///
    /// Cancel safe: if the future is dropped before completing, the job was
    /// not enqueued.
    pub async fn enqueue(&self, job: Job) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| DispatchError::QueueClosed)
    }

    /// Remove the oldest job, waiting until one is available.
    ///
    /// Consumers are served in the order they started waiting. Cancel safe:
    /// dropping the future never loses a job.
    pub async fn dequeue(&self) -> Option<Job> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Number of jobs currently buffered
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_full(&self) -> bool {
        self.tx.capacity() == 0
    }
}
