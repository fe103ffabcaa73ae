use crate::app::config::QueueConfig;
use crate::domain::{ExportError, ExportRequest};
use futures::future::join_all;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Drives one request to its terminal outcome. Implemented by the export
/// pipeline; tests substitute scripted collaborators.
pub trait Deliver: Send + Sync + 'static {
    fn deliver(
        &self,
        request: &ExportRequest,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), ExportError>> + Send;
}

struct QueueItem {
    id: String,
    request: ExportRequest,
    cancel: CancellationToken,
    completion: Option<oneshot::Sender<Result<(), ExportError>>>,
}

impl QueueItem {
    fn complete(self, result: Result<(), ExportError>, stats: &QueueStatsInner) {
        match &result {
            Ok(()) => {
                stats.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                stats.dropped.fetch_add(1, Ordering::Relaxed);
                if self.completion.is_none() {
                    error!(
                        request_id = %self.id,
                        signal = %self.request.signal(),
                        dropped_items = self.request.item_count(),
                        error = %err,
                        "Exporting failed. Dropping data."
                    );
                }
            }
        }

        if let Some(completion) = self.completion {
            // The producer may have stopped waiting.
            let _ = completion.send(result);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub enqueued: u64,
    /// Refused because the queue was full.
    pub rejected: u64,
    pub completed: u64,
    /// Reached a terminal failure, including cancellation at shutdown.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct QueueStatsInner {
    enqueued: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    dropped: AtomicU64,
}

impl QueueStatsInner {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Fixed-capacity queue drained by a fixed pool of workers.
///
/// Enqueue never blocks: a full queue yields [`ExportError::QueueFull`].
/// Each item is handed to exactly one worker.
pub struct SendQueue {
    sender: Mutex<Option<mpsc::Sender<QueueItem>>>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<QueueItem>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    abort: CancellationToken,
    stats: Arc<QueueStatsInner>,
    capacity: usize,
    wait_for_result: bool,
}

impl SendQueue {
    /// Spawns `num_consumers` workers on the current Tokio runtime.
    pub fn start<D: Deliver>(config: &QueueConfig, deliverer: Arc<D>) -> Self {
        let capacity = config.queue_size.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let abort = CancellationToken::new();
        let stats = Arc::new(QueueStatsInner::default());

        let workers = (0..config.num_consumers.max(1))
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&receiver),
                    Arc::clone(&deliverer),
                    Arc::clone(&stats),
                    abort.clone(),
                ))
            })
            .collect();

        debug!(
            capacity,
            workers = config.num_consumers,
            wait_for_result = config.wait_for_result,
            "Send queue started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            workers: Mutex::new(workers),
            abort,
            stats,
            capacity,
            wait_for_result: config.wait_for_result,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items waiting for a worker.
    pub fn len(&self) -> usize {
        self.sender
            .lock()
            .as_ref()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn stats(&self) -> QueueStats {
        self.stats.snapshot()
    }

    /// Enqueues `request`. In wait mode the call resolves with the terminal
    /// outcome; `cancel` aborts only this request.
    pub async fn submit(
        &self,
        request: ExportRequest,
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let (completion, outcome) = if self.wait_for_result {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let item = QueueItem {
            id: Uuid::new_v4().to_string(),
            request,
            cancel: cancel.child_token(),
            completion,
        };
        let item_cancel = item.cancel.clone();

        self.enqueue(item)?;

        let Some(outcome) = outcome else {
            return Ok(());
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                item_cancel.cancel();
                Err(ExportError::Cancelled)
            }
            result = outcome => result.unwrap_or(Err(ExportError::Cancelled)),
        }
    }

    fn enqueue(&self, item: QueueItem) -> Result<(), ExportError> {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(ExportError::Shutdown);
        };

        match sender.try_send(item) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(item)) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    request_id = %item.id,
                    capacity = self.capacity,
                    "Sending queue is full, rejecting request"
                );
                Err(ExportError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(ExportError::Shutdown),
        }
    }

    /// Closes the queue and drains it for up to `grace`. Whatever is still
    /// queued or in flight afterwards completes with `Cancelled`. Returns the
    /// number of abandoned items; a repeated call returns 0.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let Some(sender) = self.sender.lock().take() else {
            debug!("Send queue already shut down");
            return 0;
        };
        drop(sender);

        let mut workers = std::mem::take(&mut *self.workers.lock());
        info!(workers = workers.len(), grace_ms = grace.as_millis() as u64, "Draining send queue");

        let drained = tokio::time::timeout(grace, join_all(workers.iter_mut())).await;
        let dropped_before = self.stats.dropped.load(Ordering::Relaxed);

        if drained.is_err() {
            warn!("Grace period expired, cancelling in-flight exports");
            self.abort.cancel();
            workers.retain(|handle| !handle.is_finished());
            join_all(workers.iter_mut()).await;
        }

        let mut abandoned = (self.stats.dropped.load(Ordering::Relaxed) - dropped_before) as usize;
        let mut receiver = self.receiver.lock().await;
        while let Ok(item) = receiver.try_recv() {
            item.complete(Err(ExportError::Cancelled), &self.stats);
            abandoned += 1;
        }

        if abandoned > 0 {
            warn!(abandoned, "Send queue shut down with unfinished exports");
        } else {
            info!("Send queue drained");
        }
        abandoned
    }
}

impl Drop for SendQueue {
    fn drop(&mut self) {
        self.abort.cancel();
    }
}

async fn worker_loop<D: Deliver>(
    worker_id: usize,
    receiver: Arc<AsyncMutex<mpsc::Receiver<QueueItem>>>,
    deliverer: Arc<D>,
    stats: Arc<QueueStatsInner>,
    abort: CancellationToken,
) {
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                _ = abort.cancelled() => None,
                item = receiver.recv() => item,
            }
        };
        let Some(item) = next else {
            break;
        };

        let result = tokio::select! {
            biased;
            _ = abort.cancelled() => Err(ExportError::Cancelled),
            result = deliverer.deliver(&item.request, &item.id, &item.cancel) => result,
        };
        item.complete(result, &stats);
    }
    debug!(worker_id, "Send queue worker stopped");
}
