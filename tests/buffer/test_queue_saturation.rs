use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use rask_otlp_exporter::app::QueueConfig;
use rask_otlp_exporter::buffer::{Deliver, SendQueue};
use rask_otlp_exporter::{ExportError, ExportRequest};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Holds every delivery until released.
#[derive(Default)]
struct Gate {
    started: AtomicUsize,
    finished: AtomicUsize,
    release: Notify,
}

impl Deliver for Gate {
    async fn deliver(
        &self,
        _request: &ExportRequest,
        _request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = cancel.cancelled() => return Err(ExportError::Cancelled),
            _ = self.release.notified() => {}
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn request() -> ExportRequest {
    ExportLogsServiceRequest::default().into()
}

fn queue_config(num_consumers: usize, queue_size: usize) -> QueueConfig {
    QueueConfig {
        enabled: true,
        num_consumers,
        queue_size,
        wait_for_result: false,
        shutdown_timeout: Duration::from_secs(1),
    }
}

async fn wait_for_started(gate: &Gate, expected: usize) {
    while gate.started.load(Ordering::SeqCst) < expected {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_saturation_fails_fast_without_delivering() {
    let gate = Arc::new(Gate::default());
    let queue = SendQueue::start(&queue_config(2, 3), Arc::clone(&gate));
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        queue.submit(request(), &cancel).await.unwrap();
    }
    wait_for_started(&gate, 2).await;
    for _ in 0..3 {
        queue.submit(request(), &cancel).await.unwrap();
    }
    assert_eq!(queue.len(), 3);

    let started = Instant::now();
    let result = queue.submit(request(), &cancel).await;
    assert_eq!(result, Err(ExportError::QueueFull));
    assert!(started.elapsed() < Duration::from_millis(100));

    let stats = queue.stats();
    assert_eq!(stats.enqueued, 5);
    assert_eq!(stats.rejected, 1);
    assert_eq!(gate.started.load(Ordering::SeqCst), 2);

    queue.shutdown(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_each_item_delivered_once() {
    let gate = Arc::new(Gate::default());
    let queue = Arc::new(SendQueue::start(&queue_config(4, 64), Arc::clone(&gate)));

    let producers: Vec<_> = (0..8)
        .map(|_| {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for _ in 0..5 {
                    queue.submit(request(), &CancellationToken::new()).await.unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    while gate.finished.load(Ordering::SeqCst) < 40 {
        gate.release.notify_waiters();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert_eq!(queue.shutdown(Duration::from_secs(1)).await, 0);
    assert_eq!(gate.started.load(Ordering::SeqCst), 40);
    assert_eq!(queue.stats().completed, 40);
}

#[tokio::test]
async fn test_shutdown_reports_abandoned_items_as_cancelled() {
    let gate = Arc::new(Gate::default());
    let config = QueueConfig {
        wait_for_result: true,
        ..queue_config(1, 4)
    };
    let queue = Arc::new(SendQueue::start(&config, Arc::clone(&gate)));

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.submit(request(), &CancellationToken::new()).await })
        })
        .collect();
    wait_for_started(&gate, 1).await;
    while queue.stats().enqueued < 3 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let abandoned = queue.shutdown(Duration::from_millis(100)).await;
    assert_eq!(abandoned, 3);
    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), Err(ExportError::Cancelled));
    }
    assert_eq!(queue.shutdown(Duration::from_millis(100)).await, 0);
    assert_eq!(queue.submit(request(), &CancellationToken::new()).await, Err(ExportError::Shutdown));
}
