use super::config::{Config, ConfigError};
use crate::buffer::{Deliver, QueueStats, SendQueue};
use crate::domain::{ExportError, ExportRequest};
use crate::reliability::RetryController;
use crate::sender::{BuildInfo, ConnectionStats, HttpClient, OtlpSender, ResponseClassifier};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// One send attempt per retry step, repeated by the controller.
struct Pipeline {
    sender: OtlpSender,
    retry: RetryController,
}

impl Deliver for Pipeline {
    async fn deliver(
        &self,
        request: &ExportRequest,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        self.retry
            .run(request_id, cancel, || self.sender.send(request))
            .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExporterStats {
    pub transport: ConnectionStats,
    pub queue: QueueStats,
    pub retries: u64,
}

/// Entry point for upstream pipeline stages. Holds one transport, one retry
/// controller and, when queueing is enabled, the worker pool.
pub struct Exporter {
    pipeline: Arc<Pipeline>,
    queue: Option<SendQueue>,
    shutdown_timeout: Duration,
    shut_down: AtomicBool,
}

impl Exporter {
    /// Validates `config` and resolves every endpoint up front. Must be
    /// called inside a Tokio runtime when queueing is enabled.
    pub fn new(config: Config, build_info: BuildInfo) -> Result<Self, ConfigError> {
        config.validate()?;

        let endpoints = config.endpoints()?;
        let client = HttpClient::new(&config.client_config(), &build_info)?;
        let classifier =
            ResponseClassifier::new(config.client_errors, config.retry.default_throttle_delay);
        let sender = OtlpSender::new(client, endpoints, config.compression, classifier);

        for signal in &config.signals {
            if let Some(url) = sender.endpoint(*signal) {
                info!(signal = %signal, url = %url, "Export endpoint resolved");
            }
        }

        let pipeline = Arc::new(Pipeline {
            sender,
            retry: RetryController::new(config.retry.clone()),
        });

        let queue = config
            .queue
            .enabled
            .then(|| SendQueue::start(&config.queue, Arc::clone(&pipeline)));

        Ok(Self {
            pipeline,
            queue,
            shutdown_timeout: config.queue.shutdown_timeout,
            shut_down: AtomicBool::new(false),
        })
    }

    pub async fn consume_traces(&self, request: ExportTraceServiceRequest) -> Result<(), ExportError> {
        self.consume(request.into()).await
    }

    pub async fn consume_metrics(
        &self,
        request: ExportMetricsServiceRequest,
    ) -> Result<(), ExportError> {
        self.consume(request.into()).await
    }

    pub async fn consume_logs(&self, request: ExportLogsServiceRequest) -> Result<(), ExportError> {
        self.consume(request.into()).await
    }

    pub async fn consume(&self, request: ExportRequest) -> Result<(), ExportError> {
        self.consume_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// `cancel` aborts only this request: its in-flight attempt and any
    /// pending backoff sleep.
    pub async fn consume_with_cancel(
        &self,
        request: ExportRequest,
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(ExportError::Shutdown);
        }

        match &self.queue {
            Some(queue) => queue.submit(request, cancel).await,
            None => {
                let request_id = Uuid::new_v4().to_string();
                self.pipeline.deliver(&request, &request_id, cancel).await
            }
        }
    }

    /// Stops accepting requests and drains the queue for the configured
    /// grace period. A second call is a no-op.
    pub async fn shutdown(&self) -> Result<(), ExportError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("Exporter already shut down");
            return Ok(());
        }

        if let Some(queue) = &self.queue {
            let abandoned = queue.shutdown(self.shutdown_timeout).await;
            info!(abandoned, "Exporter shut down");
        } else {
            info!("Exporter shut down");
        }
        Ok(())
    }

    pub fn stats(&self) -> ExporterStats {
        ExporterStats {
            transport: self.pipeline.sender.connection_stats(),
            queue: self.queue.as_ref().map(SendQueue::stats).unwrap_or_default(),
            retries: self.pipeline.retry.retries(),
        }
    }
}
