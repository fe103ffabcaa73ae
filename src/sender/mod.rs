pub mod client;
pub mod compression;
pub mod endpoint;
pub mod otlp;
pub mod response;

pub use client::{
    BuildInfo, ClientConfig, ClientError, ConnectionStats, HttpClient, TransportError,
    TransportResponse,
};
pub use compression::Compression;
pub use endpoint::{EndpointError, Endpoints};
pub use response::{ClientErrorPolicy, ResponseClassifier};

use crate::domain::{ClassifiedError, ExportRequest};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Performs exactly one delivery attempt: encode, compress, post, classify.
#[derive(Debug, Clone)]
pub struct OtlpSender {
    client: HttpClient,
    endpoints: Arc<Endpoints>,
    compression: Compression,
    classifier: ResponseClassifier,
}

impl OtlpSender {
    pub fn new(
        client: HttpClient,
        endpoints: Endpoints,
        compression: Compression,
        classifier: ResponseClassifier,
    ) -> Self {
        Self {
            client,
            endpoints: Arc::new(endpoints),
            compression,
            classifier,
        }
    }

    pub fn endpoint(&self, signal: crate::domain::Signal) -> Option<&Url> {
        self.endpoints.get(signal)
    }

    pub async fn send(&self, request: &ExportRequest) -> Result<(), ClassifiedError> {
        let signal = request.signal();
        let Some(url) = self.endpoints.get(signal) else {
            return Err(ClassifiedError::permanent(format!(
                "no endpoint configured for {signal}"
            )));
        };

        let payload = otlp::encode(request);
        let encoded_len = payload.len();
        let body = self.compression.compress(payload).map_err(|e| {
            ClassifiedError::permanent(format!("failed to compress {signal} request: {e}"))
        })?;

        debug!(
            signal = %signal,
            url = %url,
            items = request.item_count(),
            encoded_bytes = encoded_len,
            body_bytes = body.len(),
            "Sending export request"
        );

        match self
            .client
            .post(url, body, self.compression.content_encoding())
            .await
        {
            Ok(response) => self.classifier.classify(url, &response),
            Err(err) => {
                debug!(
                    signal = %signal,
                    url = %url,
                    timeout = err.is_timeout(),
                    connect = err.is_connect(),
                    "Export request did not complete"
                );
                Err(self.classifier.classify_transport_error(&err))
            }
        }
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        self.client.connection_stats()
    }
}
