use super::otlp::CONTENT_TYPE_PROTOBUF;
use bytes::Bytes;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// A failure to complete the exchange at all: connection refused, DNS,
/// timeout. Distinct from a received non-2xx response.
#[derive(Error, Debug)]
#[error("failed to make an HTTP request: {source}")]
pub struct TransportError {
    #[from]
    source: reqwest::Error,
}

impl TransportError {
    /// The per-attempt timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        self.source.is_timeout()
    }

    pub fn is_connect(&self) -> bool {
        self.source.is_connect()
    }
}

/// Name and version of the running build, used for the default `User-Agent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub description: String,
    pub version: String,
}

impl BuildInfo {
    pub fn new(description: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            version: version.into(),
        }
    }

    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} ({}/{})",
            self.description,
            self.version,
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Extra headers sent with every request. A `User-Agent` entry, in any
    /// case, replaces the synthesized default.
    pub headers: HashMap<String, String>,
    /// Upper bound for one request/response exchange.
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub max_idle_connections: usize,
    pub keep_alive_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            max_idle_connections: 20,
            keep_alive_timeout: Duration::from_secs(60),
        }
    }
}

/// Raw result of a completed exchange, before classification.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: Duration,
}

#[derive(Debug)]
pub struct ClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            total_response_time: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self, success: bool, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ConnectionStats {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            total_requests,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            average_response_time,
        }
    }
}

/// Pooled HTTP client performing the OTLP request/response exchange.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    stats: Arc<ClientStats>,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, build_info: &BuildInfo) -> Result<Self, ClientError> {
        let headers = build_default_headers(&config.headers, build_info)?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.max_idle_connections)
            .pool_idle_timeout(config.keep_alive_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            timeout: config.timeout,
            stats: Arc::new(ClientStats::new()),
        })
    }

    /// POSTs one encoded body and reads the full response.
    pub async fn post(
        &self,
        url: &Url,
        body: Vec<u8>,
        content_encoding: Option<&'static str>,
    ) -> Result<TransportResponse, TransportError> {
        let start = Instant::now();

        let mut request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_PROTOBUF)
            .timeout(self.timeout)
            .body(body);

        if let Some(encoding) = content_encoding {
            request = request.header(CONTENT_ENCODING, encoding);
        }

        let result = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            // Drain the body so the pooled connection can be reused.
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(TransportResponse {
                status,
                headers,
                body,
            })
        }
        .await;

        let elapsed = start.elapsed();
        let success = matches!(&result, Ok(response) if response.is_success());
        self.stats.record_request(success, elapsed);
        trace!(url = %url, success, elapsed_ms = elapsed.as_millis() as u64, "Exchange finished");

        result.map_err(TransportError::from)
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }
}

/// Default `User-Agent` first, then configured headers on top so an
/// explicit user agent wins regardless of its case.
fn build_default_headers(
    configured: &HashMap<String, String>,
    build_info: &BuildInfo,
) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();

    let user_agent = build_info.user_agent();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent).map_err(|e| ClientError::InvalidHeader {
            name: USER_AGENT.to_string(),
            reason: e.to_string(),
        })?,
    );

    for (name, value) in configured {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
