//! OTLP (OpenTelemetry Protocol) wire codec.
//!
//! Requests are the protobuf encoding of the collector service request for
//! the batch's signal. Failure responses may carry a `google.rpc.Status`
//! envelope, which is decoded on a best-effort basis only to build a
//! readable error message.

use crate::domain::{ExportRequest, Signal};

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;

use prost::Message;
use thiserror::Error;

/// Content type of every OTLP/HTTP protobuf request.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode {signal} request: {source}")]
    Decode {
        signal: Signal,
        #[source]
        source: prost::DecodeError,
    },
}

/// `google.rpc.Status`, the generic error envelope of OTLP responses.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Status {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<prost_types::Any>,
}

impl Status {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Renders the details list as `[a; b]`, or `[]` when empty.
    pub fn render_details(&self) -> String {
        let rendered: Vec<&str> = self
            .details
            .iter()
            .map(|detail| detail.type_url.as_str())
            .collect();
        format!("[{}]", rendered.join("; "))
    }
}

/// Serializes a batch into the request body. Total over well-formed batches.
pub fn encode(request: &ExportRequest) -> Vec<u8> {
    match request {
        ExportRequest::Traces(req) => req.encode_to_vec(),
        ExportRequest::Metrics(req) => req.encode_to_vec(),
        ExportRequest::Logs(req) => req.encode_to_vec(),
    }
}

/// Parses a request body back into a batch of the given signal.
pub fn decode(signal: Signal, bytes: &[u8]) -> Result<ExportRequest, CodecError> {
    let map_err = |source| CodecError::Decode { signal, source };
    let request = match signal {
        Signal::Traces => ExportTraceServiceRequest::decode(bytes)
            .map(ExportRequest::Traces)
            .map_err(map_err)?,
        Signal::Metrics => ExportMetricsServiceRequest::decode(bytes)
            .map(ExportRequest::Metrics)
            .map_err(map_err)?,
        Signal::Logs => ExportLogsServiceRequest::decode(bytes)
            .map(ExportRequest::Logs)
            .map_err(map_err)?,
    };
    Ok(request)
}

/// Decodes a response body as a status envelope.
///
/// Returns `None` for an empty body or bytes that are not a valid envelope;
/// classification must never fail because of a malformed response.
pub fn decode_status(body: &[u8]) -> Option<Status> {
    if body.is_empty() {
        return None;
    }
    Status::decode(body).ok()
}
