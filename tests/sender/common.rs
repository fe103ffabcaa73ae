use flate2::read::GzDecoder;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue, any_value};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::metrics::v1::{
    Gauge, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, metric, number_data_point,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span, Status};
use rask_otlp_exporter::{BuildInfo, Config, ExportRequest, Exporter, Signal};
use std::io::Read;
use std::time::Duration;

pub fn string_attr(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.to_string())),
        }),
    }
}

pub fn int_attr(key: &str, value: i64) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::IntValue(value)),
        }),
    }
}

/// The single-span batch used by the wire stability fixture.
pub fn canary_traces() -> ExportTraceServiceRequest {
    let span = Span {
        trace_id: hex::decode("4303853f086f4f8c86cf198b6551df84").unwrap(),
        span_id: hex::decode("e5513c32795c41b9").unwrap(),
        start_time_unix_nano: 1_634_684_637_873_000_000,
        end_time_unix_nano: 1_634_684_637_873_000_000,
        attributes: vec![int_attr("span_index", 3), string_attr("code.function", "myFunction36")],
        status: Some(Status::default()),
        ..Default::default()
    };

    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: vec![
                    string_attr("service.name", "uop.stage-eu-1"),
                    string_attr("outsystems.module.version", "903386"),
                ],
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                scope: Some(InstrumentationScope {
                    name: "uop_canaries".to_string(),
                    version: "1".to_string(),
                    ..Default::default()
                }),
                spans: vec![span],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

pub fn gauge_metrics() -> ExportMetricsServiceRequest {
    let point = NumberDataPoint {
        time_unix_nano: 1_700_000_000_000_000_000,
        value: Some(number_data_point::Value::AsDouble(0.75)),
        ..Default::default()
    };
    ExportMetricsServiceRequest {
        resource_metrics: vec![ResourceMetrics {
            scope_metrics: vec![ScopeMetrics {
                metrics: vec![Metric {
                    name: "cpu.utilization".to_string(),
                    data: Some(metric::Data::Gauge(Gauge {
                        data_points: vec![point],
                    })),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

pub fn info_logs() -> ExportLogsServiceRequest {
    ExportLogsServiceRequest {
        resource_logs: vec![ResourceLogs {
            scope_logs: vec![ScopeLogs {
                log_records: vec![LogRecord {
                    time_unix_nano: 1_700_000_000_000_000_000,
                    severity_text: "INFO".to_string(),
                    body: Some(AnyValue {
                        value: Some(any_value::Value::StringValue("user logged in".to_string())),
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

pub fn sample_request(signal: Signal) -> ExportRequest {
    match signal {
        Signal::Traces => canary_traces().into(),
        Signal::Metrics => gauge_metrics().into(),
        Signal::Logs => info_logs().into(),
    }
}

/// Synchronous, no retry: every outcome is observed verbatim.
pub fn direct_config(endpoint: Option<&str>) -> Config {
    let mut config = Config {
        endpoint: endpoint.map(str::to_string),
        timeout: Duration::from_secs(5),
        ..Config::default()
    };
    config.queue.enabled = false;
    config.retry.enabled = false;
    config
}

pub fn exporter(config: Config) -> Exporter {
    Exporter::new(config, BuildInfo::new("Collector", "1.2.3test")).unwrap()
}

pub fn gunzip(bytes: &[u8]) -> Vec<u8> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    out
}
