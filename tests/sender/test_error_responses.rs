use crate::common::{direct_config, exporter, sample_request};
use prost::Message;
use rask_otlp_exporter::sender::otlp::Status;
use rask_otlp_exporter::{ClassifiedError, ExportError, Signal};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const INVALID_ARGUMENT: i32 = 3;

enum Expected {
    Permanent,
    Retryable,
    Throttled(Duration),
}

struct Case {
    status: u16,
    envelope: Option<&'static str>,
    retry_after: Option<&'static str>,
    expected: Expected,
    suffix: &'static str,
}

async fn run_case(signal: Signal, case: &Case) {
    let server = MockServer::start().await;
    let mut response = ResponseTemplate::new(case.status);
    if let Some(message) = case.envelope {
        response = response.set_body_bytes(Status::new(INVALID_ARGUMENT, message).encode_to_vec());
    }
    if let Some(retry_after) = case.retry_after {
        response = response.insert_header("Retry-After", retry_after);
    }
    Mock::given(method("POST"))
        .respond_with(response)
        .mount(&server)
        .await;

    let exporter = exporter(direct_config(Some(&server.uri())));
    let err = exporter.consume(sample_request(signal)).await.unwrap_err();

    let ExportError::Rejected(classified) = &err else {
        panic!("expected a verbatim classification, got {err:?}");
    };
    let expected_message = format!(
        "error exporting items, request to {}/{} responded with HTTP Status Code {}{}",
        server.uri(),
        signal.path(),
        case.status,
        case.suffix
    );
    assert_eq!(classified.message(), expected_message);

    match case.expected {
        Expected::Permanent => assert!(err.is_permanent(), "{}: {err:?}", case.status),
        Expected::Retryable => assert!(
            matches!(classified, ClassifiedError::Retryable { .. }),
            "{}: {err:?}",
            case.status
        ),
        Expected::Throttled(delay) => {
            assert_eq!(classified.throttle_delay(), Some(delay), "{}", case.status);
        }
    }

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_error_response_table() {
    let cases = [
        Case {
            status: 400,
            envelope: Some("Bad field"),
            retry_after: None,
            expected: Expected::Permanent,
            suffix: ", Message=Bad field, Details=[]",
        },
        Case {
            status: 404,
            envelope: None,
            retry_after: None,
            expected: Expected::Retryable,
            suffix: "",
        },
        Case {
            status: 429,
            envelope: Some("Quota exceeded"),
            retry_after: None,
            expected: Expected::Throttled(Duration::ZERO),
            suffix: ", Message=Quota exceeded, Details=[]",
        },
        Case {
            status: 503,
            envelope: Some("Server overloaded"),
            retry_after: Some("30"),
            expected: Expected::Throttled(Duration::from_secs(30)),
            suffix: ", Message=Server overloaded, Details=[]",
        },
        Case {
            status: 500,
            envelope: None,
            retry_after: None,
            expected: Expected::Retryable,
            suffix: "",
        },
    ];

    for signal in Signal::ALL {
        for case in &cases {
            run_case(signal, case).await;
        }
    }
}

#[tokio::test]
async fn test_success_ignores_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0x00, 0x13]))
        .mount(&server)
        .await;

    let exporter = exporter(direct_config(Some(&server.uri())));
    for signal in Signal::ALL {
        exporter.consume(sample_request(signal)).await.unwrap();
    }
}

#[tokio::test]
async fn test_undecodable_error_body_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let exporter = exporter(direct_config(Some(&server.uri())));
    let err = exporter.consume(sample_request(Signal::Logs)).await.unwrap_err();
    assert!(err.to_string().ends_with("responded with HTTP Status Code 502"));
}
