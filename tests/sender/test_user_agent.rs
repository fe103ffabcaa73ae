use crate::common::{direct_config, exporter, sample_request};
use rask_otlp_exporter::Signal;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn received_user_agents(headers: &[(&str, &str)]) -> Vec<String> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = direct_config(Some(&server.uri()));
    for (name, value) in headers {
        config.headers.insert(name.to_string(), value.to_string());
    }
    let exporter = exporter(config);
    for signal in Signal::ALL {
        exporter.consume(sample_request(signal)).await.unwrap();
    }

    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| {
            let values: Vec<_> = request.headers.get_all("user-agent").iter().collect();
            assert_eq!(values.len(), 1);
            values[0].to_str().unwrap().to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_default_user_agent_names_build() {
    let agents = received_user_agents(&[]).await;
    assert_eq!(agents.len(), 3);
    for agent in agents {
        assert!(agent.contains("Collector/1.2.3test"), "{agent}");
    }
}

#[tokio::test]
async fn test_configured_user_agent_replaces_default() {
    for key in ["User-Agent", "user-agent", "USER-AGENT"] {
        let agents = received_user_agents(&[(key, "My Custom Agent")]).await;
        assert_eq!(agents.len(), 3);
        for agent in agents {
            assert_eq!(agent, "My Custom Agent");
        }
    }
}
