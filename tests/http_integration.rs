//! Integration tests for the HTTP transport using wiremock
//!
//! These tests drive the lifecycle engine over real HTTP against mocked
//! endpoints, checking paths, query strings, bodies, the auth header and
//! the handling of error statuses.

use cloudlayer::config::{CloudProfile, Config};
use cloudlayer::transport::http::HttpTransport;
use cloudlayer::{CloudClient, CreateRequest, ErrorKind, Filter};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn profile(server: &MockServer) -> CloudProfile {
    let mut interfaces = HashMap::new();
    interfaces.insert("public".to_string(), server.uri());
    let mut endpoints = HashMap::new();
    endpoints.insert("network".to_string(), interfaces);

    CloudProfile {
        token: Some(TOKEN.to_string()),
        endpoints,
        timeout_secs: Some(5),
        ..CloudProfile::default()
    }
}

fn client(server: &MockServer) -> CloudClient {
    let transport = HttpTransport::from_profile(&profile(server)).expect("transport should build");
    CloudClient::new(Arc::new(transport))
}

/// Test module for HTTP lifecycle integration tests
mod http_lifecycle_tests {
    use super::*;

    /// Successful list returns items in server order
    #[tokio::test]
    async fn test_list_networks_returns_items() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2.0/networks.json"))
            .and(header("X-Auth-Token", TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "networks": [
                    {"id": "1", "name": "net1"},
                    {"id": "2", "name": "net2"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let nets = client(&server).list_networks(None).await.expect("list should succeed");

        assert_eq!(nets.len(), 2);
        assert_eq!(nets[0], json!({"id": "1", "name": "net1"}));
        assert_eq!(nets[1].name(), Some("net2"));
    }

    /// Server-side filters travel as query parameters
    #[tokio::test]
    async fn test_list_networks_filtered_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2.0/networks.json"))
            .and(query_param("name", "test"))
            .and(query_param("router:external", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"networks": []})))
            .expect(1)
            .mount(&server)
            .await;

        let filter = Filter::new().with("name", "test").with("router:external", true);
        let nets = client(&server).list_networks(Some(&filter)).await.unwrap();

        assert!(nets.is_empty());
    }

    /// Create sends the wrapped body and decodes the wrapped response
    #[tokio::test]
    async fn test_create_network_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2.0/networks.json"))
            .and(body_json(json!({"network": {
                "name": "netname",
                "admin_state_up": true,
                "router:external": true
            }})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"network": {
                "id": "net-id",
                "name": "netname",
                "admin_state_up": true,
                "router:external": true,
                "status": "ACTIVE"
            }})))
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server)
            .create_network(CreateRequest::new("netname").external(true))
            .await
            .unwrap();

        assert_eq!(created.id(), Some("net-id"));
        assert_eq!(created.get("status"), Some(&json!("ACTIVE")));
    }

    /// Delete resolves the name, then deletes by id
    #[tokio::test]
    async fn test_delete_network() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2.0/networks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "networks": [{"id": "test-net-id", "name": "network"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/v2.0/networks/test-net-id.json"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).delete_network("network").await.unwrap());
    }

    /// Delete of an absent network makes no DELETE call
    #[tokio::test]
    async fn test_delete_network_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2.0/networks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"networks": []})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        assert!(!client(&server).delete_network("test-net").await.unwrap());
    }

    /// A 503 on the delete call is an error, not `false`
    #[tokio::test]
    async fn test_delete_network_503() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2.0/networks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "networks": [{"id": "test-net-id", "name": "network"}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/v2.0/networks/test-net-id.json"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).delete_network("network").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote { status: 503 });
    }

    /// 401 is a remote failure carrying the status
    #[tokio::test]
    async fn test_401_is_remote_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2.0/networks.json"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": 401, "message": "The request you have made requires authentication."}
            })))
            .mount(&server)
            .await;

        let err = client(&server).list_networks(None).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(err.message().contains("requires authentication"));
    }

    /// Non-JSON success bodies are bad responses
    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2.0/networks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_networks(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadResponse);
    }

    /// Next links are followed until the list is complete
    #[tokio::test]
    async fn test_pagination_with_next_link() {
        let server = MockServer::start().await;
        let next = format!("{}/v2.0/networks.json?limit=2&marker=2", server.uri());

        Mock::given(method("GET"))
            .and(path("/v2.0/networks.json"))
            .and(query_param("marker", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "networks": [{"id": "3"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2.0/networks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "networks": [{"id": "1"}, {"id": "2"}],
                "networks_links": [{"rel": "next", "href": next}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let nets = client(&server).list_networks(None).await.unwrap();
        let ids: Vec<_> = nets.iter().filter_map(|n| n.id()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    /// Unconfigured interfaces fail before any request
    #[tokio::test]
    async fn test_missing_endpoint_is_connection_error() {
        let server = MockServer::start().await;

        let err = client(&server)
            .with_interface("admin")
            .list_networks(None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}

/// Profiles loaded from YAML drive the transport
#[tokio::test]
async fn test_transport_from_yaml_profile() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/routers.json"))
        .and(header("X-Auth-Token", "yaml-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"routers": []})))
        .expect(1)
        .mount(&server)
        .await;

    let yaml = format!(
        "clouds:\n  test:\n    token: yaml-token\n    endpoints:\n      network:\n        public: {}\n",
        server.uri()
    );
    let config = Config::from_yaml(&yaml).unwrap();
    let profile = &config.clouds["test"];
    let transport = HttpTransport::from_profile(profile).unwrap();
    let client = CloudClient::new(Arc::new(transport));

    let routers = client.resource("routers").unwrap().list(None).await.unwrap();
    assert!(routers.is_empty());
}
