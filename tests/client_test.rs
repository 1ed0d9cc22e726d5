//! Integration tests for the Structurizr client transport.

use std::sync::Arc;
use std::time::{Duration, Instant};
use structurizr::{
    signing, CancellationToken, Client, ClientConfig, ErrorKind, FixedClock, HmacAuth,
    StructurizrError, WorkspaceApi,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn admin_client(server: &MockServer, api_key: &str) -> Client {
    Client::with_admin_key(
        api_key,
        ClientConfig {
            base_url: Some(server.uri()),
            ..Default::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_client_creation() {
    let client = Client::new("test_api_key").unwrap();
    assert_eq!(client.base_url().scheme(), "https");
}

#[tokio::test]
async fn test_client_with_custom_config() {
    let client = Client::with_admin_key(
        "test_api_key",
        ClientConfig {
            base_url: Some("https://structurizr.example.com".to_string()),
            timeout: Some(Duration::from_secs(60)),
            user_agent: Some("test-agent/1.0".to_string()),
            tls_insecure: true,
        },
    )
    .unwrap();
    assert_eq!(client.base_url().as_str(), "https://structurizr.example.com/");
}

#[tokio::test]
async fn test_get_request_with_admin_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/workspace"))
        .and(header("X-Authorization", "test_api_key"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "workspaces": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = admin_client(&mock_server, "test_api_key");
    let workspaces = client.workspaces().list().await.unwrap();
    assert!(workspaces.is_empty());
}

#[tokio::test]
async fn test_get_request_with_hmac_auth() {
    let mock_server = MockServer::start().await;
    let nonce = "1713472217559";

    let checksum = signing::checksum(b"");
    let signature = signing::encode(&signing::sign(
        "workspace-secret",
        &signing::canonical_string(&["GET", "/api/workspace", &checksum, "", nonce]),
    ));

    Mock::given(method("GET"))
        .and(path("/api/workspace"))
        .and(header("X-Authorization", format!("workspace-key:{signature}").as_str()))
        .and(header("Nonce", nonce))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "workspaces": [{"id": 1, "name": "Big Bank plc"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::with_config(
        HmacAuth::with_clock(
            "workspace-key",
            "workspace-secret",
            Arc::new(FixedClock(1713472217559)),
        ),
        ClientConfig {
            base_url: Some(mock_server.uri()),
            ..Default::default()
        },
    )
    .unwrap();

    let workspaces = client.workspaces().list().await.unwrap();
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0].name, "Big Bank plc");
}

#[tokio::test]
async fn test_unauthorized_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/workspace"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "success": false,
            "message": "Incorrect API key"
        })))
        .mount(&mock_server)
        .await;

    let client = admin_client(&mock_server, "invalid_key");
    let err = client.workspaces().list().await.unwrap_err();

    assert!(err.is_auth_error());
    match err {
        StructurizrError::Unauthorized { message } => assert_eq!(message, "Incorrect API key"),
        other => panic!("Expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_unavailable_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/workspace"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let client = admin_client(&mock_server, "test_key");
    let err = client.workspaces().list().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServerUnavailable);
    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn test_bad_request_error_parsing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/workspace/3"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "success": false,
            "message": "Workspace 3 does not exist"
        })))
        .mount(&mock_server)
        .await;

    let client = admin_client(&mock_server, "test_key");
    let err = client.workspaces().delete(3).await.unwrap_err();

    match err {
        StructurizrError::BadRequest { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Workspace 3 does not exist");
        }
        other => panic!("Expected BadRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_success_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/workspace"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let client = admin_client(&mock_server, "test_key");
    let err = client.workspaces().list().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/workspace"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"workspaces": []}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let token = CancellationToken::new();
    let client = admin_client(&mock_server, "test_key").with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let started = Instant::now();
    let err = client.workspaces().list().await.unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, StructurizrError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancelled_token_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/workspace"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let client = admin_client(&mock_server, "test_key").with_cancellation(token);

    let err = client.workspaces().create().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/workspace"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"workspaces": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::with_admin_key(
        "test_key",
        ClientConfig {
            base_url: Some(mock_server.uri()),
            timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        },
    )
    .unwrap();

    let err = client.workspaces().list().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}
