//! Lifecycle tests over real sockets.
//!
//! Bind on port 0, drive the service with a real HTTP client, and verify the
//! start/stop state machine: idempotent stop, released ports, fresh
//! credentials on every start, and bind-failure reporting.

use std::sync::Arc;

use serde_json::json;

use edlink::config::NetworkServerConfig;
use edlink::control::{ControlError, ControlService};
use edlink::target::{Direction, RecordingTarget, TargetCall};

fn test_config() -> NetworkServerConfig {
    NetworkServerConfig {
        enabled: true,
        host: "127.0.0.1".to_string(),
        port: 0,
        ..NetworkServerConfig::default()
    }
}

fn test_service() -> (ControlService, Arc<RecordingTarget>) {
    let target = RecordingTarget::new();
    let service = ControlService::new(test_config(), target.clone()).unwrap();
    (service, target)
}

#[tokio::test]
async fn serves_tool_calls_over_a_real_socket() {
    let (service, target) = test_service();
    let payload = service.start().await.unwrap();
    let addr = service.local_addr().await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/mcp/call_tool", addr))
        .header("x-api-key", &payload.api_key)
        .json(&json!({"arguments": {"command": "move", "args": {"direction": "left"}}}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["content"][0]["text"], "Successfully executed move");
    assert_eq!(target.calls(), vec![TargetCall::MoveCursor(Direction::Left)]);

    service.stop().await;
}

#[tokio::test]
async fn health_endpoint_answers_without_credentials() {
    let (service, _target) = test_service();
    service.start().await.unwrap();
    let addr = service.local_addr().await.unwrap();

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    service.stop().await;
}

#[tokio::test]
async fn pairing_payload_advertises_the_bound_port() {
    let (service, _target) = test_service();
    let payload = service.start().await.unwrap();
    let addr = service.local_addr().await.unwrap();

    assert_eq!(payload.server, format!("http://127.0.0.1:{}", addr.port()));
    assert_eq!(payload.api_key.len(), 64);

    service.stop().await;
}

#[tokio::test]
async fn stop_twice_releases_the_socket_both_times() {
    let (service, _target) = test_service();
    service.start().await.unwrap();
    let addr = service.local_addr().await.unwrap();

    service.stop().await;
    // Socket is released: we can bind the exact address again.
    let rebound = tokio::net::TcpListener::bind(addr).await;
    assert!(rebound.is_ok());
    drop(rebound);

    // Second stop must not raise or re-acquire anything.
    service.stop().await;
    let rebound = tokio::net::TcpListener::bind(addr).await;
    assert!(rebound.is_ok());
}

#[tokio::test]
async fn two_starts_pair_with_different_credentials() {
    let (service, _target) = test_service();

    let first = service.start().await.unwrap();
    service.stop().await;
    let second = service.start().await.unwrap();
    service.stop().await;

    assert_ne!(first.api_key, second.api_key);
}

#[tokio::test]
async fn credential_from_a_previous_start_is_rejected() {
    let (service, target) = test_service();

    let old_payload = service.start().await.unwrap();
    service.stop().await;
    let _new_payload = service.start().await.unwrap();
    let addr = service.local_addr().await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/mcp/call_tool", addr))
        .header("x-api-key", &old_payload.api_key)
        .json(&json!({"arguments": {"command": "move", "args": {"direction": "up"}}}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(target.call_count(), 0);

    service.stop().await;
}

#[tokio::test]
async fn start_on_an_occupied_port_is_reported() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = occupied.local_addr().unwrap();

    let config = NetworkServerConfig {
        port: addr.port(),
        ..test_config()
    };
    let service = ControlService::new(config, RecordingTarget::new()).unwrap();

    let err = service.start().await.unwrap_err();
    assert!(matches!(err, ControlError::Protocol(_)), "got: {:?}", err);
    assert!(service.local_addr().await.is_none());
}

#[tokio::test]
async fn bearer_token_required_over_the_wire_when_configured() {
    let config = NetworkServerConfig {
        auth_token: Some("wire-secret".to_string()),
        ..test_config()
    };
    let service = ControlService::new(config, RecordingTarget::new()).unwrap();
    let payload = service.start().await.unwrap();
    let addr = service.local_addr().await.unwrap();

    let client = reqwest::Client::new();

    // Credential without the bearer token stops at the outer gate.
    let response = client
        .post(format!("http://{}/mcp/list_tools", addr))
        .header("x-api-key", &payload.api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Both gates pass.
    let response = client
        .post(format!("http://{}/mcp/list_tools", addr))
        .bearer_auth("wire-secret")
        .header("x-api-key", &payload.api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["tools"][0]["name"], "cursorControl");

    service.stop().await;
}
