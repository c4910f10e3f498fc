use super::*;
use crate::service::test_helpers::{ScriptedSource, create_test_service, test_config};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test FetchService (wrapped in Arc) around a scripted source
fn create_test_app_service() -> (Arc<FetchService>, Arc<ScriptedSource>) {
    let source = Arc::new(ScriptedSource::new());
    let service = Arc::new(create_test_service(source.clone()));
    (service, source)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (service, _source) = create_test_app_service();

    // Port 0 = OS assigns a free port
    let mut config = test_config();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn(start_api_server(service, config));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");

    api_handle.abort();
}

#[tokio::test]
async fn test_spawn_api_server_respects_enabled_flag() {
    let (service, _source) = create_test_app_service();

    assert!(!service.get_config().api.enabled);
    assert!(service.spawn_api_server().is_none());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (service, _source) = create_test_app_service();

    let mut config = test_config();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = create_router(service, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS headers should be present"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (service, _source) = create_test_app_service();

    let mut config = test_config();
    config.api.cors_enabled = false;
    let app = create_router(service, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let (service, _source) = create_test_app_service();

    let mut config = test_config();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(service, Arc::new(config));

    let allowed = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://allowed.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        allowed
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://allowed.example")
    );

    let denied = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://other.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(!denied.headers().contains_key("access-control-allow-origin"));
}
