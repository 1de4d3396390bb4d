//! Middleware stack exercised in-process, without binding a port.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{test_config, PeerBehaviour, ScriptedReplicator, StubOAuth};
use provisioning_service::{
    build_router,
    services::{AccessCodeCipher, EventBroadcaster, InMemoryStore, ProvisioningCoordinator},
    AppState,
};
use std::sync::Arc;
use tower::util::ServiceExt;

fn router() -> axum::Router {
    let config = test_config();
    let store = Arc::new(InMemoryStore::new());
    let coordinator = ProvisioningCoordinator::new(
        store.clone(),
        AccessCodeCipher::new(&config.cipher.secret),
        Arc::new(ScriptedReplicator::new(PeerBehaviour::Acknowledge)),
        Arc::new(StubOAuth::new(false)),
        EventBroadcaster::new(),
        config.replication.timeout,
        config.redirects.clone(),
    );
    build_router(AppState {
        config,
        store,
        coordinator,
    })
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert_eq!(headers["x-request-id"], "req-123");
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin_only() {
    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/createAccount")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = router()
        .oneshot(preflight("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );

    let denied = router()
        .oneshot(preflight("http://evil.example"))
        .await
        .unwrap();
    assert!(denied
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn metrics_endpoint_answers_without_recorder() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
