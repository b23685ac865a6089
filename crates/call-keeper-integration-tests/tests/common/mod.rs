//! Common test utilities for call-keeper-api integration tests
//!
//! This module provides:
//! - An [`AppState`] factory over real in-memory stores and the real
//!   ingestion pipeline
//! - Request signing helpers matching the provider's HMAC scheme
//! - A oneshot helper driving the router like an HTTP client would

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use call_keeper_api::{
    create_router, AppState, DefaultHealthChecker, ServiceConfig, ServiceMetrics,
};
use call_keeper_core::summarize::DisabledSummarizer;
use call_keeper_core::webhook::{
    IngestPipeline, SecretString, SignatureVerifier, SIGNATURE_HEADER,
};
use call_keeper_core::{InMemoryStore, ReconcileEngine, Timestamp};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

/// Shared secret used by the signing helpers
pub const TEST_SECRET: &str = "integration-test-secret";

/// Webhook path configured by [`test_state`]
pub const WEBHOOK_PATH: &str = "/webhook/elevenlabs";

// ============================================================================
// State factory
// ============================================================================

/// Build an [`AppState`] over fresh in-memory stores.
///
/// `secret` controls the verifier: `Some` enforces signatures, `None` runs
/// the endpoint in open mode.
#[allow(dead_code)]
pub fn test_state(secret: Option<&str>) -> (AppState, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let engine = Arc::new(ReconcileEngine::new(
        store.clone(),
        store.clone(),
        Arc::new(DisabledSummarizer),
    ));
    let verifier = SignatureVerifier::new(secret.map(SecretString::new));
    let pipeline = Arc::new(IngestPipeline::new(verifier, engine));

    let metrics = Arc::new(ServiceMetrics::new().expect("metrics registry"));
    let state = AppState::new(
        ServiceConfig::default(),
        pipeline,
        store.clone(),
        store.clone(),
        Arc::new(DefaultHealthChecker),
        metrics,
    );

    (state, store)
}

/// Router over a fresh enforcing state
#[allow(dead_code)]
pub fn test_router(secret: Option<&str>) -> (Router, Arc<InMemoryStore>) {
    let (state, store) = test_state(secret);
    (create_router(state), store)
}

// ============================================================================
// Signing helpers
// ============================================================================

/// Compute the `t=<ts>,v0=<hex>` header for `body` at the current time
#[allow(dead_code)]
pub fn sign_now(secret: &str, body: &str) -> String {
    sign_at(secret, body, Timestamp::now().epoch_seconds())
}

/// Compute the signature header for an arbitrary timestamp
#[allow(dead_code)]
pub fn sign_at(secret: &str, body: &str, timestamp: i64) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    format!(
        "t={},v0={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

// ============================================================================
// Request helpers
// ============================================================================

/// Drive one request through the router and decode the JSON response body
#[allow(dead_code)]
pub async fn send(
    router: &Router,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body within limit");
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, body)
}

/// POST a webhook body with an optional signature header
#[allow(dead_code)]
pub async fn post_webhook(
    router: &Router,
    body: &str,
    signature: Option<String>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    let request = builder
        .body(Body::from(body.to_string()))
        .expect("valid request");

    send(router, request).await
}

/// POST a correctly signed webhook body
#[allow(dead_code)]
pub async fn post_signed_webhook(router: &Router, body: &str) -> (StatusCode, serde_json::Value) {
    let signature = sign_now(TEST_SECRET, body);
    post_webhook(router, body, Some(signature)).await
}

/// GET a path and decode the JSON response
#[allow(dead_code)]
pub async fn get_json(router: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("valid request");

    send(router, request).await
}

/// PATCH a path with a JSON body and decode the response
#[allow(dead_code)]
pub async fn patch_json(
    router: &Router,
    path: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("PATCH")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request");

    send(router, request).await
}
