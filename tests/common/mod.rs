//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chargehub::gateway::{create_router, AppState};
use chargehub::storage::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;

/// Router over a fresh in-memory store, plus a handle to that store
pub fn create_test_app() -> (Router, Arc<MemoryStore>) {
    create_test_app_with(MemoryStore::new())
}

/// Router over the given store
pub fn create_test_app_with(store: MemoryStore) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(store);
    let router = create_router(AppState::new(store.clone()));
    (router, store)
}

/// Send a request with an empty body
pub async fn send(app: &Router, method: &str, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a request with a JSON body
pub async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a request with a raw body and JSON content type
pub async fn send_raw(app: &Router, method: &str, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Read the response body as text
pub async fn text_body(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read the response body as JSON
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
