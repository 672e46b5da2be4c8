//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use warband_core::catalog::{CompositionCatalog, CompositionTemplate};
use warband_core::registry::{ProfileRegistry, UserId};
use warband_test_support::{FixedClock, fixed_now, profile};

use warband_api::app;
use warband_api::state::AppState;

/// In-memory state pinned to the shared fixed clock, with a "Castle Siege"
/// template (Tank, Healer, DPS) and five registered players: 1 to 4 in
/// "Phoenix Rebels", 5 in "Ember Court".
pub async fn seeded_state() -> AppState {
    let state = AppState::in_memory(Arc::new(FixedClock(fixed_now())));
    state
        .composition_catalog
        .insert(CompositionTemplate {
            name: "Castle Siege".to_owned(),
            role_slots: vec!["Tank".to_owned(), "Healer".to_owned(), "DPS".to_owned()],
            created_by: UserId::from("1"),
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    for i in 1..=5 {
        let guild = if i == 5 { "Ember Court" } else { "Phoenix Rebels" };
        state
            .profile_registry
            .upsert_profile(profile(&i.to_string(), &format!("player{i}"), guild))
            .await
            .unwrap();
    }
    state
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app(state: AppState) -> Router {
    app(state)
}

/// Send a request with a JSON body and return the response.
pub async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send_json(app, "POST", uri, body).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
