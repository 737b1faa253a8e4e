// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use serde_json::{json, Value};
use spotify_wrapped::clock::{default_clock, Clock};
use spotify_wrapped::config::Config;
use spotify_wrapped::db::{FirestoreDb, MemoryWrapRepository};
use spotify_wrapped::middleware::auth::create_session_jwt;
use spotify_wrapped::models::TokenMaterial;
use spotify_wrapped::routes::create_router;
use spotify_wrapped::AppState;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by the in-memory repository, with Spotify
/// pointed at `provider_base` (usually a wiremock server).
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(provider_base: &str) -> (axum::Router, Arc<AppState>) {
    create_test_app_with_clock(provider_base, default_clock())
}

#[allow(dead_code)]
pub fn create_test_app_with_clock(
    provider_base: &str,
    clock: Arc<dyn Clock>,
) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default().with_provider_base(provider_base);
    let wraps = Arc::new(MemoryWrapRepository::with_clock(clock.clone()));

    let state = Arc::new(AppState::new(config, wraps, clock).expect("Failed to build app state"));

    (create_router(state.clone()), state)
}

/// Session token for `user_id`/`session_id` signed with the app's key.
#[allow(dead_code)]
pub fn session_token(state: &AppState, user_id: &str, session_id: &str) -> String {
    create_session_jwt(user_id, session_id, &state.config.secret_key)
        .expect("Failed to create session JWT")
}

/// Store Spotify tokens for a session that stays live for a day.
#[allow(dead_code)]
pub fn connect_spotify(state: &AppState, session_id: &str, access_token: &str) {
    state.tokens.put(
        session_id,
        TokenMaterial::new(access_token),
        chrono::Utc::now() + chrono::TimeDelta::days(1),
    );
}

/// Build a request carrying a bearer session token.
#[allow(dead_code)]
pub fn authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `count` fake items with IDs `{prefix}0..`.
#[allow(dead_code)]
pub fn items(prefix: &str, count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| json!({ "id": format!("{}{}", prefix, i), "name": format!("{} {}", prefix, i) }))
        .collect();
    json!({ "items": items, "total": count })
}

/// Mount a successful token exchange for `code` returning `access_token`.
#[allow(dead_code)]
pub async fn mount_token_exchange(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "user-top-read user-read-recently-played"
        })))
        .mount(server)
        .await;
}

/// Mount top tracks and artists for one time range.
#[allow(dead_code)]
pub async fn mount_top_items(server: &MockServer, range: &str, tracks: usize, artists: usize) {
    Mock::given(method("GET"))
        .and(path("/v1/me/top/tracks"))
        .and(query_param("time_range", range))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("track", tracks)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/me/top/artists"))
        .and(query_param("time_range", range))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("artist", artists)))
        .mount(server)
        .await;
}
