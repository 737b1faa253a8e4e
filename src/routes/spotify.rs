// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify data routes: live reads and wrap creation.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::AuthSession;
use crate::models::{TimeRange, TokenMaterial, WrapPayload};
use crate::services::spotify::{ResourcePage, SpotifyProfile};
use crate::AppState;

/// Provider maximum for list endpoints.
const MAX_PAGE_LIMIT: u32 = 50;

/// Spotify data routes (auth middleware applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/spotify/playlists/", get(get_playlists))
        .route("/api/spotify/recently-played/", get(get_recently_played))
        .route("/api/spotify/profile/", get(get_profile))
        .route("/api/spotify/wrapped/", get(get_current_wrapped))
        .route("/api/spotify/wrapped/create/", post(create_wrap))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<u32>,
}

impl LimitQuery {
    fn limit(&self) -> u32 {
        self.limit.unwrap_or(MAX_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateWrapRequest {
    #[serde(default)]
    time_range: Option<String>,
}

/// The session's token material, or `NotAuthenticated`.
fn session_tokens(state: &AppState, session: &AuthSession) -> Result<TokenMaterial> {
    state
        .tokens
        .get(&session.session_id)
        .ok_or(AppError::NotAuthenticated)
}

/// Drop the session's tokens when Spotify rejected them, so the next
/// request reports a clean "connect Spotify" state.
fn forget_rejected_tokens<T>(
    state: &AppState,
    session: &AuthSession,
    result: Result<T>,
) -> Result<T> {
    if matches!(result, Err(AppError::NotAuthenticated)) {
        tracing::info!(
            session_id = %session.session_id,
            "Spotify rejected token, clearing session tokens"
        );
        state.tokens.clear(&session.session_id);
    }
    result
}

/// GET /api/spotify/playlists/ - the user's playlists.
async fn get_playlists(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Value>>> {
    let tokens = session_tokens(&state, &session)?;
    let page = forget_rejected_tokens(
        &state,
        &session,
        state
            .spotify
            .fetch_playlists(&tokens.access_token, query.limit())
            .await,
    )?;

    Ok(Json(page.items))
}

/// GET /api/spotify/recently-played/
async fn get_recently_played(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ResourcePage>> {
    let tokens = session_tokens(&state, &session)?;
    let page = forget_rejected_tokens(
        &state,
        &session,
        state
            .spotify
            .fetch_recently_played(&tokens.access_token, query.limit())
            .await,
    )?;

    Ok(Json(page))
}

/// GET /api/spotify/profile/
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<SpotifyProfile>> {
    let tokens = session_tokens(&state, &session)?;
    let profile = forget_rejected_tokens(
        &state,
        &session,
        state.spotify.fetch_user_profile(&tokens.access_token).await,
    )?;

    Ok(Json(profile))
}

/// GET /api/spotify/wrapped/ - live recent vs. all-time lists, not stored.
async fn get_current_wrapped(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<WrapPayload>> {
    let tokens = state.tokens.get(&session.session_id);
    let payload = forget_rejected_tokens(
        &state,
        &session,
        state.wrap_service.current_top_items(tokens.as_ref()).await,
    )?;

    Ok(Json(payload))
}

/// POST /api/spotify/wrapped/create/ - snapshot and persist.
///
/// An empty body means the recent vs. all-time variant.
async fn create_wrap(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let request: CreateWrapRequest = if body.is_empty() {
        CreateWrapRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let time_range = request
        .time_range
        .as_deref()
        .map(str::parse::<TimeRange>)
        .transpose()
        .map_err(|_| AppError::BadRequest("Invalid time range".to_string()))?;

    let tokens = state.tokens.get(&session.session_id);
    let wrap = forget_rejected_tokens(
        &state,
        &session,
        state
            .wrap_service
            .create_wrap(&session.user_id, tokens.as_ref(), time_range)
            .await,
    )?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/spotify/wraps/{}/", wrap.id))],
        Json(wrap.wrap_data),
    ))
}
