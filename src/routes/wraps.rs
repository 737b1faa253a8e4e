// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stored wrap routes. Every lookup is scoped to the session's user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::AuthSession;
use crate::models::{WrapPayload, WrapSummary};
use crate::AppState;

/// Wrap routes (auth middleware applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/spotify/wraps/", get(list_wraps))
        .route("/api/spotify/wraps/latest/", get(get_latest_wrap))
        .route(
            "/api/spotify/wraps/{id}/",
            get(get_wrap).delete(delete_wrap),
        )
        .route("/api/spotify/wraps/{id}/delete/", delete(delete_wrap))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WrapListResponse {
    pub wraps: Vec<WrapSummary>,
}

async fn list_wraps(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<WrapListResponse>> {
    let wraps = state.wraps.list_by_owner(&session.user_id).await?;
    Ok(Json(WrapListResponse { wraps }))
}

async fn get_latest_wrap(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<WrapPayload>> {
    let wrap = state.wraps.get_latest(&session.user_id).await?;
    Ok(Json(wrap.wrap_data))
}

async fn get_wrap(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Result<Json<WrapPayload>> {
    let wrap = state.wraps.get_by_id(&session.user_id, &id).await?;
    Ok(Json(wrap.wrap_data))
}

async fn delete_wrap(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.wraps.delete_by_id(&session.user_id, &id).await?;
    tracing::info!(user_id = %session.user_id, wrap_id = %id, "Wrap deleted");
    Ok(StatusCode::NO_CONTENT)
}
