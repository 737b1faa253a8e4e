// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify OAuth and session routes.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{session_from_request, AuthSession, SESSION_COOKIE};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed OAuth state stays valid.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

/// Public OAuth routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/spotify/auth/", get(auth_start))
        .route("/api/spotify/login/", get(auth_start))
        .route(
            "/api/spotify/callback/",
            get(auth_callback_redirect).post(auth_callback_json),
        )
}

/// Session routes (auth middleware applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/logout/", post(logout))
        .route("/api/auth/account/", delete(delete_account))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub message: String,
}

/// Start OAuth flow - return the Spotify authorization URL.
///
/// When the caller already has a session, its ID is bound into a signed
/// `state` so the callback can find it without the session cookie.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<AuthUrlResponse>> {
    let oauth_state = match session_from_request(&jar, &headers, &state.config.secret_key) {
        Some(session) => Some(sign_state(
            &session.session_id,
            session.expires_at,
            &state.config.secret_key,
            now_millis()?,
        )?),
        None => None,
    };

    let auth_url = state.spotify.authorization_url(oauth_state.as_deref());

    tracing::info!(
        client_id = %state.config.spotify_client_id,
        session_bound = oauth_state.is_some(),
        "Starting OAuth flow"
    );

    Ok(Json(AuthUrlResponse { auth_url }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackBody {
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

/// Browser callback: Spotify redirects here. Always redirects to the frontend.
async fn auth_callback_redirect(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend_url = state.config.frontend_url.trim_end_matches('/').to_string();
    let fail = |reason: &str| {
        Redirect::temporary(&format!(
            "{}/?error={}",
            frontend_url,
            urlencoding::encode(reason)
        ))
    };

    // Check for OAuth errors
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Spotify");
        return fail(&error);
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return fail("missing_code");
    };

    match complete_oauth(&state, &jar, &headers, &code, params.state.as_deref()).await {
        Ok(()) => Redirect::temporary(&format!("{}/?spotify=connected", frontend_url)),
        Err(AppError::NotAuthenticated) => fail("not_authenticated"),
        Err(AppError::ProviderAuth(_)) => fail("spotify_auth_error"),
        Err(e) => {
            tracing::error!(error = %e, "OAuth callback failed");
            fail("server_error")
        }
    }
}

/// API callback: the frontend posts the code it received.
async fn auth_callback_json(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<CallbackBody>,
) -> Result<Json<MessageResponse>> {
    let code = body
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("No authorization code provided".to_string()))?;

    complete_oauth(&state, &jar, &headers, &code, body.state.as_deref()).await?;

    Ok(Json(MessageResponse {
        message: "Successfully authenticated with Spotify".to_string(),
    }))
}

/// Exchange the code and store the tokens for the resolved session.
///
/// The session comes from a valid signed `state`, else from the session
/// token. Nothing is stored unless both the session and the exchange succeed.
/// Stored tokens expire with the session.
async fn complete_oauth(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
    code: &str,
    oauth_state: Option<&str>,
) -> Result<()> {
    let now = now_millis()?;
    let (session_id, session_expires_at) = oauth_state
        .and_then(|s| verify_state(s, &state.config.secret_key, now))
        .or_else(|| {
            session_from_request(jar, headers, &state.config.secret_key)
                .map(|s| (s.session_id, s.expires_at))
        })
        .ok_or(AppError::NotAuthenticated)?;

    if session_expires_at <= Utc::now() {
        return Err(AppError::NotAuthenticated);
    }

    tracing::info!("Exchanging authorization code for tokens");
    let tokens = state.spotify.exchange_code_for_token(code).await?;

    state.tokens.put(&session_id, tokens, session_expires_at);
    tracing::info!(session_id = %session_id, "Spotify connected for session");

    Ok(())
}

/// Logout - drop this session's Spotify tokens and expire the session cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    state.tokens.clear(&session.session_id);
    tracing::info!(user_id = %session.user_id, "User logged out");

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub deleted_wraps: usize,
    pub message: String,
}

/// Remove everything this service holds for the user: all wraps and the
/// session's tokens. The identity itself is owned by the identity service.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DeleteAccountResponse>)> {
    tracing::info!(user_id = %session.user_id, "User-initiated account deletion");

    let deleted_wraps = state.wraps.delete_all_for_owner(&session.user_id).await?;
    state.tokens.clear(&session.session_id);

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(DeleteAccountResponse {
            deleted_wraps,
            message: "Account data deleted".to_string(),
        }),
    ))
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Sign a session into an OAuth state:
/// base64url("sid|session_exp_hex|ts_hex|sig_hex").
fn sign_state(
    session_id: &str,
    session_expires_at: DateTime<Utc>,
    secret: &[u8],
    now_ms: u128,
) -> Result<String> {
    let payload = format!(
        "{}|{:x}|{:x}",
        session_id,
        session_expires_at.timestamp().max(0),
        now_ms
    );

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify an OAuth state and return the session ID and expiry it carries.
fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> Option<(String, DateTime<Utc>)> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Split from the right so the session ID is whatever remains
    let mut parts = state_str.rsplitn(4, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let expiry_hex = parts.next()?;
    let session_id = parts.next()?;

    let payload = format!("{}|{}|{}", session_id, expiry_hex, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_ms.saturating_sub(issued_ms) > STATE_MAX_AGE_MS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    let expiry_secs = i64::from_str_radix(expiry_hex, 16).ok()?;
    let session_expires_at = DateTime::from_timestamp(expiry_secs, 0)?;

    Some((session_id.to_string(), session_expires_at))
}
