// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session JWT authentication middleware.
//!
//! Sessions are issued by the identity service and signed with the
//! application secret. `sub` is the user (wrap owner) and `sid` keys the
//! session's Spotify tokens.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "wrapped_session";

/// Session lifetime (14 days).
const SESSION_TTL_SECS: usize = 14 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Session ID
    pub sid: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated session extracted from JWT.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user_id: String,
    pub session_id: String,
    /// Session expiry (`exp`); token material must not outlive it
    pub expires_at: DateTime<Utc>,
}

/// Middleware that requires a valid session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = session_from_request(&jar, request.headers(), &state.config.secret_key)
        .ok_or(AppError::InvalidSession)?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Resolve the session from the cookie, then the `Authorization` header.
///
/// Returns `None` for a missing, malformed, or expired token.
pub fn session_from_request(
    jar: &CookieJar,
    headers: &HeaderMap,
    signing_key: &[u8],
) -> Option<AuthSession> {
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string)?,
    };

    verify_session_jwt(&token, signing_key)
}

/// Decode and validate a session token.
pub fn verify_session_jwt(token: &str, signing_key: &[u8]) -> Option<AuthSession> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let claims = decode::<Claims>(token, &key, &validation).ok()?.claims;
    if claims.sub.is_empty() || claims.sid.is_empty() {
        return None;
    }
    let expires_at = DateTime::from_timestamp(i64::try_from(claims.exp).ok()?, 0)?;

    Some(AuthSession {
        user_id: claims.sub,
        session_id: claims.sid,
        expires_at,
    })
}

/// Create a session JWT.
pub fn create_session_jwt(
    user_id: &str,
    session_id: &str,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        sid: session_id.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
