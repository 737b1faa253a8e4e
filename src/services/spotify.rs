// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify API client.
//!
//! Handles:
//! - Authorization URL construction
//! - Authorization code exchange (HTTP Basic client auth)
//! - Top items, recently played, profile, playlists and track lookups
//!
//! Every call returns a typed result; non-success responses never come
//! back disguised as data.

use crate::config::Config;
use crate::error::AppError;
use crate::models::{ItemType, TimeRange, TokenMaterial};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Spotify API client.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    api_url: String,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: Vec<String>,
}

impl SpotifyClient {
    /// Create a client from application config, with a bounded request timeout.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            api_url: config.spotify_api_url.trim_end_matches('/').to_string(),
            accounts_url: config.spotify_accounts_url.trim_end_matches('/').to_string(),
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
            scopes: config.spotify_scopes.clone(),
        })
    }

    /// Authorization URL for this client's credentials and scopes.
    pub fn authorization_url(&self, state: Option<&str>) -> String {
        build_authorization_url(
            &format!("{}/authorize", self.accounts_url),
            &self.client_id,
            &self.redirect_uri,
            &self.scopes,
            state,
        )
    }

    /// Exchange an authorization code for token material.
    ///
    /// POST {accounts}/api/token with `grant_type=authorization_code`,
    /// authenticated with `Basic base64(client_id:client_secret)`.
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<TokenMaterial, AppError> {
        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ProviderAuth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Spotify rejected authorization code");
            return Err(AppError::ProviderAuth(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ProviderAuth(format!("Token response parse error: {}", e)))
    }

    /// GET /me/top/{tracks|artists}
    pub async fn fetch_top_items(
        &self,
        access_token: &str,
        item_type: ItemType,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<ResourcePage, AppError> {
        let url = format!("{}/me/top/{}", self.api_url, item_type.as_str());
        self.get_json(
            &url,
            access_token,
            &[
                ("time_range", time_range.as_str().to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    /// GET /me/player/recently-played
    pub async fn fetch_recently_played(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<ResourcePage, AppError> {
        let url = format!("{}/me/player/recently-played", self.api_url);
        self.get_json(&url, access_token, &[("limit", limit.to_string())])
            .await
    }

    /// GET /me
    pub async fn fetch_user_profile(&self, access_token: &str) -> Result<SpotifyProfile, AppError> {
        let url = format!("{}/me", self.api_url);
        self.get_json(&url, access_token, &[]).await
    }

    /// GET /me/playlists
    pub async fn fetch_playlists(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<ResourcePage, AppError> {
        let url = format!("{}/me/playlists", self.api_url);
        self.get_json(&url, access_token, &[("limit", limit.to_string())])
            .await
    }

    /// GET /tracks/{id}, returning only `preview_url`.
    ///
    /// An unknown track is `Ok(None)`; other failures are errors the caller
    /// may choose to ignore.
    pub async fn fetch_track_preview_url(
        &self,
        track_id: &str,
        access_token: &str,
    ) -> Result<Option<String>, AppError> {
        let url = format!("{}/tracks/{}", self.api_url, urlencoding::encode(track_id));

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ProviderApi(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let track: TrackPreview = self.check_response_json(response).await?;
        Ok(track.preview_url)
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::ProviderApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Spotify rate limit hit (429)");
                return Err(AppError::ProviderApi(format!("Rate limited: {}", body)));
            }

            // Expired or revoked access token: the user has to reconnect
            if status.as_u16() == 401 {
                tracing::info!("Spotify rejected access token");
                return Err(AppError::NotAuthenticated);
            }

            return Err(AppError::ProviderApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ProviderApi(format!("JSON parse error: {}", e)))
    }
}

/// Build the Spotify authorization URL.
///
/// Pure: the same inputs always give the same string, and every query
/// value is percent-encoded so it decodes back to the input.
pub fn build_authorization_url(
    authorize_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
    state: Option<&str>,
) -> String {
    let mut url = format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&scope={}",
        authorize_endpoint,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&scopes.join(" ")),
    );

    if let Some(state) = state {
        url.push_str("&state=");
        url.push_str(&urlencoding::encode(state));
    }

    url
}

/// A paging object (`{"items": [...], "total": ..., "next": ...}`).
///
/// `items` is typed so callers can use it directly; every other field is
/// carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePage {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Current user's profile from `/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct TrackPreview {
    #[serde(default)]
    preview_url: Option<String>,
}
