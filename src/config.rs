// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Provider hosts are fixed Spotify endpoints but can be overridden so the
//! test suite can point the client at a local fake.

use std::env;

/// Default Spotify Web API base URL.
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
/// Default Spotify accounts host (authorize + token endpoints).
pub const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Scopes needed for the full feature set (profile, playlists, top items,
/// recently played, playback state).
pub const FULL_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "playlist-read-private",
    "playlist-modify-public",
    "playlist-modify-private",
    "user-top-read",
    "user-read-recently-played",
    "streaming",
    "user-read-playback-state",
    "user-modify-playback-state",
];

/// Scopes needed to build a wrap and nothing else.
pub const MINIMAL_SCOPES: &[&str] = &["user-read-recently-played", "user-top-read"];

const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_WRAP_ITEM_LIMIT: u32 = 20;
/// Spotify's maximum page size for top items.
pub const MAX_WRAP_ITEM_LIMIT: u32 = 50;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Spotify OAuth client ID (public)
    pub spotify_client_id: String,
    /// Redirect URI registered with Spotify
    pub spotify_redirect_uri: String,
    /// Space-joined into the `scope` parameter of the authorization URL
    pub spotify_scopes: Vec<String>,
    /// Spotify Web API base URL
    pub spotify_api_url: String,
    /// Spotify accounts base URL
    pub spotify_accounts_url: String,
    /// Frontend URL for OAuth redirects and CORS
    pub frontend_url: String,
    /// GCP project ID; wraps are kept in memory when unset
    pub gcp_project_id: Option<String>,
    /// Server port
    pub port: u16,
    /// Timeout applied to every provider request
    pub provider_timeout_secs: u64,
    /// Number of top items requested per list
    pub wrap_item_limit: u32,

    // --- Secrets ---
    /// Spotify OAuth client secret
    pub spotify_client_secret: String,
    /// Application secret: signs session JWTs and OAuth state (raw bytes)
    pub secret_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            spotify_client_id: env::var("SPOTIFY_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("SPOTIFY_CLIENT_ID"))?,
            spotify_redirect_uri: env::var("SPOTIFY_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("SPOTIFY_REDIRECT_URI"))?,
            spotify_scopes: parse_scopes(env::var("SPOTIFY_SCOPES").ok().as_deref()),
            spotify_api_url: env::var("SPOTIFY_API_URL")
                .unwrap_or_else(|_| SPOTIFY_API_URL.to_string()),
            spotify_accounts_url: env::var("SPOTIFY_ACCOUNTS_URL")
                .unwrap_or_else(|_| SPOTIFY_ACCOUNTS_URL.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            provider_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
            wrap_item_limit: parse_wrap_item_limit(env::var("WRAP_ITEM_LIMIT").ok().as_deref()),

            spotify_client_secret: env::var("SPOTIFY_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SPOTIFY_CLIENT_SECRET"))?,
            secret_key: env::var("SECRET_KEY")
                .map_err(|_| ConfigError::Missing("SECRET_KEY"))?
                .into_bytes(),
        })
    }

    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            spotify_client_id: "test_client_id".to_string(),
            spotify_redirect_uri: "http://localhost:8000/api/spotify/callback/".to_string(),
            spotify_scopes: parse_scopes(None),
            spotify_api_url: SPOTIFY_API_URL.to_string(),
            spotify_accounts_url: SPOTIFY_ACCOUNTS_URL.to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: None,
            port: 8000,
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            wrap_item_limit: DEFAULT_WRAP_ITEM_LIMIT,
            spotify_client_secret: "test_secret".to_string(),
            secret_key: b"test_secret_key_32_bytes_minimum".to_vec(),
        }
    }

    /// Point both provider hosts at a single base URL (fake provider in tests).
    pub fn with_provider_base(mut self, base: &str) -> Self {
        self.spotify_api_url = format!("{}/v1", base);
        self.spotify_accounts_url = base.to_string();
        self
    }
}

/// Resolve the `SPOTIFY_SCOPES` setting: `full` (default), `minimal`,
/// or an explicit space-separated list.
pub fn parse_scopes(raw: Option<&str>) -> Vec<String> {
    let preset = |scopes: &[&str]| scopes.iter().map(|s| s.to_string()).collect();

    match raw.map(str::trim) {
        None | Some("") | Some("full") => preset(FULL_SCOPES),
        Some("minimal") => preset(MINIMAL_SCOPES),
        Some(list) => list.split_whitespace().map(str::to_string).collect(),
    }
}

/// Items per list in a wrap, kept within what Spotify accepts.
pub fn parse_wrap_item_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_WRAP_ITEM_LIMIT)
        .clamp(1, MAX_WRAP_ITEM_LIMIT)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
