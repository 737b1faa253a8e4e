// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-session Spotify token storage.
//!
//! Token material lives only in process memory, keyed by session ID, and
//! shares the session's lifetime. It is written at OAuth callback together
//! with the session's expiry, read by every provider call in that session,
//! and dropped at logout. An entry past its session expiry reads as absent
//! and is swept on the next write.

use crate::clock::{default_clock, Clock};
use crate::models::TokenMaterial;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

struct SessionTokens {
    tokens: TokenMaterial,
    expires_at: DateTime<Utc>,
}

/// Shared session → token map.
#[derive(Clone)]
pub struct TokenStore {
    sessions: Arc<DashMap<String, SessionTokens>>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::with_clock(default_clock())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Store token material for a session that expires at `expires_at`,
    /// replacing anything already there.
    pub fn put(&self, session_id: &str, tokens: TokenMaterial, expires_at: DateTime<Utc>) {
        self.sweep_expired();

        let replaced = self
            .sessions
            .insert(session_id.to_string(), SessionTokens { tokens, expires_at })
            .is_some();
        tracing::debug!(session_id, replaced, %expires_at, "Stored Spotify tokens for session");
    }

    /// Current token material for a live session, if any.
    pub fn get(&self, session_id: &str) -> Option<TokenMaterial> {
        let now = self.clock.now();
        let removed = self
            .sessions
            .remove_if(session_id, |_, entry| entry.expires_at <= now);
        if removed.is_some() {
            tracing::debug!(session_id, "Dropped Spotify tokens for expired session");
            return None;
        }

        self.sessions
            .get(session_id)
            .map(|entry| entry.tokens.clone())
    }

    /// Forget a session's token material.
    pub fn clear(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            tracing::debug!(session_id, "Cleared Spotify tokens for session");
        }
    }

    /// Drop every entry whose session has expired. Returns how many went.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        let swept = before.saturating_sub(self.sessions.len());
        if swept > 0 {
            tracing::debug!(swept, "Swept Spotify tokens of expired sessions");
        }
        swept
    }

    /// Number of stored sessions, expired or not.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
