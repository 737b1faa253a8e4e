// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify Wrapped: snapshots of a listener's Spotify top items
//!
//! This crate provides the backend API that connects a user's Spotify
//! account over OAuth, reads their listening data, and stores immutable
//! point-in-time "wraps" of it.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use clock::Clock;
use config::Config;
use db::WrapRepository;
use error::AppError;
use services::{SpotifyClient, TokenStore, WrapService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub wraps: Arc<dyn WrapRepository>,
    pub tokens: TokenStore,
    pub spotify: SpotifyClient,
    pub wrap_service: WrapService,
}

impl AppState {
    /// Wire services around a wrap repository.
    pub fn new(
        config: Config,
        wraps: Arc<dyn WrapRepository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let spotify = SpotifyClient::new(&config)?;
        let tokens = TokenStore::with_clock(clock.clone());
        let wrap_service = WrapService::new(
            spotify.clone(),
            wraps.clone(),
            clock,
            config.wrap_item_limit,
        );

        Ok(Self {
            config,
            wraps,
            tokens,
            spotify,
            wrap_service,
        })
    }
}
