// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (session authentication, response hardening).

pub mod auth;
pub mod security;

pub use auth::{require_auth, AuthSession};
