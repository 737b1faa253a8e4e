// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod spotify;
pub mod token_store;
pub mod wrap;

pub use spotify::SpotifyClient;
pub use token_store::TokenStore;
pub use wrap::WrapService;
