// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod token;
pub mod wrap;

pub use token::TokenMaterial;
pub use wrap::{ItemType, TimeRange, Wrap, WrapPayload, WrapSummary};
