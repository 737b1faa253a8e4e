// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wrap persistence.
//!
//! Wraps are immutable once written: the only mutations are create and
//! delete. Every lookup is scoped by owner, and a wrap that belongs to
//! someone else is indistinguishable from one that does not exist.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryWrapRepository;

use crate::error::AppError;
use crate::models::{Wrap, WrapPayload, WrapSummary};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const WRAPS: &str = "wraps";
}

#[async_trait]
pub trait WrapRepository: Send + Sync {
    /// Store a new wrap, assigning its ID and creation time.
    async fn create(&self, owner: &str, payload: WrapPayload, title: &str)
        -> Result<Wrap, AppError>;

    /// Owner's wraps, newest first, without payloads.
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<WrapSummary>, AppError>;

    async fn get_by_id(&self, owner: &str, id: &str) -> Result<Wrap, AppError>;

    /// Most recently created wrap for the owner.
    async fn get_latest(&self, owner: &str) -> Result<Wrap, AppError>;

    /// Delete one wrap. Deleting a missing wrap is `NotFound`, every time.
    async fn delete_by_id(&self, owner: &str, id: &str) -> Result<(), AppError>;

    /// Delete every wrap the owner has (account removal). Returns the count.
    async fn delete_all_for_owner(&self, owner: &str) -> Result<usize, AppError>;
}

pub(crate) fn wrap_not_found() -> AppError {
    AppError::NotFound("Wrap not found".to_string())
}
