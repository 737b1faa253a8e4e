// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory wrap repository for local development and tests.

use crate::clock::{default_clock, Clock};
use crate::db::{wrap_not_found, WrapRepository};
use crate::error::AppError;
use crate::models::{Wrap, WrapPayload, WrapSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Wraps grouped by owner, each group kept in insertion order.
pub struct MemoryWrapRepository {
    wraps: RwLock<HashMap<String, Vec<Wrap>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryWrapRepository {
    pub fn new() -> Self {
        Self::with_clock(default_clock())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            wraps: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Owner's wraps newest first. Equal timestamps keep the later insert first.
    fn newest_first(wraps: &[Wrap]) -> Vec<&Wrap> {
        let mut sorted: Vec<&Wrap> = wraps.iter().rev().collect();
        sorted.sort_by(|a, b| b.date_generated.cmp(&a.date_generated));
        sorted
    }
}

impl Default for MemoryWrapRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WrapRepository for MemoryWrapRepository {
    async fn create(
        &self,
        owner: &str,
        payload: WrapPayload,
        title: &str,
    ) -> Result<Wrap, AppError> {
        let wrap = Wrap {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            date_generated: self.clock.now(),
            title: title.to_string(),
            wrap_data: payload,
        };

        self.wraps
            .write()
            .await
            .entry(owner.to_string())
            .or_default()
            .push(wrap.clone());

        Ok(wrap)
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<WrapSummary>, AppError> {
        let guard = self.wraps.read().await;
        let Some(wraps) = guard.get(owner) else {
            return Ok(Vec::new());
        };

        Ok(Self::newest_first(wraps)
            .into_iter()
            .map(Wrap::summary)
            .collect())
    }

    async fn get_by_id(&self, owner: &str, id: &str) -> Result<Wrap, AppError> {
        self.wraps
            .read()
            .await
            .get(owner)
            .and_then(|wraps| wraps.iter().find(|w| w.id == id))
            .cloned()
            .ok_or_else(wrap_not_found)
    }

    async fn get_latest(&self, owner: &str) -> Result<Wrap, AppError> {
        let guard = self.wraps.read().await;
        guard
            .get(owner)
            .and_then(|wraps| Self::newest_first(wraps).first().map(|w| (*w).clone()))
            .ok_or_else(wrap_not_found)
    }

    async fn delete_by_id(&self, owner: &str, id: &str) -> Result<(), AppError> {
        let mut guard = self.wraps.write().await;
        let wraps = guard.get_mut(owner).ok_or_else(wrap_not_found)?;
        let index = wraps
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(wrap_not_found)?;
        wraps.remove(index);
        Ok(())
    }

    async fn delete_all_for_owner(&self, owner: &str) -> Result<usize, AppError> {
        Ok(self
            .wraps
            .write()
            .await
            .remove(owner)
            .map(|wraps| wraps.len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use chrono::{TimeDelta, TimeZone, Utc};
    use serde_json::json;

    fn repo_with_clock() -> (MemoryWrapRepository, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(
            Utc.with_ymd_and_hms(2024, 12, 1, 12, 0, 0).unwrap(),
        ));
        (MemoryWrapRepository::with_clock(clock.clone()), clock)
    }

    fn payload(track: &str) -> WrapPayload {
        WrapPayload {
            top_tracks: vec![json!({ "id": track })],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamp() {
        let (repo, clock) = repo_with_clock();
        let wrap = repo.create("alice", payload("t1"), "Wrap A").await.unwrap();

        assert!(uuid::Uuid::parse_str(&wrap.id).is_ok());
        assert_eq!(wrap.owner, "alice");
        assert_eq!(wrap.date_generated, clock.now());
        assert_eq!(wrap.title, "Wrap A");

        let fetched = repo.get_by_id("alice", &wrap.id).await.unwrap();
        assert_eq!(fetched, wrap);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (repo, clock) = repo_with_clock();
        let w1 = repo.create("alice", payload("t1"), "first").await.unwrap();
        clock.advance(TimeDelta::minutes(1));
        let w2 = repo.create("alice", payload("t2"), "second").await.unwrap();
        clock.advance(TimeDelta::minutes(1));
        let w3 = repo.create("alice", payload("t3"), "third").await.unwrap();

        let ids: Vec<String> = repo
            .list_by_owner("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();

        assert_eq!(ids, vec![w3.id.clone(), w2.id, w1.id]);
        assert_eq!(repo.get_latest("alice").await.unwrap().id, w3.id);
    }

    #[tokio::test]
    async fn test_same_timestamp_later_insert_first() {
        let (repo, _clock) = repo_with_clock();
        let w1 = repo.create("alice", payload("t1"), "first").await.unwrap();
        let w2 = repo.create("alice", payload("t2"), "second").await.unwrap();

        let list = repo.list_by_owner("alice").await.unwrap();
        assert_eq!(list[0].id, w2.id);
        assert_eq!(list[1].id, w1.id);
    }

    #[tokio::test]
    async fn test_owner_isolation() {
        let (repo, _clock) = repo_with_clock();
        let bobs = repo.create("bob", payload("t1"), "bob's").await.unwrap();

        assert!(matches!(
            repo.get_by_id("alice", &bobs.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_by_id("alice", &bobs.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(repo.list_by_owner("alice").await.unwrap().is_empty());
        // Bob's wrap is untouched
        assert!(repo.get_by_id("bob", &bobs.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_then_get_and_repeat_delete() {
        let (repo, _clock) = repo_with_clock();
        let wrap = repo.create("alice", payload("t1"), "x").await.unwrap();

        repo.delete_by_id("alice", &wrap.id).await.unwrap();
        assert!(matches!(
            repo.get_by_id("alice", &wrap.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_by_id("alice", &wrap.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_latest_without_wraps() {
        let (repo, _clock) = repo_with_clock();
        assert!(matches!(
            repo.get_latest("nobody").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_all_for_owner() {
        let (repo, _clock) = repo_with_clock();
        repo.create("alice", payload("t1"), "a").await.unwrap();
        repo.create("alice", payload("t2"), "b").await.unwrap();
        repo.create("bob", payload("t3"), "c").await.unwrap();

        assert_eq!(repo.delete_all_for_owner("alice").await.unwrap(), 2);
        assert!(repo.list_by_owner("alice").await.unwrap().is_empty());
        assert_eq!(repo.list_by_owner("bob").await.unwrap().len(), 1);
        assert_eq!(repo.delete_all_for_owner("alice").await.unwrap(), 0);
    }
}
