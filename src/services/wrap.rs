// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wrap assembly: fetch top items from Spotify, package them, persist.
//!
//! A wrap is either a single time range (`topTracks`/`topArtists`) or the
//! recent vs. all-time comparison (four lists). The four fetches are
//! independent reads and run concurrently. Any fetch failure aborts the
//! wrap before anything is written; preview enrichment is best-effort.

use crate::clock::Clock;
use crate::db::WrapRepository;
use crate::error::AppError;
use crate::models::wrap::wrap_title;
use crate::models::{ItemType, TimeRange, TokenMaterial, Wrap, WrapPayload};
use crate::services::spotify::SpotifyClient;
use futures_util::{stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;

/// Concurrent preview lookups per wrap.
const MAX_CONCURRENT_PREVIEW_LOOKUPS: usize = 8;

/// Builds and stores wraps.
#[derive(Clone)]
pub struct WrapService {
    spotify: SpotifyClient,
    wraps: Arc<dyn WrapRepository>,
    clock: Arc<dyn Clock>,
    item_limit: u32,
    enrich_previews: bool,
}

impl WrapService {
    pub fn new(
        spotify: SpotifyClient,
        wraps: Arc<dyn WrapRepository>,
        clock: Arc<dyn Clock>,
        item_limit: u32,
    ) -> Self {
        Self {
            spotify,
            wraps,
            clock,
            item_limit,
            enrich_previews: true,
        }
    }

    /// Turn track preview enrichment on or off.
    pub fn with_preview_enrichment(mut self, enabled: bool) -> Self {
        self.enrich_previews = enabled;
        self
    }

    /// Assemble a snapshot for `owner` and persist it.
    ///
    /// Fails with `NotAuthenticated` before any provider call when the
    /// session has no token material.
    pub async fn create_wrap(
        &self,
        owner: &str,
        tokens: Option<&TokenMaterial>,
        time_range: Option<TimeRange>,
    ) -> Result<Wrap, AppError> {
        let tokens = tokens.ok_or(AppError::NotAuthenticated)?;

        let payload = match time_range {
            Some(range) => self.single_range_payload(&tokens.access_token, range).await?,
            None => self.compare_ranges_payload(&tokens.access_token).await?,
        };

        let title = wrap_title(time_range, self.clock.now());
        let wrap = self.wraps.create(owner, payload, &title).await?;

        tracing::info!(
            owner,
            wrap_id = %wrap.id,
            time_range = time_range.map(|r| r.as_str()).unwrap_or("recent_vs_all_time"),
            "Wrap created"
        );

        Ok(wrap)
    }

    /// Live recent vs. all-time document, not persisted.
    pub async fn current_top_items(
        &self,
        tokens: Option<&TokenMaterial>,
    ) -> Result<WrapPayload, AppError> {
        let tokens = tokens.ok_or(AppError::NotAuthenticated)?;
        self.compare_ranges_payload(&tokens.access_token).await
    }

    async fn single_range_payload(
        &self,
        access_token: &str,
        range: TimeRange,
    ) -> Result<WrapPayload, AppError> {
        let (tracks, artists) = tokio::try_join!(
            self.top_items(access_token, ItemType::Tracks, range),
            self.top_items(access_token, ItemType::Artists, range),
        )?;

        Ok(WrapPayload {
            time_range: Some(range),
            top_tracks: self.with_previews(access_token, tracks).await,
            top_artists: artists,
            ..Default::default()
        })
    }

    async fn compare_ranges_payload(&self, access_token: &str) -> Result<WrapPayload, AppError> {
        let (tracks_recent, tracks_all_time, artists_recent, artists_all_time) = tokio::try_join!(
            self.top_items(access_token, ItemType::Tracks, TimeRange::ShortTerm),
            self.top_items(access_token, ItemType::Tracks, TimeRange::LongTerm),
            self.top_items(access_token, ItemType::Artists, TimeRange::ShortTerm),
            self.top_items(access_token, ItemType::Artists, TimeRange::LongTerm),
        )?;

        Ok(WrapPayload {
            top_tracks_recent: self.with_previews(access_token, tracks_recent).await,
            top_tracks_all_time: self.with_previews(access_token, tracks_all_time).await,
            top_artists_recent: artists_recent,
            top_artists_all_time: artists_all_time,
            ..Default::default()
        })
    }

    async fn top_items(
        &self,
        access_token: &str,
        item_type: ItemType,
        range: TimeRange,
    ) -> Result<Vec<Value>, AppError> {
        let page = self
            .spotify
            .fetch_top_items(access_token, item_type, range, self.item_limit)
            .await
            .map_err(|e| {
                tracing::warn!(
                    item_type = item_type.as_str(),
                    time_range = range.as_str(),
                    error = %e,
                    "Top items fetch failed, aborting wrap"
                );
                e
            })?;
        Ok(page.items)
    }

    /// Fill `preview_url` on tracks that lack one. Lookup failures leave
    /// the field null.
    async fn with_previews(&self, access_token: &str, tracks: Vec<Value>) -> Vec<Value> {
        if !self.enrich_previews {
            return tracks;
        }

        stream::iter(tracks)
            .map(|track| self.fill_preview(access_token, track))
            .buffered(MAX_CONCURRENT_PREVIEW_LOOKUPS)
            .collect()
            .await
    }

    async fn fill_preview(&self, access_token: &str, mut track: Value) -> Value {
        let has_preview = track
            .get("preview_url")
            .is_some_and(|url| url.is_string());
        let Some(track_id) = track.get("id").and_then(Value::as_str).map(str::to_string) else {
            return track;
        };
        if has_preview {
            return track;
        }

        let preview = match self
            .spotify
            .fetch_track_preview_url(&track_id, access_token)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(track_id = %track_id, error = %e, "Preview lookup failed");
                None
            }
        };

        if let Some(obj) = track.as_object_mut() {
            obj.insert(
                "preview_url".to_string(),
                preview.map(Value::String).unwrap_or(Value::Null),
            );
        }
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::Config;
    use crate::db::MemoryWrapRepository;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        server: MockServer,
        repo: Arc<MemoryWrapRepository>,
        service: WrapService,
    }

    async fn fixture() -> Fixture {
        let server = MockServer::start().await;
        let config = Config::test_default().with_provider_base(&server.uri());
        let clock = Arc::new(MockClock::new(
            Utc.with_ymd_and_hms(2024, 12, 1, 9, 0, 0).unwrap(),
        ));
        let repo = Arc::new(MemoryWrapRepository::with_clock(clock.clone()));
        let service = WrapService::new(
            SpotifyClient::new(&config).unwrap(),
            repo.clone(),
            clock,
            config.wrap_item_limit,
        );
        Fixture {
            server,
            repo,
            service,
        }
    }

    fn items(prefix: &str, n: usize) -> Value {
        let items: Vec<Value> = (0..n)
            .map(|i| json!({ "id": format!("{}{}", prefix, i), "preview_url": "https://p/x" }))
            .collect();
        json!({ "items": items, "total": n })
    }

    async fn mount_top(server: &MockServer, item_type: &str, range: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/me/top/{}", item_type)))
            .and(query_param("time_range", range))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_no_tokens_means_no_provider_calls() {
        let f = fixture().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&f.server)
            .await;

        let err = f
            .service
            .create_wrap("alice", None, Some(TimeRange::MediumTerm))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotAuthenticated));
        assert!(f.repo.list_by_owner("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_range_wrap() {
        let f = fixture().await;
        mount_top(&f.server, "tracks", "medium_term", items("t", 5)).await;
        mount_top(&f.server, "artists", "medium_term", items("a", 5)).await;

        let tokens = TokenMaterial::new("tok1");
        let wrap = f
            .service
            .create_wrap("alice", Some(&tokens), Some(TimeRange::MediumTerm))
            .await
            .unwrap();

        assert_eq!(wrap.wrap_data.top_tracks.len(), 5);
        assert_eq!(wrap.wrap_data.top_artists.len(), 5);
        assert_eq!(wrap.wrap_data.time_range, Some(TimeRange::MediumTerm));
        assert_eq!(wrap.title, "Wrap - medium_term - 2024-12-01");
        assert_eq!(f.repo.get_latest("alice").await.unwrap(), wrap);
    }

    #[tokio::test]
    async fn test_recent_vs_all_time_wrap() {
        let f = fixture().await;
        mount_top(&f.server, "tracks", "short_term", items("ts", 3)).await;
        mount_top(&f.server, "tracks", "long_term", items("tl", 4)).await;
        mount_top(&f.server, "artists", "short_term", items("as", 2)).await;
        mount_top(&f.server, "artists", "long_term", items("al", 1)).await;

        let tokens = TokenMaterial::new("tok1");
        let wrap = f
            .service
            .create_wrap("alice", Some(&tokens), None)
            .await
            .unwrap();

        let data = &wrap.wrap_data;
        assert_eq!(data.top_tracks_recent.len(), 3);
        assert_eq!(data.top_tracks_all_time.len(), 4);
        assert_eq!(data.top_artists_recent.len(), 2);
        assert_eq!(data.top_artists_all_time.len(), 1);
        assert_eq!(data.time_range, None);
        assert_eq!(wrap.title, "Wrap - 2024-12-01");
    }

    #[tokio::test]
    async fn test_artist_failure_persists_nothing() {
        let f = fixture().await;
        mount_top(&f.server, "tracks", "short_term", items("t", 5)).await;
        Mock::given(method("GET"))
            .and(path("/v1/me/top/artists"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&f.server)
            .await;

        let tokens = TokenMaterial::new("tok1");
        let err = f
            .service
            .create_wrap("alice", Some(&tokens), Some(TimeRange::ShortTerm))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ProviderApi(_)));
        assert!(f.repo.list_by_owner("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preview_enrichment_is_best_effort() {
        let f = fixture().await;
        mount_top(
            &f.server,
            "tracks",
            "long_term",
            json!({ "items": [
                {"id": "has", "preview_url": "https://p/has"},
                {"id": "found", "preview_url": null},
                {"id": "broken"},
            ]}),
        )
        .await;
        mount_top(&f.server, "artists", "long_term", items("a", 1)).await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/found"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "found", "preview_url": "https://p/found"})),
            )
            .mount(&f.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&f.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/has"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&f.server)
            .await;

        let tokens = TokenMaterial::new("tok1");
        let wrap = f
            .service
            .create_wrap("alice", Some(&tokens), Some(TimeRange::LongTerm))
            .await
            .expect("preview failures must not abort the wrap");

        let tracks = &wrap.wrap_data.top_tracks;
        assert_eq!(tracks[0]["preview_url"], "https://p/has");
        assert_eq!(tracks[1]["preview_url"], "https://p/found");
        assert_eq!(tracks[2]["preview_url"], Value::Null);
    }

    #[tokio::test]
    async fn test_current_top_items_does_not_persist() {
        let f = fixture().await;
        mount_top(&f.server, "tracks", "short_term", items("ts", 1)).await;
        mount_top(&f.server, "tracks", "long_term", items("tl", 1)).await;
        mount_top(&f.server, "artists", "short_term", items("as", 1)).await;
        mount_top(&f.server, "artists", "long_term", items("al", 1)).await;

        let tokens = TokenMaterial::new("tok1");
        let payload = f.service.current_top_items(Some(&tokens)).await.unwrap();

        assert_eq!(payload.top_tracks_recent.len(), 1);
        assert!(f.repo.list_by_owner("alice").await.unwrap().is_empty());
    }
}
