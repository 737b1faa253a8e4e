// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wrap snapshot model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Spotify's listening windows for top items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum TimeRange {
    /// Roughly the last four weeks
    ShortTerm,
    /// Roughly the last six months
    MediumTerm,
    /// Several years of history
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short_term" => Ok(TimeRange::ShortTerm),
            "medium_term" => Ok(TimeRange::MediumTerm),
            "long_term" => Ok(TimeRange::LongTerm),
            other => Err(format!("Invalid time range: {}", other)),
        }
    }
}

/// Kind of top item requested from `/me/top/{type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Tracks,
    Artists,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Tracks => "tracks",
            ItemType::Artists => "artists",
        }
    }
}

/// Snapshot document stored with each wrap.
///
/// Every list defaults to empty when absent, so old or partial documents
/// read back without special handling. Keys this schema does not know
/// about are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,

    // ─── Single-range wraps ──────────────────────────────────────
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_tracks: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_artists: Vec<Value>,

    // ─── Recent vs. all-time wraps ───────────────────────────────
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_tracks_recent: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_tracks_all_time: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_artists_recent: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_artists_all_time: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WrapPayload {
    /// Decode a stored document. A list may also arrive as a provider page
    /// (`{"items": [...]}`); anything else that is not a list reads as empty.
    pub fn from_document(document: Value) -> Self {
        let Value::Object(mut map) = document else {
            return Self::default();
        };

        let mut take_list = |key: &str| match map.remove(key) {
            Some(Value::Array(items)) => items,
            Some(Value::Object(mut page)) => match page.remove("items") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        let top_tracks = take_list("topTracks");
        let top_artists = take_list("topArtists");
        let top_tracks_recent = take_list("topTracksRecent");
        let top_tracks_all_time = take_list("topTracksAllTime");
        let top_artists_recent = take_list("topArtistsRecent");
        let top_artists_all_time = take_list("topArtistsAllTime");

        let time_range = map
            .remove("timeRange")
            .and_then(|v| v.as_str().and_then(|s| s.parse().ok()));

        Self {
            time_range,
            top_tracks,
            top_artists,
            top_tracks_recent,
            top_tracks_all_time,
            top_artists_recent,
            top_artists_all_time,
            extra: map,
        }
    }
}

/// Persisted wrap record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wrap {
    /// Opaque identifier (UUID v4), assigned at creation
    pub id: String,
    /// Owning user ID
    pub owner: String,
    /// Creation time
    pub date_generated: DateTime<Utc>,
    /// Display title, fixed at creation
    pub title: String,
    /// Captured provider data
    pub wrap_data: WrapPayload,
}

impl Wrap {
    pub fn summary(&self) -> WrapSummary {
        WrapSummary {
            id: self.id.clone(),
            date_generated: crate::time_utils::format_utc_rfc3339(self.date_generated),
            title: self.title.clone(),
        }
    }
}

/// Listing entry (no payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WrapSummary {
    pub id: String,
    /// ISO 8601
    pub date_generated: String,
    pub title: String,
}

/// Build a wrap title: `Wrap - <range> - YYYY-MM-DD` or `Wrap - YYYY-MM-DD`.
pub fn wrap_title(time_range: Option<TimeRange>, created: DateTime<Utc>) -> String {
    let date = crate::time_utils::format_title_date(created);
    match time_range {
        Some(range) => format!("Wrap - {} - {}", range, date),
        None => format!("Wrap - {}", date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_time_range_parse() {
        assert_eq!("short_term".parse::<TimeRange>(), Ok(TimeRange::ShortTerm));
        assert_eq!("long_term".parse::<TimeRange>(), Ok(TimeRange::LongTerm));
        assert!("forever".parse::<TimeRange>().is_err());
        assert_eq!(TimeRange::MediumTerm.to_string(), "medium_term");
    }

    #[test]
    fn test_payload_missing_keys_default_to_empty() {
        let payload: WrapPayload = serde_json::from_value(json!({})).unwrap();
        assert!(payload.top_tracks.is_empty());
        assert!(payload.top_artists_all_time.is_empty());
        assert_eq!(payload.time_range, None);
    }

    #[test]
    fn test_payload_from_document_tolerates_bad_shapes() {
        let payload = WrapPayload::from_document(json!({
            "topTracks": null,
            "topArtists": {"items": [{"id": "a1"}], "total": 1},
            "topArtistsRecent": {"href": "no items"},
            "topTracksRecent": [{"id": "t1"}],
            "timeRange": "bogus",
            "note": "kept"
        }));

        assert!(payload.top_tracks.is_empty());
        assert_eq!(payload.top_artists.len(), 1);
        assert!(payload.top_artists_recent.is_empty());
        assert_eq!(payload.top_tracks_recent.len(), 1);
        assert_eq!(payload.time_range, None);
        assert_eq!(payload.extra.get("note"), Some(&json!("kept")));
    }

    #[test]
    fn test_payload_from_non_object() {
        assert_eq!(WrapPayload::from_document(json!([1, 2])), WrapPayload::default());
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let payload = WrapPayload {
            time_range: Some(TimeRange::MediumTerm),
            top_tracks: vec![json!({"id": "t1"})],
            ..Default::default()
        };
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["timeRange"], "medium_term");
        assert_eq!(value["topTracks"][0]["id"], "t1");
        assert!(value.get("topArtistsRecent").is_none());
    }

    #[test]
    fn test_wrap_title() {
        let created = Utc.with_ymd_and_hms(2024, 12, 1, 23, 59, 0).unwrap();
        assert_eq!(
            wrap_title(Some(TimeRange::LongTerm), created),
            "Wrap - long_term - 2024-12-01"
        );
        assert_eq!(wrap_title(None, created), "Wrap - 2024-12-01");
    }
}
