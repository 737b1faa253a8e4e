// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed wrap repository.
//!
//! Documents live in the `wraps` collection keyed by wrap ID. The payload is
//! stored as JSON text so arbitrary provider documents round-trip exactly.
//! Reads always filter on `owner` together with `id`.

use crate::clock::{default_clock, Clock};
use crate::db::{collections, wrap_not_found, WrapRepository};
use crate::error::AppError;
use crate::models::{Wrap, WrapPayload, WrapSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Newest first; equal timestamps put the later insert first.
const NEWEST_FIRST: [(&str, firestore::FirestoreQueryDirection); 2] = [
    ("date_generated", firestore::FirestoreQueryDirection::Descending),
    ("insert_seq", firestore::FirestoreQueryDirection::Descending),
];

static LAST_INSERT_SEQ: AtomicI64 = AtomicI64::new(0);

/// Insert sequence for a new document: wall-clock nanoseconds, bumped past
/// the previous value so inserts from this process never tie.
fn next_insert_seq() -> i64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let prev = LAST_INSERT_SEQ
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or_else(|last| last);
    now.max(prev.saturating_add(1))
}

/// Stored wrap document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WrapDocument {
    id: String,
    owner: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    date_generated: DateTime<Utc>,
    /// Tie-break for equal `date_generated`; later inserts are larger.
    /// Documents written without it read as 0.
    #[serde(default)]
    insert_seq: i64,
    title: String,
    /// Serialized `WrapPayload`
    wrap_data: String,
}

impl WrapDocument {
    fn from_wrap(wrap: &Wrap) -> Result<Self, AppError> {
        Ok(Self {
            id: wrap.id.clone(),
            owner: wrap.owner.clone(),
            date_generated: wrap.date_generated,
            insert_seq: next_insert_seq(),
            title: wrap.title.clone(),
            wrap_data: serde_json::to_string(&wrap.wrap_data)
                .map_err(|e| AppError::Internal(e.into()))?,
        })
    }

    fn into_wrap(self) -> Wrap {
        // Unparseable payloads read back as empty rather than failing the request
        let document = serde_json::from_str(&self.wrap_data).unwrap_or_else(|e| {
            tracing::warn!(wrap_id = %self.id, error = %e, "Stored wrap payload is not valid JSON");
            serde_json::Value::Null
        });

        Wrap {
            id: self.id,
            owner: self.owner,
            date_generated: self.date_generated,
            title: self.title,
            wrap_data: WrapPayload::from_document(document),
        }
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    clock: Arc<dyn Clock>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            clock: default_clock(),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            clock: default_clock(),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            clock: default_clock(),
        }
    }

    /// Use a different time source for creation timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// All of an owner's wrap documents, newest first.
    async fn owner_documents(&self, owner: &str) -> Result<Vec<WrapDocument>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::WRAPS)
            .filter(|q| q.for_all([q.field("owner").eq(owner)]))
            .order_by(NEWEST_FIRST)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The owner's document with this ID, matched on both fields in one query.
    async fn owned_document(&self, owner: &str, id: &str) -> Result<WrapDocument, AppError> {
        let docs: Vec<WrapDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WRAPS)
            .filter(|q| q.for_all([q.field("owner").eq(owner), q.field("id").eq(id)]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        docs.into_iter().next().ok_or_else(wrap_not_found)
    }

    async fn delete_document(&self, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::WRAPS)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl WrapRepository for FirestoreDb {
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
        let document = WrapDocument::from_wrap(&wrap)?;

        let _: WrapDocument = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::WRAPS)
            .document_id(&wrap.id)
            .object(&document)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(wrap)
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<WrapSummary>, AppError> {
        Ok(self
            .owner_documents(owner)
            .await?
            .into_iter()
            .map(|doc| WrapSummary {
                id: doc.id,
                date_generated: crate::time_utils::format_utc_rfc3339(doc.date_generated),
                title: doc.title,
            })
            .collect())
    }

    async fn get_by_id(&self, owner: &str, id: &str) -> Result<Wrap, AppError> {
        Ok(self.owned_document(owner, id).await?.into_wrap())
    }

    async fn get_latest(&self, owner: &str) -> Result<Wrap, AppError> {
        let docs: Vec<WrapDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WRAPS)
            .filter(|q| q.for_all([q.field("owner").eq(owner)]))
            .order_by(NEWEST_FIRST)
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        docs.into_iter()
            .next()
            .map(WrapDocument::into_wrap)
            .ok_or_else(wrap_not_found)
    }

    async fn delete_by_id(&self, owner: &str, id: &str) -> Result<(), AppError> {
        let doc = self.owned_document(owner, id).await?;
        self.delete_document(&doc.id).await
    }

    async fn delete_all_for_owner(&self, owner: &str) -> Result<usize, AppError> {
        let ids: Vec<String> = self
            .owner_documents(owner)
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        let count = ids.len();

        stream::iter(ids)
            .map(|id| async move { self.delete_document(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        tracing::info!(owner, count, "Deleted all wraps for owner");
        Ok(count)
    }
}
