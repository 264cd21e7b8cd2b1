//! Content Registry
//!
//! Tracks the validation status of every content item the engine knows
//! about. The two status-transition entry points (consensus seal,
//! moderation decision) both run inside the store's write guard, so the
//! validation and moderation pipelines serialize on a given item and can
//! never apply conflicting transitions concurrently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::consensus::ConsensusSnapshot;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    /// Awaiting validation
    Pending,
    /// Sealed authentic by consensus
    Verified,
    /// Sealed fake by consensus
    Flagged,
    /// Rejected by a moderation reviewer (terminal)
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub author_id: String,
    pub validation_status: ContentStatus,
    /// Vote count persisted at sealing time.
    pub validation_count: usize,
    /// Sealed consensus result; present exactly when the item has been
    /// sealed and not since returned to validation.
    pub consensus: Option<ConsensusSnapshot>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a moderation decision applied to the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTransition {
    /// Back to Pending; any sealed snapshot is cleared.
    ReenterValidation,
    /// Terminal rejection.
    Reject,
}

#[derive(Default)]
pub struct ContentStore {
    items: RwLock<HashMap<String, ContentItem>>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a content item; idempotent for the same id.
    pub async fn register(&self, content_id: &str, author_id: &str) -> ContentItem {
        let mut items = self.items.write().await;
        if let Some(existing) = items.get(content_id) {
            return existing.clone();
        }

        let item = ContentItem {
            id: content_id.to_string(),
            author_id: author_id.to_string(),
            validation_status: ContentStatus::Pending,
            validation_count: 0,
            consensus: None,
            created_at: Utc::now(),
        };
        items.insert(content_id.to_string(), item.clone());
        item
    }

    pub async fn get(&self, content_id: &str) -> EngineResult<ContentItem> {
        let items = self.items.read().await;
        items
            .get(content_id)
            .cloned()
            .ok_or_else(|| EngineError::content_not_found(content_id))
    }

    /// Seal the item with a reached consensus, if and only if it has not
    /// been sealed already and is still awaiting validation. Returns
    /// whether this call performed the seal — side effects (penalties,
    /// bonuses) may fire only when it did.
    pub async fn seal_if_pending(
        &self,
        content_id: &str,
        snapshot: ConsensusSnapshot,
        new_status: Option<ContentStatus>,
        vote_count: usize,
    ) -> EngineResult<bool> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(content_id)
            .ok_or_else(|| EngineError::content_not_found(content_id))?;

        if item.consensus.is_some() || item.validation_status != ContentStatus::Pending {
            return Ok(false);
        }

        if let Some(status) = new_status {
            item.validation_status = status;
        }
        item.validation_count = vote_count;
        item.consensus = Some(snapshot);

        info!(
            content_id = %content_id,
            status = ?item.validation_status,
            votes = vote_count,
            "Content sealed by consensus"
        );
        Ok(true)
    }

    /// Apply a moderation decision. Approve returns the item to
    /// validation (clearing any sealed snapshot); reject is terminal.
    pub async fn apply_moderation(
        &self,
        content_id: &str,
        transition: ContentTransition,
    ) -> EngineResult<ContentStatus> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(content_id)
            .ok_or_else(|| EngineError::content_not_found(content_id))?;

        match transition {
            ContentTransition::ReenterValidation => {
                item.validation_status = ContentStatus::Pending;
                item.consensus = None;
            }
            ContentTransition::Reject => {
                item.validation_status = ContentStatus::Rejected;
            }
        }

        info!(
            content_id = %content_id,
            status = ?item.validation_status,
            "Moderation decision applied to content"
        );
        Ok(item.validation_status)
    }
}
