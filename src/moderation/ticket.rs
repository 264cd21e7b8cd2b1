//! Moderation Tickets
//!
//! One ticket per flagged content item, created when the automated
//! moderation collaborator's confidence lands in the manual-review band.
//! Terminal once reviewed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationTicket {
    pub id: String,
    pub content_id: String,
    /// Why the classifier flagged it.
    pub reason: String,
    /// Which signals fired (e.g. "nsfw-classifier", "spam-heuristic").
    pub source_flags: BTreeSet<String>,
    /// Classifier confidence, 0..=1.
    pub confidence: f64,
    pub status: TicketStatus,
    pub reviewer_id: Option<String>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ModerationTicket {
    pub fn new(
        content_id: String,
        reason: String,
        source_flags: BTreeSet<String>,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content_id,
            reason,
            source_flags,
            confidence,
            status: TicketStatus::Pending,
            reviewer_id: None,
            review_notes: None,
            created_at: Utc::now(),
            reviewed_at: None,
        }
    }
}
