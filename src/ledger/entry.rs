//! Ledger Entries
//!
//! Immutable records of every karma mutation. Replaying a user's entries
//! in creation order reproduces their balance exactly; `balance_after`
//! is a cached checkpoint, not the source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Award,
    Deduct,
}

/// Closed set of reasons a balance can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KarmaReason {
    /// Validator cast a vote on a content item
    ContentValidation,
    /// Authored content that performed well
    OriginalContent,
    /// Likes, shares, and other engagement received
    PositiveEngagement,
    /// Reviewed a moderation ticket
    ModerationHelp,
    /// Content sealed as flagged or rejected by a reviewer
    MisinformationPenalty,
    /// Engagement determined to be artificial
    FakeEngagementPenalty,
    /// Platform campaign payout
    CampaignReward,
}

impl KarmaReason {
    pub fn description(&self) -> &'static str {
        match self {
            KarmaReason::ContentValidation => "Voted on content authenticity",
            KarmaReason::OriginalContent => "Published original content",
            KarmaReason::PositiveEngagement => "Received positive engagement",
            KarmaReason::ModerationHelp => "Helped review flagged content",
            KarmaReason::MisinformationPenalty => "Content found to be misinformation",
            KarmaReason::FakeEngagementPenalty => "Engagement found to be artificial",
            KarmaReason::CampaignReward => "Campaign participation reward",
        }
    }
}

/// A single karma mutation. Immutable once created, except for
/// `external_ref` which the sync worker fills in exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,

    /// Amount actually applied. For clipped deductions this is the
    /// clipped amount, not the requested one.
    pub amount: u64,
    pub direction: Direction,
    pub reason: KarmaReason,

    /// Account balance immediately after this entry was applied.
    pub balance_after: u64,

    /// Reference in the external immutable record store, attached later
    /// by the sync worker. Absent until (and unless) the sync lands.
    pub external_ref: Option<String>,

    /// Opaque collaborator context (content id, campaign id, ...).
    pub metadata: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        user_id: String,
        amount: u64,
        direction: Direction,
        reason: KarmaReason,
        balance_after: u64,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            amount,
            direction,
            reason,
            balance_after,
            external_ref: None,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Signed amount for replay arithmetic.
    pub fn signed_amount(&self) -> i64 {
        match self.direction {
            Direction::Award => self.amount as i64,
            Direction::Deduct => -(self.amount as i64),
        }
    }
}
