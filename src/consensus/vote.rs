//! Validation Votes
//!
//! One vote per (content, validator) pair, immutable once cast. The log
//! enforces uniqueness at insert so the check and the write share one
//! critical section.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// A validator's verdict on a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Authentic,
    Fake,
    Uncertain,
}

impl Verdict {
    /// Tie-break priority when two verdicts share the top count:
    /// Authentic over Fake over Uncertain.
    pub fn tie_break_rank(&self) -> u8 {
        match self {
            Verdict::Authentic => 2,
            Verdict::Fake => 1,
            Verdict::Uncertain => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub content_id: String,
    pub validator_id: String,
    pub verdict: Verdict,
    /// Validator's self-reported confidence, 0..=1.
    pub confidence: f64,
    pub notes: Option<String>,
    /// Reference in the external record store, attached by the sync
    /// worker once the recording lands.
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(
        content_id: String,
        validator_id: String,
        verdict: Verdict,
        confidence: f64,
        notes: Option<String>,
    ) -> EngineResult<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(EngineError::InvalidInput(format!(
                "confidence must be in 0..=1, got {confidence}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            content_id,
            validator_id,
            verdict,
            confidence,
            notes,
            external_ref: None,
            created_at: Utc::now(),
        })
    }
}

/// Votes indexed by content item.
#[derive(Default)]
pub struct VoteLog {
    votes: RwLock<HashMap<String, Vec<Vote>>>,
}

impl VoteLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vote, rejecting a second vote by the same validator on
    /// the same item. Uniqueness check and insert run under one guard.
    pub async fn try_insert(&self, vote: Vote) -> EngineResult<Vote> {
        let mut votes = self.votes.write().await;
        let content_votes = votes.entry(vote.content_id.clone()).or_default();

        if content_votes
            .iter()
            .any(|v| v.validator_id == vote.validator_id)
        {
            return Err(EngineError::duplicate_vote(
                &vote.content_id,
                &vote.validator_id,
            ));
        }

        content_votes.push(vote.clone());
        Ok(vote)
    }

    pub async fn votes_for(&self, content_id: &str) -> Vec<Vote> {
        let votes = self.votes.read().await;
        votes.get(content_id).cloned().unwrap_or_default()
    }

    /// Attach an external reference to a recorded vote; a vote that
    /// already carries one is left untouched.
    pub async fn attach_external_ref(
        &self,
        content_id: &str,
        vote_id: &str,
        reference: String,
    ) -> bool {
        let mut votes = self.votes.write().await;
        let Some(content_votes) = votes.get_mut(content_id) else {
            return false;
        };
        match content_votes.iter_mut().find(|v| v.id == vote_id) {
            Some(vote) if vote.external_ref.is_none() => {
                vote.external_ref = Some(reference);
                true
            }
            _ => false,
        }
    }

    pub async fn vote(&self, content_id: &str, vote_id: &str) -> Option<Vote> {
        let votes = self.votes.read().await;
        votes
            .get(content_id)?
            .iter()
            .find(|v| v.id == vote_id)
            .cloned()
    }

    /// Votes still waiting for an external reference.
    pub async fn pending_sync_votes(&self) -> Vec<Vote> {
        let votes = self.votes.read().await;
        votes
            .values()
            .flatten()
            .filter(|v| v.external_ref.is_none())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_range_validated() {
        assert!(Vote::new("c1".into(), "u1".into(), Verdict::Authentic, 1.1, None).is_err());
        assert!(Vote::new("c1".into(), "u1".into(), Verdict::Authentic, -0.1, None).is_err());
        assert!(Vote::new("c1".into(), "u1".into(), Verdict::Authentic, 0.9, None).is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_vote_rejected() {
        let log = VoteLog::new();
        let vote = Vote::new("c1".into(), "u1".into(), Verdict::Authentic, 0.8, None).unwrap();
        log.try_insert(vote).await.unwrap();

        let second = Vote::new("c1".into(), "u1".into(), Verdict::Fake, 0.5, None).unwrap();
        let err = log.try_insert(second).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_same_validator_different_content_allowed() {
        let log = VoteLog::new();
        let first = Vote::new("c1".into(), "u1".into(), Verdict::Authentic, 0.8, None).unwrap();
        let second = Vote::new("c2".into(), "u1".into(), Verdict::Fake, 0.8, None).unwrap();
        log.try_insert(first).await.unwrap();
        log.try_insert(second).await.unwrap();

        assert_eq!(log.votes_for("c1").await.len(), 1);
        assert_eq!(log.votes_for("c2").await.len(), 1);
    }

    #[tokio::test]
    async fn test_attach_external_ref_once() {
        let log = VoteLog::new();
        let vote = Vote::new("c1".into(), "u1".into(), Verdict::Authentic, 0.8, None).unwrap();
        let vote = log.try_insert(vote).await.unwrap();

        assert!(log.attach_external_ref("c1", &vote.id, "ref_a".into()).await);
        assert!(!log.attach_external_ref("c1", &vote.id, "ref_b".into()).await);
        let stored = log.vote("c1", &vote.id).await.unwrap();
        assert_eq!(stored.external_ref.as_deref(), Some("ref_a"));
    }

    #[test]
    fn test_tie_break_order() {
        assert!(Verdict::Authentic.tie_break_rank() > Verdict::Fake.tie_break_rank());
        assert!(Verdict::Fake.tie_break_rank() > Verdict::Uncertain.tie_break_rank());
    }
}
