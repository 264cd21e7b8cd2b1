//! Moderation Review Queue
//!
//! FIFO queue of AI-flagged content awaiting a human verdict from
//! privileged reviewers. Approve returns the content to the normal
//! validation flow; reject is terminal. Both feed karma consequences
//! back through the ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{ModerationConfig, RewardConfig};
use crate::content::{ContentStore, ContentTransition};
use crate::error::{EngineError, EngineResult};
use crate::ledger::{KarmaLedger, KarmaReason};
use crate::moderation::{ModerationTicket, ReviewDecision, TicketStatus};

/// Reviewer activity summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerStats {
    pub reviewer_id: String,
    pub total_reviewed: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Cumulative karma earned from moderation rewards.
    pub karma_earned: u64,
}

pub struct ModerationQueue {
    ledger: Arc<KarmaLedger>,
    content: Arc<ContentStore>,
    /// Insertion order is review order.
    tickets: RwLock<Vec<ModerationTicket>>,
    config: ModerationConfig,
    rewards: RewardConfig,
}

impl ModerationQueue {
    pub fn new(
        ledger: Arc<KarmaLedger>,
        content: Arc<ContentStore>,
        config: ModerationConfig,
        rewards: RewardConfig,
    ) -> Self {
        Self {
            ledger,
            content,
            tickets: RwLock::new(Vec::new()),
            config,
            rewards,
        }
    }

    /// Create a ticket for flagged content. Called by the external
    /// moderation collaborator; one open ticket per content item.
    pub async fn enqueue(
        &self,
        content_id: &str,
        reason: &str,
        source_flags: BTreeSet<String>,
        confidence: f64,
    ) -> EngineResult<ModerationTicket> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(EngineError::InvalidInput(format!(
                "confidence must be in 0..=1, got {confidence}"
            )));
        }
        self.content.get(content_id).await?;

        let mut tickets = self.tickets.write().await;
        if tickets
            .iter()
            .any(|t| t.content_id == content_id && t.status == TicketStatus::Pending)
        {
            return Err(EngineError::Conflict(format!(
                "content {content_id} already has an open moderation ticket"
            )));
        }

        let ticket = ModerationTicket::new(
            content_id.to_string(),
            reason.to_string(),
            source_flags,
            confidence,
        );
        tickets.push(ticket.clone());

        info!(
            ticket_id = %ticket.id,
            content_id = %content_id,
            confidence = confidence,
            "Moderation ticket enqueued"
        );
        Ok(ticket)
    }

    /// Pending tickets, oldest first. Reviewer-gated.
    pub async fn list_queue(
        &self,
        reviewer_id: &str,
        page: usize,
    ) -> EngineResult<(Vec<ModerationTicket>, usize)> {
        self.require_reviewer(reviewer_id).await?;

        let tickets = self.tickets.read().await;
        let pending: Vec<ModerationTicket> = tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Pending)
            .cloned()
            .collect();
        let total = pending.len();

        let page_tickets = pending
            .into_iter()
            .skip(page.saturating_mul(self.config.page_size))
            .take(self.config.page_size)
            .collect();
        Ok((page_tickets, total))
    }

    /// Review a ticket. The status check and the terminal transition
    /// share one write guard, so a second reviewer racing on the same
    /// ticket gets `Conflict`.
    pub async fn review(
        &self,
        reviewer_id: &str,
        ticket_id: &str,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> EngineResult<ModerationTicket> {
        self.require_reviewer(reviewer_id).await?;

        let ticket = {
            let mut tickets = self.tickets.write().await;
            let ticket = tickets
                .iter_mut()
                .find(|t| t.id == ticket_id)
                .ok_or_else(|| EngineError::ticket_not_found(ticket_id))?;

            if ticket.status != TicketStatus::Pending {
                return Err(EngineError::already_reviewed(ticket_id));
            }

            ticket.status = match decision {
                ReviewDecision::Approve => TicketStatus::Approved,
                ReviewDecision::Reject => TicketStatus::Rejected,
            };
            ticket.reviewer_id = Some(reviewer_id.to_string());
            ticket.review_notes = notes;
            ticket.reviewed_at = Some(chrono::Utc::now());
            ticket.clone()
        };

        let content = self.content.get(&ticket.content_id).await?;
        match decision {
            ReviewDecision::Approve => {
                self.content
                    .apply_moderation(&ticket.content_id, ContentTransition::ReenterValidation)
                    .await?;
                self.ledger
                    .award(
                        reviewer_id,
                        self.rewards.moderation_approve_reward,
                        KarmaReason::ModerationHelp,
                        serde_json::json!({ "ticket_id": ticket.id }),
                    )
                    .await?;
            }
            ReviewDecision::Reject => {
                self.content
                    .apply_moderation(&ticket.content_id, ContentTransition::Reject)
                    .await?;
                self.ledger
                    .award(
                        reviewer_id,
                        self.rewards.moderation_reject_reward,
                        KarmaReason::ModerationHelp,
                        serde_json::json!({ "ticket_id": ticket.id }),
                    )
                    .await?;
                let penalty = self
                    .ledger
                    .deduct(
                        &content.author_id,
                        self.rewards.author_rejection_penalty,
                        KarmaReason::MisinformationPenalty,
                        serde_json::json!({ "ticket_id": ticket.id, "content_id": ticket.content_id }),
                    )
                    .await;
                if let Err(e) = penalty {
                    warn!(
                        ticket_id = %ticket.id,
                        author_id = %content.author_id,
                        error = %e,
                        "Could not apply author rejection penalty"
                    );
                }
            }
        }

        info!(
            ticket_id = %ticket.id,
            reviewer_id = %reviewer_id,
            decision = ?decision,
            "Moderation ticket reviewed"
        );
        Ok(ticket)
    }

    /// Aggregate review counts and moderation karma for a reviewer.
    pub async fn stats(&self, reviewer_id: &str) -> EngineResult<ReviewerStats> {
        self.require_reviewer(reviewer_id).await?;

        let tickets = self.tickets.read().await;
        let mine: Vec<&ModerationTicket> = tickets
            .iter()
            .filter(|t| t.reviewer_id.as_deref() == Some(reviewer_id))
            .collect();
        let approved = mine
            .iter()
            .filter(|t| t.status == TicketStatus::Approved)
            .count();
        let rejected = mine
            .iter()
            .filter(|t| t.status == TicketStatus::Rejected)
            .count();
        drop(tickets);

        let karma_earned = self
            .ledger
            .sum_awards(reviewer_id, KarmaReason::ModerationHelp)
            .await;

        Ok(ReviewerStats {
            reviewer_id: reviewer_id.to_string(),
            total_reviewed: approved + rejected,
            approved,
            rejected,
            karma_earned,
        })
    }

    pub async fn ticket(&self, ticket_id: &str) -> EngineResult<ModerationTicket> {
        let tickets = self.tickets.read().await;
        tickets
            .iter()
            .find(|t| t.id == ticket_id)
            .cloned()
            .ok_or_else(|| EngineError::ticket_not_found(ticket_id))
    }

    async fn require_reviewer(&self, reviewer_id: &str) -> EngineResult<()> {
        let league = self.ledger.league_of(reviewer_id).await?;
        if league < self.config.min_reviewer_league {
            return Err(EngineError::InsufficientPrivilege(format!(
                "moderation review requires {} league, {reviewer_id} is {league}",
                self.config.min_reviewer_league
            )));
        }
        Ok(())
    }
}
