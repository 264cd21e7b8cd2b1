//! Validation Consensus Engine
//!
//! Collects independent verdicts on a content item and seals a final
//! verdict exactly once when quorum and agreement are met. The pure
//! tally is separate from the one-time transition; the transition is
//! guarded by the content store's write lock, so re-querying a sealed
//! item never repeats a karma mutation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::config::{ConsensusConfig, RewardConfig};
use crate::consensus::{Verdict, Vote, VoteLog};
use crate::content::{ContentStatus, ContentStore};
use crate::error::{EngineError, EngineResult};
use crate::ledger::{KarmaLedger, KarmaReason};
use crate::sync::SyncJob;

/// Result of a consensus evaluation. Cached on the content item once the
/// item seals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusSnapshot {
    pub reached: bool,
    /// The sealed verdict; `None` while the item is short of quorum or
    /// agreement.
    pub final_verdict: Option<Verdict>,
    pub count: usize,
    /// Share of votes behind the leading verdict, 0..=100.
    pub agreement_pct: f64,
    pub per_verdict_counts: HashMap<Verdict, usize>,
}

pub struct ValidationConsensus {
    ledger: Arc<KarmaLedger>,
    content: Arc<ContentStore>,
    votes: Arc<VoteLog>,
    config: ConsensusConfig,
    rewards: RewardConfig,
    sync_tx: Option<UnboundedSender<SyncJob>>,
}

impl ValidationConsensus {
    pub fn new(
        ledger: Arc<KarmaLedger>,
        content: Arc<ContentStore>,
        votes: Arc<VoteLog>,
        config: ConsensusConfig,
        rewards: RewardConfig,
        sync_tx: Option<UnboundedSender<SyncJob>>,
    ) -> Self {
        Self {
            ledger,
            content,
            votes,
            config,
            rewards,
            sync_tx,
        }
    }

    /// Cast a vote on a content item.
    ///
    /// Gates, in order: validator league, content existence,
    /// self-validation, duplicate vote. On success the validator earns
    /// the fixed participation reward, the consensus check runs, and the
    /// vote is scheduled for external recording.
    pub async fn submit_vote(
        &self,
        validator_id: &str,
        content_id: &str,
        verdict: Verdict,
        confidence: f64,
        notes: Option<String>,
    ) -> EngineResult<Vote> {
        let league = self.ledger.league_of(validator_id).await?;
        if league < self.config.min_validator_league {
            return Err(EngineError::InsufficientPrivilege(format!(
                "validating content requires {} league, {validator_id} is {league}",
                self.config.min_validator_league
            )));
        }

        let item = self.content.get(content_id).await?;
        if item.author_id == validator_id {
            return Err(EngineError::self_validation(content_id));
        }

        let vote = Vote::new(
            content_id.to_string(),
            validator_id.to_string(),
            verdict,
            confidence,
            notes,
        )?;
        let vote = self.votes.try_insert(vote).await?;

        info!(
            content_id = %content_id,
            validator_id = %validator_id,
            verdict = ?verdict,
            confidence = confidence,
            "Validation vote recorded"
        );

        self.ledger
            .award(
                validator_id,
                self.rewards.validation_vote_reward,
                KarmaReason::ContentValidation,
                serde_json::json!({ "content_id": content_id, "vote_id": vote.id }),
            )
            .await?;

        self.evaluate(content_id).await?;
        self.schedule_vote_sync(&vote);

        Ok(vote)
    }

    /// Consensus state for a content item. Sealed items return the
    /// cached snapshot with no side effects; unsealed items are tallied
    /// and, when quorum and agreement are met, sealed exactly once.
    pub async fn evaluate(&self, content_id: &str) -> EngineResult<ConsensusSnapshot> {
        let item = self.content.get(content_id).await?;
        if let Some(cached) = item.consensus {
            debug!(content_id = %content_id, "Returning cached consensus");
            return Ok(cached);
        }

        let votes = self.votes.votes_for(content_id).await;
        let snapshot = tally(&votes, &self.config);
        if !snapshot.reached {
            return Ok(snapshot);
        }

        let verdict = snapshot
            .final_verdict
            .ok_or_else(|| EngineError::Internal("reached consensus without verdict".into()))?;
        let new_status = match verdict {
            Verdict::Authentic => Some(ContentStatus::Verified),
            Verdict::Fake => Some(ContentStatus::Flagged),
            Verdict::Uncertain => None,
        };

        let sealed = self
            .content
            .seal_if_pending(content_id, snapshot.clone(), new_status, snapshot.count)
            .await?;
        if sealed {
            self.apply_seal_consequences(content_id, verdict, &votes, &item.author_id)
                .await;
        }

        Ok(snapshot)
    }

    /// Karma consequences of a fresh seal. Failures here are logged, not
    /// propagated: the seal itself has already committed.
    async fn apply_seal_consequences(
        &self,
        content_id: &str,
        verdict: Verdict,
        votes: &[Vote],
        author_id: &str,
    ) {
        if verdict == Verdict::Fake {
            let result = self
                .ledger
                .deduct(
                    author_id,
                    self.rewards.misinformation_penalty,
                    KarmaReason::MisinformationPenalty,
                    serde_json::json!({ "content_id": content_id }),
                )
                .await;
            if let Err(e) = result {
                warn!(content_id = %content_id, author_id = %author_id, error = %e,
                    "Could not apply misinformation penalty");
            }
        }

        // Bonus goes to every participant, whichever way they voted.
        for vote in votes {
            let result = self
                .ledger
                .award(
                    &vote.validator_id,
                    self.rewards.consensus_bonus,
                    KarmaReason::ContentValidation,
                    serde_json::json!({ "content_id": content_id, "consensus_bonus": true }),
                )
                .await;
            if let Err(e) = result {
                warn!(content_id = %content_id, validator_id = %vote.validator_id, error = %e,
                    "Could not award consensus bonus");
            }
        }

        info!(
            content_id = %content_id,
            verdict = ?verdict,
            participants = votes.len(),
            "Consensus seal consequences applied"
        );
    }

    fn schedule_vote_sync(&self, vote: &Vote) {
        let Some(tx) = &self.sync_tx else {
            debug!(vote_id = %vote.id, "No sync channel; vote stays local");
            return;
        };
        if tx.send(SyncJob::vote_record(vote)).is_err() {
            warn!(vote_id = %vote.id, "Sync worker gone; vote stays without external ref");
        }
    }
}

/// Pure tally of the current votes against quorum and agreement rules.
fn tally(votes: &[Vote], config: &ConsensusConfig) -> ConsensusSnapshot {
    let mut per_verdict_counts: HashMap<Verdict, usize> = HashMap::new();
    for vote in votes {
        *per_verdict_counts.entry(vote.verdict).or_insert(0) += 1;
    }

    let total = votes.len();
    let leader = per_verdict_counts
        .iter()
        .max_by_key(|(verdict, count)| (**count, verdict.tie_break_rank()))
        .map(|(verdict, count)| (*verdict, *count));

    let agreement_pct = match (total, leader) {
        (0, _) | (_, None) => 0.0,
        (_, Some((_, max))) => max as f64 / total as f64 * 100.0,
    };

    if total < config.min_quorum {
        return ConsensusSnapshot {
            reached: false,
            final_verdict: None,
            count: total,
            agreement_pct,
            per_verdict_counts,
        };
    }

    let (verdict, max) = leader.expect("quorum met implies at least one vote");
    let reached = max as f64 / total as f64 >= config.agreement_threshold;

    ConsensusSnapshot {
        reached,
        final_verdict: reached.then_some(verdict),
        count: total,
        agreement_pct,
        per_verdict_counts,
    }
}
