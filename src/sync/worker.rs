//! External Record Sync Worker
//!
//! Detached task fed over a channel. Sync runs after the primary
//! transaction commits and never blocks or fails the caller: failures
//! are retried with bounded exponential backoff, then logged and
//! abandoned. Abandoned records stay without an external reference and
//! can be re-enqueued with `resync_pending`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::consensus::VoteLog;
use crate::ledger::KarmaLedger;
use crate::sync::{RecordPayload, RecordStore};

/// The engine-side record a job confirms back into.
#[derive(Debug, Clone)]
pub enum SyncTarget {
    LedgerEntry { entry_id: String },
    Vote { content_id: String, vote_id: String },
}

#[derive(Debug, Clone)]
pub struct SyncJob {
    pub target: SyncTarget,
    pub payload: RecordPayload,
    pub attempt: u32,
}

impl SyncJob {
    pub fn new(target: SyncTarget, payload: RecordPayload) -> Self {
        Self {
            target,
            payload,
            attempt: 0,
        }
    }

    pub fn ledger_entry(entry: &crate::ledger::LedgerEntry) -> Self {
        Self::new(
            SyncTarget::LedgerEntry {
                entry_id: entry.id.clone(),
            },
            RecordPayload {
                kind: "ledger_entry".to_string(),
                record_id: entry.id.clone(),
                body: serde_json::json!({
                    "user_id": entry.user_id,
                    "amount": entry.amount,
                    "direction": entry.direction,
                    "reason": entry.reason,
                    "balance_after": entry.balance_after,
                    "created_at": entry.created_at,
                }),
            },
        )
    }

    pub fn vote_record(vote: &crate::consensus::Vote) -> Self {
        Self::new(
            SyncTarget::Vote {
                content_id: vote.content_id.clone(),
                vote_id: vote.id.clone(),
            },
            RecordPayload {
                kind: "validation_vote".to_string(),
                record_id: vote.id.clone(),
                body: serde_json::json!({
                    "content_id": vote.content_id,
                    "validator_id": vote.validator_id,
                    "verdict": vote.verdict,
                    "confidence": vote.confidence,
                    "created_at": vote.created_at,
                }),
            },
        )
    }
}

/// Spawn the sync worker and return its job channel.
pub fn spawn_sync_worker(
    recorder: Arc<dyn RecordStore>,
    ledger: Arc<KarmaLedger>,
    votes: Arc<VoteLog>,
    config: SyncConfig,
) -> UnboundedSender<SyncJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SyncJob>();
    let reschedule_tx = tx.clone();

    tokio::spawn(async move {
        info!(
            max_attempts = config.max_attempts,
            base_backoff_ms = config.base_backoff_ms,
            "External record sync worker started"
        );

        while let Some(mut job) = rx.recv().await {
            if already_synced(&ledger, &votes, &job.target).await {
                debug!(record_id = %job.payload.record_id, "Already synced; skipping");
                continue;
            }

            match recorder.record(&job.payload).await {
                Ok(reference) => {
                    confirm(&ledger, &votes, &job.target, reference).await;
                }
                Err(e) => {
                    job.attempt += 1;
                    if job.attempt >= config.max_attempts {
                        warn!(
                            record_id = %job.payload.record_id,
                            attempts = job.attempt,
                            error = %e,
                            "Sync abandoned; record stays without external ref"
                        );
                        continue;
                    }

                    let delay = backoff_delay(&config, job.attempt);
                    debug!(
                        record_id = %job.payload.record_id,
                        attempt = job.attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Sync failed; rescheduling"
                    );

                    let tx = reschedule_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        // Worker gone means shutdown; nothing to do.
                        let _ = tx.send(job);
                    });
                }
            }
        }
    });

    tx
}

/// Exponential backoff: base * 2^(attempt-1), capped at 30s.
fn backoff_delay(config: &SyncConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let ms = config.base_backoff_ms.saturating_mul(1u64 << exp);
    Duration::from_millis(ms.min(30_000))
}

async fn already_synced(ledger: &KarmaLedger, votes: &VoteLog, target: &SyncTarget) -> bool {
    match target {
        SyncTarget::LedgerEntry { entry_id } => ledger
            .entry(entry_id)
            .await
            .is_some_and(|e| e.external_ref.is_some()),
        SyncTarget::Vote {
            content_id,
            vote_id,
        } => votes
            .vote(content_id, vote_id)
            .await
            .is_some_and(|v| v.external_ref.is_some()),
    }
}

async fn confirm(ledger: &KarmaLedger, votes: &VoteLog, target: &SyncTarget, reference: String) {
    match target {
        SyncTarget::LedgerEntry { entry_id } => {
            if ledger.attach_external_ref(entry_id, reference).await {
                debug!(entry_id = %entry_id, "Ledger entry synced");
            }
        }
        SyncTarget::Vote {
            content_id,
            vote_id,
        } => {
            if votes
                .attach_external_ref(content_id, vote_id, reference)
                .await
            {
                debug!(vote_id = %vote_id, "Vote synced");
            }
        }
    }
}

/// Re-enqueue everything still missing an external reference. Run at
/// startup or from an operator action to resume abandoned syncs.
pub async fn resync_pending(
    ledger: &KarmaLedger,
    votes: &VoteLog,
    tx: &UnboundedSender<SyncJob>,
) -> usize {
    let mut enqueued = 0;

    for entry in ledger.pending_sync_entries().await {
        if tx.send(SyncJob::ledger_entry(&entry)).is_ok() {
            enqueued += 1;
        }
    }
    for vote in votes.pending_sync_votes().await {
        if tx.send(SyncJob::vote_record(&vote)).is_ok() {
            enqueued += 1;
        }
    }

    if enqueued > 0 {
        info!(count = enqueued, "Re-enqueued pending external records");
    }
    enqueued
}
