//! Karma Ledger - Single Source of Truth for Reputation
//!
//! Append-only transaction log plus a derived balance per account. Every
//! mutation runs inside one write guard: balance read, entry append, and
//! league re-evaluation are a single critical section, so concurrent
//! awards to the same user cannot lose updates. After the guard drops, a
//! best-effort sync job is handed to the external record worker.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::league::{reevaluate, League, LeagueChange, LeagueStatus};
use crate::ledger::{Account, Direction, KarmaReason, LedgerEntry};
use crate::sync::SyncJob;

/// Accounts and the entry log under one lock: a balance is never read in
/// one critical section and written in another.
#[derive(Default)]
struct LedgerState {
    accounts: HashMap<String, Account>,
    entries: Vec<LedgerEntry>,
}

pub struct KarmaLedger {
    state: RwLock<LedgerState>,
    sync_tx: OnceLock<UnboundedSender<SyncJob>>,
}

impl KarmaLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(LedgerState::default()),
            sync_tx: OnceLock::new(),
        })
    }

    /// Attach the external-record sync channel. Called once at wiring
    /// time; mutations before this simply skip sync scheduling.
    pub fn set_sync_channel(&self, tx: UnboundedSender<SyncJob>) {
        if self.sync_tx.set(tx).is_err() {
            warn!("sync channel already attached to ledger");
        }
    }

    /// Create the account if absent; returns the stored account either
    /// way so collaborator-driven provisioning is idempotent.
    pub async fn open_account(&self, user_id: &str) -> Account {
        let mut state = self.state.write().await;
        if let Some(existing) = state.accounts.get(user_id) {
            return existing.clone();
        }

        let account = Account::new(user_id.to_string());
        state.accounts.insert(user_id.to_string(), account.clone());
        info!(user_id = %user_id, "Account opened");
        account
    }

    /// Award karma. Fails with `NotFound` for unknown accounts.
    pub async fn award(
        &self,
        user_id: &str,
        amount: u64,
        reason: KarmaReason,
        metadata: Value,
    ) -> EngineResult<(LedgerEntry, LeagueChange)> {
        self.apply(user_id, amount, Direction::Award, reason, metadata)
            .await
    }

    /// Deduct karma, clipping at zero: if `amount` exceeds the balance
    /// only the balance is removed and the entry records the clipped
    /// amount.
    pub async fn deduct(
        &self,
        user_id: &str,
        amount: u64,
        reason: KarmaReason,
        metadata: Value,
    ) -> EngineResult<(LedgerEntry, LeagueChange)> {
        self.apply(user_id, amount, Direction::Deduct, reason, metadata)
            .await
    }

    async fn apply(
        &self,
        user_id: &str,
        amount: u64,
        direction: Direction,
        reason: KarmaReason,
        metadata: Value,
    ) -> EngineResult<(LedgerEntry, LeagueChange)> {
        if amount == 0 {
            return Err(EngineError::InvalidInput(
                "amount must be positive".to_string(),
            ));
        }

        let (entry, change) = {
            let mut state = self.state.write().await;
            let account = state
                .accounts
                .get_mut(user_id)
                .ok_or_else(|| EngineError::account_not_found(user_id))?;

            let (applied, new_balance) = match direction {
                Direction::Award => {
                    let new_balance = account.karma_balance.checked_add(amount).ok_or_else(|| {
                        EngineError::Internal(format!("balance overflow for {user_id}"))
                    })?;
                    (amount, new_balance)
                }
                Direction::Deduct => {
                    let applied = amount.min(account.karma_balance);
                    (applied, account.karma_balance - applied)
                }
            };

            account.karma_balance = new_balance;
            account.updated_at = chrono::Utc::now();
            let change = reevaluate(account);

            let entry = LedgerEntry::new(
                user_id.to_string(),
                applied,
                direction,
                reason,
                new_balance,
                metadata,
            );
            state.entries.push(entry.clone());
            (entry, change)
        };

        info!(
            user_id = %user_id,
            direction = ?direction,
            reason = ?reason,
            amount = entry.amount,
            balance_after = entry.balance_after,
            "Ledger entry applied"
        );
        if change.promoted {
            info!(
                user_id = %user_id,
                old_league = %change.old_league,
                new_league = %change.new_league,
                newly_unlocked = change.newly_unlocked.len(),
                "League promotion"
            );
        }

        self.schedule_sync(&entry);
        Ok((entry, change))
    }

    /// Hand the entry to the sync worker. Fire-and-forget: a missing or
    /// closed channel never fails the mutation that got us here.
    fn schedule_sync(&self, entry: &LedgerEntry) {
        let Some(tx) = self.sync_tx.get() else {
            debug!(entry_id = %entry.id, "No sync channel; entry stays local");
            return;
        };
        let job = SyncJob::ledger_entry(entry);
        if tx.send(job).is_err() {
            warn!(entry_id = %entry.id, "Sync worker gone; entry stays without external ref");
        }
    }

    pub async fn account(&self, user_id: &str) -> EngineResult<Account> {
        let state = self.state.read().await;
        state
            .accounts
            .get(user_id)
            .cloned()
            .ok_or_else(|| EngineError::account_not_found(user_id))
    }

    pub async fn balance(&self, user_id: &str) -> EngineResult<u64> {
        Ok(self.account(user_id).await?.karma_balance)
    }

    /// League lookup for privilege gating.
    pub async fn league_of(&self, user_id: &str) -> EngineResult<League> {
        Ok(self.account(user_id).await?.league)
    }

    pub async fn league_status(&self, user_id: &str) -> EngineResult<LeagueStatus> {
        Ok(LeagueStatus::for_account(&self.account(user_id).await?))
    }

    /// Paged entry history for a user, newest first.
    pub async fn history(
        &self,
        user_id: &str,
        page: usize,
        page_size: usize,
    ) -> EngineResult<(Vec<LedgerEntry>, usize)> {
        if page_size == 0 {
            return Err(EngineError::InvalidInput(
                "page_size must be positive".to_string(),
            ));
        }

        let state = self.state.read().await;
        if !state.accounts.contains_key(user_id) {
            return Err(EngineError::account_not_found(user_id));
        }

        let mut entries: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        let total = entries.len();
        entries.reverse();

        let page_entries = entries
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok((page_entries, total))
    }

    /// Attach an external record reference. Idempotent: an entry that
    /// already carries a reference is left untouched.
    pub async fn attach_external_ref(&self, entry_id: &str, reference: String) -> bool {
        let mut state = self.state.write().await;
        match state.entries.iter_mut().find(|e| e.id == entry_id) {
            Some(entry) if entry.external_ref.is_none() => {
                entry.external_ref = Some(reference);
                true
            }
            Some(entry) => {
                debug!(
                    entry_id = %entry_id,
                    existing = ?entry.external_ref,
                    "Entry already synced; ignoring new reference"
                );
                false
            }
            None => {
                warn!(entry_id = %entry_id, "Cannot attach reference to unknown entry");
                false
            }
        }
    }

    pub async fn entry(&self, entry_id: &str) -> Option<LedgerEntry> {
        let state = self.state.read().await;
        state.entries.iter().find(|e| e.id == entry_id).cloned()
    }

    /// Entries still waiting for an external reference, oldest first.
    /// Used to resume abandoned syncs.
    pub async fn pending_sync_entries(&self) -> Vec<LedgerEntry> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|e| e.external_ref.is_none())
            .cloned()
            .collect()
    }

    /// Total karma awarded to a user for one reason. Backs the
    /// moderation reviewer stats.
    pub async fn sum_awards(&self, user_id: &str, reason: KarmaReason) -> u64 {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|e| {
                e.user_id == user_id && e.reason == reason && e.direction == Direction::Award
            })
            .map(|e| e.amount)
            .sum()
    }

    /// Audit helper: recompute a user's balance from the log alone.
    pub async fn replay_balance(&self, user_id: &str) -> i64 {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.signed_amount())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_award_requires_account() {
        let ledger = KarmaLedger::new();
        let err = ledger
            .award("ghost", 10, KarmaReason::PositiveEngagement, Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_award_and_balance() {
        let ledger = KarmaLedger::new();
        ledger.open_account("user_1").await;

        let (entry, change) = ledger
            .award("user_1", 40, KarmaReason::OriginalContent, Value::Null)
            .await
            .unwrap();

        assert_eq!(entry.amount, 40);
        assert_eq!(entry.balance_after, 40);
        assert!(!change.promoted);
        assert_eq!(ledger.balance("user_1").await.unwrap(), 40);
    }

    #[tokio::test]
    async fn test_deduct_clips_at_zero() {
        let ledger = KarmaLedger::new();
        ledger.open_account("user_1").await;
        ledger
            .award("user_1", 10, KarmaReason::PositiveEngagement, Value::Null)
            .await
            .unwrap();

        let (entry, _) = ledger
            .deduct("user_1", 1_000, KarmaReason::MisinformationPenalty, Value::Null)
            .await
            .unwrap();

        assert_eq!(entry.amount, 10);
        assert_eq!(entry.balance_after, 0);
        assert_eq!(ledger.balance("user_1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let ledger = KarmaLedger::new();
        ledger.open_account("user_1").await;
        let err = ledger
            .award("user_1", 0, KarmaReason::PositiveEngagement, Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_award_triggers_promotion() {
        let ledger = KarmaLedger::new();
        ledger.open_account("user_1").await;

        let (_, change) = ledger
            .award("user_1", 120, KarmaReason::CampaignReward, Value::Null)
            .await
            .unwrap();

        assert!(change.promoted);
        assert_eq!(change.new_league, League::Ember);
        assert_eq!(ledger.league_of("user_1").await.unwrap(), League::Ember);
    }

    #[tokio::test]
    async fn test_replay_matches_balance() {
        let ledger = KarmaLedger::new();
        ledger.open_account("user_1").await;

        ledger
            .award("user_1", 30, KarmaReason::PositiveEngagement, Value::Null)
            .await
            .unwrap();
        ledger
            .deduct("user_1", 12, KarmaReason::FakeEngagementPenalty, Value::Null)
            .await
            .unwrap();
        ledger
            .award("user_1", 7, KarmaReason::ModerationHelp, Value::Null)
            .await
            .unwrap();

        let balance = ledger.balance("user_1").await.unwrap();
        assert_eq!(ledger.replay_balance("user_1").await, balance as i64);
    }

    #[tokio::test]
    async fn test_concurrent_awards_do_not_lose_updates() {
        let ledger = KarmaLedger::new();
        ledger.open_account("user_1").await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .award("user_1", 2, KarmaReason::PositiveEngagement, Value::Null)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(ledger.balance("user_1").await.unwrap(), 100);
        assert_eq!(ledger.replay_balance("user_1").await, 100);
    }

    #[tokio::test]
    async fn test_history_pagination_newest_first() {
        let ledger = KarmaLedger::new();
        ledger.open_account("user_1").await;
        for i in 1..=5u64 {
            ledger
                .award("user_1", i, KarmaReason::PositiveEngagement, Value::Null)
                .await
                .unwrap();
        }

        let (page, total) = ledger.history("user_1", 0, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].amount, 5);
        assert_eq!(page[1].amount, 4);

        let (last_page, _) = ledger.history("user_1", 2, 2).await.unwrap();
        assert_eq!(last_page.len(), 1);
        assert_eq!(last_page[0].amount, 1);
    }

    #[tokio::test]
    async fn test_attach_external_ref_once() {
        let ledger = KarmaLedger::new();
        ledger.open_account("user_1").await;
        let (entry, _) = ledger
            .award("user_1", 5, KarmaReason::ContentValidation, Value::Null)
            .await
            .unwrap();

        assert!(ledger.attach_external_ref(&entry.id, "ref_a".to_string()).await);
        assert!(!ledger.attach_external_ref(&entry.id, "ref_b".to_string()).await);

        let stored = ledger.entry(&entry.id).await.unwrap();
        assert_eq!(stored.external_ref.as_deref(), Some("ref_a"));
    }
}
