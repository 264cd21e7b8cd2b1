//! End-to-end tests wiring the ledger, league progression, validation
//! consensus, moderation queue, and sync worker together the way the
//! server does.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use nebula_engine::{
    resync_pending, spawn_sync_worker, ConsensusConfig, ContentStatus, ContentStore, EngineError,
    KarmaLedger, KarmaReason, League, MemoryRecordStore, ModerationConfig, ModerationQueue,
    ReviewDecision, RewardConfig, SyncConfig, ValidationConsensus, Verdict, VoteLog,
};

struct Engine {
    ledger: Arc<KarmaLedger>,
    content: Arc<ContentStore>,
    votes: Arc<VoteLog>,
    consensus: ValidationConsensus,
    moderation: ModerationQueue,
}

fn engine() -> Engine {
    let ledger = KarmaLedger::new();
    let content = Arc::new(ContentStore::new());
    let votes = Arc::new(VoteLog::new());
    let consensus = ValidationConsensus::new(
        ledger.clone(),
        content.clone(),
        votes.clone(),
        ConsensusConfig::default(),
        RewardConfig::default(),
        None,
    );
    let moderation = ModerationQueue::new(
        ledger.clone(),
        content.clone(),
        ModerationConfig::default(),
        RewardConfig::default(),
    );
    Engine {
        ledger,
        content,
        votes,
        consensus,
        moderation,
    }
}

async fn seed_account(ledger: &KarmaLedger, user_id: &str, karma: u64) {
    ledger.open_account(user_id).await;
    if karma > 0 {
        ledger
            .award(user_id, karma, KarmaReason::CampaignReward, Value::Null)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_balance_always_replayable_from_history() {
    let e = engine();
    seed_account(&e.ledger, "author", 80).await;
    seed_account(&e.ledger, "v1", 600).await;
    seed_account(&e.ledger, "v2", 600).await;
    seed_account(&e.ledger, "v3", 600).await;
    e.content.register("c1", "author").await;

    for v in ["v1", "v2", "v3"] {
        e.consensus
            .submit_vote(v, "c1", Verdict::Fake, 0.9, None)
            .await
            .unwrap();
    }

    for user in ["author", "v1", "v2", "v3"] {
        let balance = e.ledger.balance(user).await.unwrap();
        assert_eq!(
            e.ledger.replay_balance(user).await,
            balance as i64,
            "replayed history must reproduce {user}'s balance"
        );
    }
}

#[tokio::test]
async fn test_oversized_penalty_clips_at_zero() {
    let e = engine();
    seed_account(&e.ledger, "author", 10).await;
    seed_account(&e.ledger, "v1", 600).await;
    seed_account(&e.ledger, "v2", 600).await;
    seed_account(&e.ledger, "v3", 600).await;
    e.content.register("c1", "author").await;

    // Default misinformation penalty (50) exceeds the author's balance.
    for v in ["v1", "v2", "v3"] {
        e.consensus
            .submit_vote(v, "c1", Verdict::Fake, 0.9, None)
            .await
            .unwrap();
    }

    assert_eq!(e.ledger.balance("author").await.unwrap(), 0);
    let (history, _) = e.ledger.history("author", 0, 10).await.unwrap();
    // Newest first: the penalty entry records only what was removed.
    assert_eq!(history[0].amount, 10);
    assert_eq!(history[0].balance_after, 0);
}

#[tokio::test]
async fn test_capabilities_survive_demotion() {
    let e = engine();
    seed_account(&e.ledger, "user", 2_200).await;

    let account = e.ledger.account("user").await.unwrap();
    assert_eq!(account.league, League::Beacon);
    assert!(account.has_capability("validate-content"));
    assert!(account.has_capability("review-moderation"));

    let (_, change) = e
        .ledger
        .deduct("user", 2_000, KarmaReason::FakeEngagementPenalty, Value::Null)
        .await
        .unwrap();

    assert!(!change.promoted);
    let account = e.ledger.account("user").await.unwrap();
    assert_eq!(account.league, League::Ember);
    // Unlocks are permanent even though the league dropped.
    assert!(account.has_capability("validate-content"));
    assert!(account.has_capability("review-moderation"));
}

#[tokio::test]
async fn test_unanimous_votes_seal_verified_with_rewards() {
    let e = engine();
    seed_account(&e.ledger, "author", 0).await;
    seed_account(&e.ledger, "v1", 600).await;
    seed_account(&e.ledger, "v2", 600).await;
    seed_account(&e.ledger, "v3", 600).await;
    e.content.register("c1", "author").await;

    for v in ["v1", "v2", "v3"] {
        e.consensus
            .submit_vote(v, "c1", Verdict::Authentic, 0.95, None)
            .await
            .unwrap();
    }

    let item = e.content.get("c1").await.unwrap();
    assert_eq!(item.validation_status, ContentStatus::Verified);
    assert_eq!(item.validation_count, 3);
    let snapshot = item.consensus.expect("item must be sealed");
    assert!(snapshot.reached);
    assert_eq!(snapshot.final_verdict, Some(Verdict::Authentic));
    assert!((snapshot.agreement_pct - 100.0).abs() < f64::EPSILON);

    // Each validator: vote reward (5) plus consensus bonus (10), once.
    for v in ["v1", "v2", "v3"] {
        assert_eq!(e.ledger.balance(v).await.unwrap(), 615);
    }
    assert_eq!(e.ledger.balance("author").await.unwrap(), 0);
}

#[tokio::test]
async fn test_split_verdicts_leave_item_pending() {
    let e = engine();
    seed_account(&e.ledger, "author", 0).await;
    seed_account(&e.ledger, "v1", 600).await;
    seed_account(&e.ledger, "v2", 600).await;
    seed_account(&e.ledger, "v3", 600).await;
    e.content.register("c1", "author").await;

    e.consensus
        .submit_vote("v1", "c1", Verdict::Authentic, 0.9, None)
        .await
        .unwrap();
    e.consensus
        .submit_vote("v2", "c1", Verdict::Fake, 0.9, None)
        .await
        .unwrap();
    e.consensus
        .submit_vote("v3", "c1", Verdict::Uncertain, 0.5, None)
        .await
        .unwrap();

    let item = e.content.get("c1").await.unwrap();
    assert_eq!(item.validation_status, ContentStatus::Pending);
    assert!(item.consensus.is_none());

    let snapshot = e.consensus.evaluate("c1").await.unwrap();
    assert!(!snapshot.reached);
    assert_eq!(snapshot.count, 3);

    // Participation rewards only, no bonus without a seal.
    for v in ["v1", "v2", "v3"] {
        assert_eq!(e.ledger.balance(v).await.unwrap(), 605);
    }
}

#[tokio::test]
async fn test_reevaluation_never_repeats_consequences() {
    let e = engine();
    seed_account(&e.ledger, "author", 100).await;
    seed_account(&e.ledger, "v1", 600).await;
    seed_account(&e.ledger, "v2", 600).await;
    seed_account(&e.ledger, "v3", 600).await;
    e.content.register("c1", "author").await;

    for v in ["v1", "v2", "v3"] {
        e.consensus
            .submit_vote(v, "c1", Verdict::Fake, 0.9, None)
            .await
            .unwrap();
    }
    assert_eq!(e.ledger.balance("author").await.unwrap(), 50);

    for _ in 0..3 {
        let snapshot = e.consensus.evaluate("c1").await.unwrap();
        assert!(snapshot.reached);
        assert_eq!(snapshot.final_verdict, Some(Verdict::Fake));
    }

    assert_eq!(e.ledger.balance("author").await.unwrap(), 50);
    for v in ["v1", "v2", "v3"] {
        assert_eq!(e.ledger.balance(v).await.unwrap(), 615);
    }
}

#[tokio::test]
async fn test_duplicate_and_self_votes_rejected() {
    let e = engine();
    seed_account(&e.ledger, "author", 600).await;
    seed_account(&e.ledger, "v1", 600).await;
    e.content.register("c1", "author").await;

    e.consensus
        .submit_vote("v1", "c1", Verdict::Authentic, 0.9, None)
        .await
        .unwrap();
    let err = e
        .consensus
        .submit_vote("v1", "c1", Verdict::Fake, 0.9, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let err = e
        .consensus
        .submit_vote("author", "c1", Verdict::Authentic, 1.0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // The rejected votes earned nothing.
    assert_eq!(e.ledger.balance("v1").await.unwrap(), 605);
    assert_eq!(e.ledger.balance("author").await.unwrap(), 600);
}

#[tokio::test]
async fn test_voting_gated_by_league() {
    let e = engine();
    seed_account(&e.ledger, "author", 0).await;
    seed_account(&e.ledger, "novice", 200).await;
    e.content.register("c1", "author").await;

    let err = e
        .consensus
        .submit_vote("novice", "c1", Verdict::Authentic, 0.9, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientPrivilege(_)));
    assert_eq!(e.votes.votes_for("c1").await.len(), 0);
}

#[tokio::test]
async fn test_moderation_approval_reopens_validation() {
    let e = engine();
    seed_account(&e.ledger, "author", 100).await;
    seed_account(&e.ledger, "reviewer", 2_500).await;
    seed_account(&e.ledger, "v1", 600).await;
    seed_account(&e.ledger, "v2", 600).await;
    seed_account(&e.ledger, "v3", 600).await;
    e.content.register("c1", "author").await;

    let flags = BTreeSet::from(["ai-classifier".to_string()]);
    let ticket = e
        .moderation
        .enqueue("c1", "possible misinformation", flags, 0.85)
        .await
        .unwrap();

    e.moderation
        .review("reviewer", &ticket.id, ReviewDecision::Approve, None)
        .await
        .unwrap();

    // Cleared for validation again; a normal consensus can now seal it.
    for v in ["v1", "v2", "v3"] {
        e.consensus
            .submit_vote(v, "c1", Verdict::Authentic, 0.9, None)
            .await
            .unwrap();
    }
    let item = e.content.get("c1").await.unwrap();
    assert_eq!(item.validation_status, ContentStatus::Verified);

    let stats = e.moderation.stats("reviewer").await.unwrap();
    assert_eq!(stats.total_reviewed, 1);
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.karma_earned, 10);
}

#[tokio::test]
async fn test_moderation_rejection_blocks_later_consensus() {
    let e = engine();
    seed_account(&e.ledger, "author", 100).await;
    seed_account(&e.ledger, "reviewer", 2_500).await;
    seed_account(&e.ledger, "v1", 600).await;
    seed_account(&e.ledger, "v2", 600).await;
    seed_account(&e.ledger, "v3", 600).await;
    e.content.register("c1", "author").await;

    let flags = BTreeSet::from(["ai-classifier".to_string()]);
    let ticket = e.moderation.enqueue("c1", "spam", flags, 0.9).await.unwrap();
    e.moderation
        .review("reviewer", &ticket.id, ReviewDecision::Reject, Some("confirmed".into()))
        .await
        .unwrap();
    assert_eq!(e.ledger.balance("author").await.unwrap(), 70);

    // Votes still land, but the rejected item never seals and no
    // consensus consequences fire.
    for v in ["v1", "v2", "v3"] {
        e.consensus
            .submit_vote(v, "c1", Verdict::Authentic, 0.9, None)
            .await
            .unwrap();
    }
    let item = e.content.get("c1").await.unwrap();
    assert_eq!(item.validation_status, ContentStatus::Rejected);
    assert!(item.consensus.is_none());
    for v in ["v1", "v2", "v3"] {
        assert_eq!(e.ledger.balance(v).await.unwrap(), 605);
    }
    assert_eq!(e.ledger.balance("author").await.unwrap(), 70);
}

#[tokio::test]
async fn test_sync_confirms_entries_and_votes() {
    let ledger = KarmaLedger::new();
    let content = Arc::new(ContentStore::new());
    let votes = Arc::new(VoteLog::new());
    let store = Arc::new(MemoryRecordStore::new());

    let tx = spawn_sync_worker(
        store.clone(),
        ledger.clone(),
        votes.clone(),
        SyncConfig {
            max_attempts: 5,
            base_backoff_ms: 5,
        },
    );
    ledger.set_sync_channel(tx.clone());
    let consensus = ValidationConsensus::new(
        ledger.clone(),
        content.clone(),
        votes.clone(),
        ConsensusConfig::default(),
        RewardConfig::default(),
        Some(tx.clone()),
    );

    seed_account(&ledger, "author", 0).await;
    seed_account(&ledger, "v1", 600).await;
    content.register("c1", "author").await;

    // One transient store failure on the way.
    store.fail_next(1);
    let vote = consensus
        .submit_vote("v1", "c1", Verdict::Authentic, 0.9, None)
        .await
        .unwrap();

    let mut synced = false;
    for _ in 0..100 {
        let stored = votes.vote("c1", &vote.id).await.unwrap();
        let entries_pending = ledger.pending_sync_entries().await;
        if stored.external_ref.is_some() && entries_pending.is_empty() {
            synced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(synced, "vote and ledger entries must gain external refs");

    // Nothing left for a resync pass to pick up.
    assert_eq!(resync_pending(&ledger, &votes, &tx).await, 0);
}
