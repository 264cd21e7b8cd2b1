//! Nebula Reputation & Consensus Engine
//!
//! Core reputation economy for the Nebula content platform: a karma
//! ledger as the single source of truth, league progression gating
//! capabilities, validation consensus over contested content, and the
//! moderation review queue that feeds karma consequences back into the
//! ledger.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration (NEBULA_* env)
//! ├── error.rs       - Engine error taxonomy
//! ├── content.rs     - Content registry & guarded status transitions
//! ├── ledger/        - Karma ledger
//! │   ├── entry.rs      - Immutable ledger entries & reasons
//! │   ├── accounts.rs   - Per-user accounts
//! │   └── ledger.rs     - Atomic award/deduct with league re-eval
//! ├── league/        - League progression
//! │   ├── tiers.rs      - Static tier table & capability grants
//! │   └── progression.rs - Re-evaluation & status read model
//! ├── consensus/     - Validation consensus
//! │   ├── vote.rs       - Votes & the uniqueness-enforcing log
//! │   └── engine.rs     - Tally, seal-once, karma consequences
//! ├── moderation/    - Moderation review
//! │   ├── ticket.rs     - Flagged-content tickets
//! │   └── queue.rs      - FIFO queue, review, reviewer stats
//! ├── sync/          - External record sync
//! │   ├── recorder.rs   - Record store interface & in-memory impl
//! │   └── worker.rs     - Backoff retry worker
//! └── api/           - HTTP endpoints per subsystem
//! ```

pub mod api;
pub mod config;
pub mod consensus;
pub mod content;
pub mod error;
pub mod league;
pub mod ledger;
pub mod moderation;
pub mod sync;

// Re-export main types for convenience
pub use config::{
    ConsensusConfig, EngineConfig, ModerationConfig, RewardConfig, ServerConfig, SyncConfig,
};
pub use consensus::{ConsensusSnapshot, ValidationConsensus, Verdict, Vote, VoteLog};
pub use content::{ContentItem, ContentStatus, ContentStore};
pub use error::{EngineError, EngineResult};
pub use league::{League, LeagueChange, LeagueStatus};
pub use ledger::{Account, Direction, KarmaLedger, KarmaReason, LedgerEntry};
pub use moderation::{ModerationQueue, ModerationTicket, ReviewDecision, ReviewerStats, TicketStatus};
pub use sync::{
    resync_pending, spawn_sync_worker, MemoryRecordStore, RecordPayload, RecordStore, SyncJob,
};
