//! External Record Sync
//!
//! Fire-and-forget replication of ledger entries and votes to an
//! external immutable store, decoupled from the triggering request by a
//! task channel with bounded exponential backoff.

pub mod recorder;
pub mod worker;

pub use recorder::{MemoryRecordStore, RecordPayload, RecordStore};
pub use worker::{resync_pending, spawn_sync_worker, SyncJob, SyncTarget};
