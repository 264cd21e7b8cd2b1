//! External Record Store Interface
//!
//! The engine pushes every ledger entry and vote to an external
//! immutable store, best effort. The store may be slow or transiently
//! fail; callers only ever see the reference once the sync worker lands
//! the record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// What gets recorded externally: a kind tag, the engine-side record id,
/// and the serialized body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    pub kind: String,
    pub record_id: String,
    pub body: serde_json::Value,
}

/// Contract with the external immutable store: accept a payload,
/// eventually return a confirmation reference. May be slow, may fail.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn record(&self, payload: &RecordPayload) -> anyhow::Result<String>;
}

/// In-process store used in dev mode and tests. References are derived
/// from the payload so recording is deterministic; `fail_next` injects
/// transient failures to exercise the retry path.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, RecordPayload>>,
    fail_remaining: AtomicU32,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` record calls with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    pub async fn recorded_count(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn get(&self, reference: &str) -> Option<RecordPayload> {
        self.records.read().await.get(reference).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn record(&self, payload: &RecordPayload) -> anyhow::Result<String> {
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .fail_remaining
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            anyhow::bail!("record store unavailable (injected failure)");
        }

        let reference = compute_record_ref(payload);
        self.records
            .write()
            .await
            .insert(reference.clone(), payload.clone());
        debug!(kind = %payload.kind, record_id = %payload.record_id, reference = %reference, "Record stored");
        Ok(reference)
    }
}

fn compute_record_ref(payload: &RecordPayload) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.kind.as_bytes());
    hasher.update(payload.record_id.as_bytes());
    hasher.update(payload.body.to_string().as_bytes());
    let hash = hasher.finalize();
    format!("rec_{:x}", hash)[..20].to_string()
}
