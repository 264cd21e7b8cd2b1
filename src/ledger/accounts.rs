//! Karma Accounts
//!
//! One account per user. Owned exclusively by the ledger; balances move
//! only through ledger transactions, leagues only through progression
//! re-evaluation inside the ledger's critical section.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::league::League;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,

    /// Current karma balance. Never negative; deductions clip at zero.
    pub karma_balance: u64,

    /// Current league, re-evaluated after every balance change.
    pub league: League,

    /// Capabilities unlocked so far. Append-only: demotion never
    /// removes an entry.
    pub unlocked_capabilities: BTreeSet<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Fresh account at the entry tier with its starting grants.
    pub fn new(user_id: String) -> Self {
        let now = Utc::now();
        let league = League::for_karma(0);
        let unlocked_capabilities = league
            .grants()
            .iter()
            .map(|c| c.to_string())
            .collect();

        Self {
            user_id,
            karma_balance: 0,
            league,
            unlocked_capabilities,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.unlocked_capabilities.contains(capability)
    }
}
