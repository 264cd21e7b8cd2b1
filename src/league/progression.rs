//! League Progression
//!
//! Pure function of current karma against the static tier table, applied
//! to an account inside the ledger's write guard. Calling it again with
//! no karma change in between is a no-op.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::league::{League, TIERS};
use crate::ledger::Account;

/// Outcome of a progression re-evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueChange {
    pub promoted: bool,
    pub old_league: League,
    pub new_league: League,
    /// Capabilities granted by this re-evaluation (empty on no-op and
    /// on demotion).
    pub newly_unlocked: BTreeSet<String>,
}

impl LeagueChange {
    pub fn unchanged(league: League) -> Self {
        Self {
            promoted: false,
            old_league: league,
            new_league: league,
            newly_unlocked: BTreeSet::new(),
        }
    }
}

/// Re-evaluate the account's league from its current balance.
///
/// Promotion unions the grants of every tier up to and including the new
/// one, so a balance jump across several tiers unlocks all of them.
/// Demotion stores the lower tier but removes nothing from the unlocked
/// set.
pub fn reevaluate(account: &mut Account) -> LeagueChange {
    let target = League::for_karma(account.karma_balance);
    if target == account.league {
        return LeagueChange::unchanged(target);
    }

    let old_league = account.league;
    let promoted = target > old_league;
    let mut newly_unlocked = BTreeSet::new();

    if promoted {
        for tier in TIERS.iter().filter(|t| t.league <= target) {
            for capability in tier.grants {
                if account.unlocked_capabilities.insert(capability.to_string()) {
                    newly_unlocked.insert(capability.to_string());
                }
            }
        }
    }

    account.league = target;

    LeagueChange {
        promoted,
        old_league,
        new_league: target,
        newly_unlocked,
    }
}

/// Read model for the league status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueStatus {
    pub user_id: String,
    pub current: League,
    pub next: Option<League>,
    /// Karma still needed to reach the next tier (0 at the top).
    pub karma_required: u64,
    /// Progress through the current bracket, 0..=100.
    pub progress_pct: f64,
    pub unlocked_capabilities: BTreeSet<String>,
}

impl LeagueStatus {
    pub fn for_account(account: &Account) -> Self {
        let current = account.league;
        let next = current.next();

        let (karma_required, progress_pct) = match next {
            Some(next_league) => {
                let floor = current.min_karma();
                let ceiling = next_league.min_karma();
                let into_bracket = account.karma_balance.saturating_sub(floor);
                let bracket_span = ceiling - floor;
                let required = ceiling.saturating_sub(account.karma_balance);
                let pct = (into_bracket as f64 / bracket_span as f64 * 100.0).min(100.0);
                (required, pct)
            }
            None => (0, 100.0),
        };

        Self {
            user_id: account.user_id.clone(),
            current,
            next,
            karma_required,
            progress_pct,
            unlocked_capabilities: account.unlocked_capabilities.clone(),
        }
    }
}
