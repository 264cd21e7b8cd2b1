//! Karma Ledger
//!
//! Append-only transaction log plus derived per-account balances; the
//! single source of truth for reputation. League progression runs inside
//! the ledger's critical section so a balance change and its tier
//! consequences commit together.

pub mod accounts;
pub mod entry;
#[allow(clippy::module_inception)]
pub mod ledger;

pub use accounts::Account;
pub use entry::{Direction, KarmaReason, LedgerEntry};
pub use ledger::KarmaLedger;
