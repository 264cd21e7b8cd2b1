//! Validation Consensus
//!
//! Multi-party vote collection and one-time verdict sealing for
//! contested content, feeding karma consequences back into the ledger.

pub mod engine;
pub mod vote;

pub use engine::{ConsensusSnapshot, ValidationConsensus};
pub use vote::{Verdict, Vote, VoteLog};
