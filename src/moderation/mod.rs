//! Moderation Review
//!
//! FIFO queue of AI-flagged content awaiting a human verdict, with karma
//! consequences for reviewers and authors applied through the ledger.

pub mod queue;
pub mod ticket;

pub use queue::{ModerationQueue, ReviewerStats};
pub use ticket::{ModerationTicket, ReviewDecision, TicketStatus};
