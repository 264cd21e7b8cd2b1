//! Engine Error Taxonomy
//!
//! Four caller-visible classes plus an internal catch-all. The first four
//! are synchronous and non-retriable without changing the request;
//! external-record-sync failures are handled inside the sync worker and
//! never surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing account, content item, or moderation ticket
    #[error("not found: {0}")]
    NotFound(String),

    /// League gate failed for the requested operation
    #[error("insufficient privilege: {0}")]
    InsufficientPrivilege(String),

    /// Duplicate vote, already-reviewed ticket, self-validation
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed amounts, confidences, or page parameters
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected internal failure; aborts the whole atomic unit
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn account_not_found(user_id: &str) -> Self {
        Self::NotFound(format!("account {user_id}"))
    }

    pub fn content_not_found(content_id: &str) -> Self {
        Self::NotFound(format!("content {content_id}"))
    }

    pub fn ticket_not_found(ticket_id: &str) -> Self {
        Self::NotFound(format!("ticket {ticket_id}"))
    }

    pub fn duplicate_vote(content_id: &str, validator_id: &str) -> Self {
        Self::Conflict(format!(
            "validator {validator_id} already voted on content {content_id}"
        ))
    }

    pub fn self_validation(content_id: &str) -> Self {
        Self::Conflict(format!("authors may not validate their own content {content_id}"))
    }

    pub fn already_reviewed(ticket_id: &str) -> Self {
        Self::Conflict(format!("ticket {ticket_id} has already been reviewed"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
