//! HTTP API Endpoints
//!
//! One router per subsystem, nested by `main.rs`. Handlers translate the
//! engine error taxonomy to HTTP statuses; collaborators (identity,
//! media, classifiers) sit in front of these routes.

pub mod content;
pub mod league;
pub mod ledger;
pub mod moderation;
pub mod validation;

pub use content::{create_content_router, ContentApiState};
pub use league::{create_league_router, LeagueApiState};
pub use ledger::{create_ledger_router, LedgerApiState};
pub use moderation::{create_moderation_router, ModerationApiState};
pub use validation::{create_validation_router, ValidationApiState};

use axum::http::StatusCode;

use crate::error::EngineError;

/// Map the engine error taxonomy to HTTP statuses.
pub(crate) fn error_response(err: EngineError) -> (StatusCode, String) {
    let status = match &err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InsufficientPrivilege(_) => StatusCode::FORBIDDEN,
        EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
