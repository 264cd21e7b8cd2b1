//! League Progression API Endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::api::error_response;
use crate::league::LeagueStatus;
use crate::ledger::KarmaLedger;

#[derive(Clone)]
pub struct LeagueApiState {
    pub ledger: Arc<KarmaLedger>,
}

/// GET /league/{user_id}
pub async fn status(
    State(state): State<LeagueApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<LeagueStatus>, (StatusCode, String)> {
    let status = state
        .ledger
        .league_status(&user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(status))
}

pub fn create_league_router(state: LeagueApiState) -> Router {
    Router::new()
        .route("/{user_id}", get(status))
        .with_state(state)
}
