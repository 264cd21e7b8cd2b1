//! Validation Consensus API Endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::error_response;
use crate::consensus::{ConsensusSnapshot, ValidationConsensus, Verdict, Vote};

#[derive(Clone)]
pub struct ValidationApiState {
    pub consensus: Arc<ValidationConsensus>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitVoteRequest {
    pub validator_id: String,
    pub content_id: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub notes: Option<String>,
}

/// POST /validation/votes
pub async fn submit_vote(
    State(state): State<ValidationApiState>,
    Json(payload): Json<SubmitVoteRequest>,
) -> Result<Json<Vote>, (StatusCode, String)> {
    let vote = state
        .consensus
        .submit_vote(
            &payload.validator_id,
            &payload.content_id,
            payload.verdict,
            payload.confidence,
            payload.notes,
        )
        .await
        .map_err(error_response)?;
    Ok(Json(vote))
}

/// GET /validation/{content_id}/consensus
pub async fn consensus(
    State(state): State<ValidationApiState>,
    Path(content_id): Path<String>,
) -> Result<Json<ConsensusSnapshot>, (StatusCode, String)> {
    let snapshot = state
        .consensus
        .evaluate(&content_id)
        .await
        .map_err(error_response)?;
    Ok(Json(snapshot))
}

pub fn create_validation_router(state: ValidationApiState) -> Router {
    Router::new()
        .route("/votes", post(submit_vote))
        .route("/{content_id}/consensus", get(consensus))
        .with_state(state)
}
