//! Moderation Review API Endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::api::error_response;
use crate::moderation::{ModerationQueue, ModerationTicket, ReviewDecision, ReviewerStats};

#[derive(Clone)]
pub struct ModerationApiState {
    pub queue: Arc<ModerationQueue>,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub content_id: String,
    pub reason: String,
    #[serde(default)]
    pub source_flags: BTreeSet<String>,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
pub struct QueueParams {
    pub reviewer_id: String,
    #[serde(default)]
    pub page: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub tickets: Vec<ModerationTicket>,
    pub total_pending: usize,
    pub page: usize,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub reviewer_id: String,
    pub decision: ReviewDecision,
    pub notes: Option<String>,
}

/// POST /moderation/tickets - called by the automated moderation collaborator
pub async fn enqueue(
    State(state): State<ModerationApiState>,
    Json(payload): Json<EnqueueRequest>,
) -> Result<Json<ModerationTicket>, (StatusCode, String)> {
    let ticket = state
        .queue
        .enqueue(
            &payload.content_id,
            &payload.reason,
            payload.source_flags,
            payload.confidence,
        )
        .await
        .map_err(error_response)?;
    Ok(Json(ticket))
}

/// GET /moderation/queue?reviewer_id=..&page=..
pub async fn list_queue(
    State(state): State<ModerationApiState>,
    Query(params): Query<QueueParams>,
) -> Result<Json<QueueResponse>, (StatusCode, String)> {
    let (tickets, total_pending) = state
        .queue
        .list_queue(&params.reviewer_id, params.page)
        .await
        .map_err(error_response)?;
    Ok(Json(QueueResponse {
        tickets,
        total_pending,
        page: params.page,
    }))
}

/// POST /moderation/review/{ticket_id}
pub async fn review(
    State(state): State<ModerationApiState>,
    Path(ticket_id): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<ModerationTicket>, (StatusCode, String)> {
    let ticket = state
        .queue
        .review(&payload.reviewer_id, &ticket_id, payload.decision, payload.notes)
        .await
        .map_err(error_response)?;
    Ok(Json(ticket))
}

/// GET /moderation/stats/{reviewer_id}
pub async fn stats(
    State(state): State<ModerationApiState>,
    Path(reviewer_id): Path<String>,
) -> Result<Json<ReviewerStats>, (StatusCode, String)> {
    let stats = state
        .queue
        .stats(&reviewer_id)
        .await
        .map_err(error_response)?;
    Ok(Json(stats))
}

pub fn create_moderation_router(state: ModerationApiState) -> Router {
    Router::new()
        .route("/tickets", post(enqueue))
        .route("/queue", get(list_queue))
        .route("/review/{ticket_id}", post(review))
        .route("/stats/{reviewer_id}", get(stats))
        .with_state(state)
}
