//! Content Registry API Endpoints
//!
//! Collaborator surface: the media/storage subsystem registers items
//! here so the engine can gate validation and moderation on existence
//! and authorship.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::error_response;
use crate::content::{ContentItem, ContentStore};

#[derive(Clone)]
pub struct ContentApiState {
    pub content: Arc<ContentStore>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub content_id: String,
    pub author_id: String,
}

/// POST /content
pub async fn register(
    State(state): State<ContentApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Json<ContentItem> {
    Json(
        state
            .content
            .register(&payload.content_id, &payload.author_id)
            .await,
    )
}

/// GET /content/{content_id}
pub async fn get_item(
    State(state): State<ContentApiState>,
    Path(content_id): Path<String>,
) -> Result<Json<ContentItem>, (StatusCode, String)> {
    let item = state.content.get(&content_id).await.map_err(error_response)?;
    Ok(Json(item))
}

pub fn create_content_router(state: ContentApiState) -> Router {
    Router::new()
        .route("/", post(register))
        .route("/{content_id}", get(get_item))
        .with_state(state)
}
