//! Karma Ledger API Endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error_response;
use crate::league::LeagueChange;
use crate::ledger::{Account, KarmaLedger, KarmaReason, LedgerEntry};

#[derive(Clone)]
pub struct LedgerApiState {
    pub ledger: Arc<KarmaLedger>,
}

#[derive(Debug, Deserialize)]
pub struct MutationRequest {
    pub user_id: String,
    pub amount: u64,
    pub reason: KarmaReason,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub entry: LedgerEntry,
    pub league_change: LeagueChange,
}

#[derive(Debug, Deserialize)]
pub struct OpenAccountRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub page: usize,
    pub page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: String,
    pub entries: Vec<LedgerEntry>,
    pub total: usize,
    pub page: usize,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub karma_balance: u64,
    pub replayed_balance: i64,
}

/// POST /ledger/award
pub async fn award(
    State(state): State<LedgerApiState>,
    Json(payload): Json<MutationRequest>,
) -> Result<Json<MutationResponse>, (StatusCode, String)> {
    let (entry, league_change) = state
        .ledger
        .award(&payload.user_id, payload.amount, payload.reason, payload.metadata)
        .await
        .map_err(error_response)?;
    Ok(Json(MutationResponse { entry, league_change }))
}

/// POST /ledger/deduct
pub async fn deduct(
    State(state): State<LedgerApiState>,
    Json(payload): Json<MutationRequest>,
) -> Result<Json<MutationResponse>, (StatusCode, String)> {
    let (entry, league_change) = state
        .ledger
        .deduct(&payload.user_id, payload.amount, payload.reason, payload.metadata)
        .await
        .map_err(error_response)?;
    Ok(Json(MutationResponse { entry, league_change }))
}

/// POST /ledger/accounts
pub async fn open_account(
    State(state): State<LedgerApiState>,
    Json(payload): Json<OpenAccountRequest>,
) -> Json<Account> {
    Json(state.ledger.open_account(&payload.user_id).await)
}

/// GET /ledger/{user_id}/history
pub async fn history(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let page_size = params.page_size.unwrap_or(50);
    let (entries, total) = state
        .ledger
        .history(&user_id, params.page, page_size)
        .await
        .map_err(error_response)?;
    Ok(Json(HistoryResponse {
        user_id,
        entries,
        total,
        page: params.page,
    }))
}

/// GET /ledger/{user_id}/balance
pub async fn balance(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, (StatusCode, String)> {
    let karma_balance = state.ledger.balance(&user_id).await.map_err(error_response)?;
    let replayed_balance = state.ledger.replay_balance(&user_id).await;
    Ok(Json(BalanceResponse {
        user_id,
        karma_balance,
        replayed_balance,
    }))
}

pub fn create_ledger_router(state: LedgerApiState) -> Router {
    Router::new()
        .route("/award", post(award))
        .route("/deduct", post(deduct))
        .route("/accounts", post(open_account))
        .route("/{user_id}/history", get(history))
        .route("/{user_id}/balance", get(balance))
        .with_state(state)
}
