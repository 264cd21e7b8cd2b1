use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

use nebula_engine::{
    api::{
        create_content_router, create_league_router, create_ledger_router,
        create_moderation_router, create_validation_router, ContentApiState, LeagueApiState,
        LedgerApiState, ModerationApiState, ValidationApiState,
    },
    resync_pending, spawn_sync_worker, ContentStore, EngineConfig, KarmaLedger, MemoryRecordStore,
    ModerationQueue, ValidationConsensus, VoteLog,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(EngineConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {e}");
        e
    })?);

    init_logging(&config)?;

    info!("Starting Nebula Reputation & Consensus Engine");
    info!(
        "Consensus: quorum={}, agreement={}, validator league={}; reviewer league={}",
        config.consensus.min_quorum,
        config.consensus.agreement_threshold,
        config.consensus.min_validator_league,
        config.moderation.min_reviewer_league,
    );

    // Core components
    let ledger = KarmaLedger::new();
    let content = Arc::new(ContentStore::new());
    let votes = Arc::new(VoteLog::new());

    // External record sync: in-memory store stands in until a chain
    // collaborator is wired up.
    let recorder = Arc::new(MemoryRecordStore::new());
    let sync_tx = spawn_sync_worker(
        recorder,
        ledger.clone(),
        votes.clone(),
        config.sync.clone(),
    );
    ledger.set_sync_channel(sync_tx.clone());
    let resumed = resync_pending(&ledger, &votes, &sync_tx).await;
    if resumed > 0 {
        info!(count = resumed, "Resumed pending external record syncs");
    }

    let consensus = Arc::new(ValidationConsensus::new(
        ledger.clone(),
        content.clone(),
        votes.clone(),
        config.consensus.clone(),
        config.rewards.clone(),
        Some(sync_tx),
    ));
    let moderation = Arc::new(ModerationQueue::new(
        ledger.clone(),
        content.clone(),
        config.moderation.clone(),
        config.rewards.clone(),
    ));

    let app = Router::new()
        .nest(
            "/ledger",
            create_ledger_router(LedgerApiState {
                ledger: ledger.clone(),
            }),
        )
        .nest(
            "/league",
            create_league_router(LeagueApiState {
                ledger: ledger.clone(),
            }),
        )
        .nest(
            "/validation",
            create_validation_router(ValidationApiState { consensus }),
        )
        .nest(
            "/moderation",
            create_moderation_router(ModerationApiState { queue: moderation }),
        )
        .nest(
            "/content",
            create_content_router(ContentApiState { content }),
        )
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {bind_addr}: {e}"))?;

    info!("Engine listening on {bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &EngineConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {e}"))?;

    Ok(())
}
