//! Moderation Scorer: binary entrypoint
//! Boots the Axum HTTP server over an in-process store.

use std::sync::Arc;

use anyhow::Context as _;
use shuttle_axum::ShuttleAxum;

use moderation_scorer::config::{start_hot_reload_thread, ConfigHandle, EngineConfig};
use moderation_scorer::{app, telemetry, EngineParts, MemoryStore, ModerationEngine};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    let cfg = EngineConfig::load().context("load moderation config")?;
    tracing::info!(
        target: "moderation::boot",
        spam_score = cfg.thresholds.spam_score,
        reject_confidence = cfg.thresholds.reject_confidence,
        review_confidence = cfg.thresholds.review_confidence,
        phrases = cfg.lexicon.phrases().len(),
        patterns = cfg.lexicon.patterns().len(),
        "moderation config loaded"
    );
    let handle = ConfigHandle::new(cfg);
    start_hot_reload_thread(handle.clone(), EngineConfig::resolved_path());

    let store = Arc::new(MemoryStore::new());
    let engine = ModerationEngine::new(handle, EngineParts::in_memory(store));
    let router = app(engine)?;

    Ok(router.into())
}
