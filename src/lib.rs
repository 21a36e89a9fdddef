// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod collaborators;
pub mod config;
pub mod decision;
pub mod detection;
pub mod engine;
pub mod error;
pub mod history;
pub mod metrics;
pub mod reporting;
pub mod scoring;
pub mod signals;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::{ConfigHandle, EngineConfig, Thresholds};
pub use crate::decision::Recommendation;
pub use crate::engine::{AnalyzeRequest, AnalyzeResponse, Capabilities, EngineParts, ModerationEngine};
pub use crate::error::{EngineError, StoreError};
pub use crate::store::MemoryStore;

use axum::{routing::get, Router};

/// Full HTTP app around `engine`. `/metrics` is mounted when `METRICS_ENABLED=1`.
pub fn app(engine: ModerationEngine) -> anyhow::Result<Router> {
    let mut router = api::router(AppState::new(engine));
    if metrics::metrics_enabled() {
        let exporter = metrics::Metrics::global()?;
        router = router.route("/metrics", get(move || async move { exporter.render() }));
    }
    Ok(router)
}
