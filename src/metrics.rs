use anyhow::Context as _;
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static GLOBAL: OnceCell<Metrics> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the engine's counters.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!(
            "moderation_analyses_total",
            "Analyses completed, labeled by recommendation"
        );
        describe_counter!(
            "moderation_history_degraded_total",
            "Analyses scored without history because the lookup failed"
        );
        describe_counter!(
            "moderation_reviews_total",
            "Manual reviews applied, labeled by new status"
        );
        describe_counter!(
            "moderation_detections_deleted_total",
            "Detection records deleted"
        );

        Ok(Self { handle })
    }

    /// Process-wide instance. The recorder can only be installed once.
    pub fn global() -> anyhow::Result<&'static Metrics> {
        GLOBAL.get_or_try_init(Self::init)
    }

    /// Current counters in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// `METRICS_ENABLED=1` mounts `/metrics`.
pub fn metrics_enabled() -> bool {
    std::env::var("METRICS_ENABLED").ok().is_some_and(|v| v == "1")
}
