use std::sync::OnceLock;

use metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder when enabled. Without it the `metrics` macros are no-ops.
pub fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

fn describe() {
    metrics::describe_counter!(
        "grading_outcomes_total",
        "Graded answers by strategy and correctness"
    );
    metrics::describe_counter!("submissions_total", "Exam submissions by trigger and status");
    metrics::describe_histogram!(
        "submission_duration_seconds",
        Unit::Seconds,
        "Time spent grading, saving and finalizing one submission"
    );
}

/// Prometheus text exposition for the host application to serve.
pub fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
