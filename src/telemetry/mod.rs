//! Telemetry initialization: metrics and structured logging

pub mod metrics;

use crate::config::TelemetryConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise logging and, when enabled, the metrics recorder.
///
/// Returns `Some(PrometheusHandle)` when metrics are enabled so the caller
/// can render them once a command finishes.
pub fn init(config: &TelemetryConfig) -> Option<PrometheusHandle> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "zapier_authz=info".into());

    let prometheus_handle = if config.metrics_enabled {
        let handle = metrics::install_prometheus_recorder();
        metrics::describe_metrics();
        handle
    } else {
        None
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.is_json() {
        // Flatten event fields so `message` is top-level in each JSON line.
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true);
        registry.with(fmt_layer).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::debug!(service = %config.service_name, "Telemetry initialized");
    prometheus_handle
}
