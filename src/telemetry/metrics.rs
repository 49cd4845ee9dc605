//! Prometheus metrics setup and metric definitions

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder. Returns `None` if a recorder is already
/// installed for this process.
pub fn install_prometheus_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("WARN: failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

/// Register metric descriptions and emit initial zero values so rendered
/// output includes HELP/TYPE lines for every metric.
pub fn describe_metrics() {
    describe_counter!(
        "zapier_authz_permission_checks_total",
        "Permission checks by decision (allow/deny)"
    );
    describe_counter!(
        "zapier_authz_evolve_subscriptions_updated_total",
        "Webhook subscriptions whose grants changed during schema evolution"
    );

    counter!("zapier_authz_permission_checks_total", "decision" => "allow").absolute(0);
    counter!("zapier_authz_permission_checks_total", "decision" => "deny").absolute(0);
    counter!("zapier_authz_evolve_subscriptions_updated_total").absolute(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_metrics_without_recorder() {
        // No recorder installed: descriptions and updates are no-ops.
        describe_metrics();
    }
}
