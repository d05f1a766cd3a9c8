//! Prometheus metrics exposition
//!
//! - `ats_requests_total` (counter): labels `operation`, `status`
//! - `ats_request_duration_seconds` (histogram): label `operation`
//! - `ats_upstream_errors_total` (counter): labels `provider`, `operation`, `kind`

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "ats_request_duration_seconds";

/// Each gateway request makes one or two sequential upstream calls, so the
/// buckets stop at the longest sane upstream timeout.
const DURATION_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
        .expect("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Handle backed by a recorder that is not installed globally.
#[cfg(test)]
pub fn detached_handle() -> PrometheusHandle {
    builder().build_recorder().handle()
}

/// Record a completed gateway request.
pub fn record_request(operation: &'static str, status: u16, duration_secs: f64) {
    metrics::counter!("ats_requests_total", "operation" => operation, "status" => status.to_string())
        .increment(1);
    metrics::histogram!(DURATION_METRIC, "operation" => operation).record(duration_secs);
}

/// Record an adapter failure.
pub fn record_upstream_error(provider: &str, operation: &'static str, kind: &'static str) {
    metrics::counter!(
        "ats_upstream_errors_total",
        "provider" => provider.to_string(),
        "operation" => operation,
        "kind" => kind
    )
    .increment(1);
}
