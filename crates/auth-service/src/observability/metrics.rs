//! Metrics definitions for the task API auth layer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: 3 values (current, previous, rejected)
//! - `kind`: 2 values (sign, renewal)
//! - `status`: bounded by code (success, error, skipped, ...)
//! - `path`: known routes, everything else collapses to `/other`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("auth_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token verification result
///
/// Metric: `auth_token_validations_total`
/// Labels: `outcome` (current, previous, rejected)
pub fn record_token_validation(outcome: &str) {
    counter!("auth_token_validations_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a token being signed
///
/// Metric: `auth_token_issuance_total`
/// Labels: `kind` (sign, renewal)
pub fn record_token_issuance(kind: &str) {
    counter!("auth_token_issuance_total", "kind" => kind.to_string()).increment(1);
}

/// Record a renewal request
///
/// Metric: `auth_token_renewals_total`
/// Labels: `status` (success, error), `from_previous`
pub fn record_token_renewal(status: &str, from_previous: bool) {
    counter!("auth_token_renewals_total",
        "status" => status.to_string(),
        "from_previous" => from_previous.to_string()
    )
    .increment(1);
}

// ============================================================================
// Key Management Metrics
// ============================================================================

/// Record key rotation event
///
/// Metric: `auth_key_rotation_total`
/// Labels: `status` (success, error, skipped)
pub fn record_key_rotation(status: &str) {
    counter!("auth_key_rotation_total", "status" => status.to_string()).increment(1);
}

/// Record key rotation last success timestamp
///
/// Metric: `auth_key_rotation_last_success_timestamp`
#[allow(clippy::cast_precision_loss)]
pub fn set_key_rotation_last_success(timestamp_secs: i64) {
    gauge!("auth_key_rotation_last_success_timestamp").set(timestamp_secs as f64);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `auth_http_requests_total`, `auth_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
///
/// This captures ALL HTTP responses including framework-level errors like
/// 404 and 405.
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("auth_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("auth_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Normalize path to prevent label cardinality explosion
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/me" => "/api/me",
        "/api/jwt-status" => "/api/jwt-status",
        "/api/renovar-token" => "/api/renovar-token",
        _ => "/other",
    }
}
