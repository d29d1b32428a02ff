//! Metrics definitions for the Songify auth service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `songify_auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: 2 values (success, error)
//! - `error_category`: 4 values plus `none`
//! - `outcome`: 4 values (public, authorized, unauthenticated, denied)
//! - `source`: 2 values (generate, file)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// `GET /metrics`.
///
/// Token issuance is dominated by the RSA signature, so buckets start at 1ms.
///
/// # Errors
///
/// Returns error if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("songify_auth_token_issuance".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Login Metrics
// ============================================================================

/// Record a credential check
///
/// Metric: `songify_auth_login_total`
/// Labels: `status`
pub fn record_login(status: &str) {
    counter!("songify_auth_login_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance duration and outcome
///
/// Metric: `songify_auth_token_issuance_duration_seconds`, `songify_auth_token_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str, duration: Duration) {
    histogram!("songify_auth_token_issuance_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("songify_auth_token_issuance_total", "status" => status.to_string()).increment(1);
}

/// Record token validation result
///
/// Metric: `songify_auth_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("songify_auth_token_validations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

// ============================================================================
// Access Policy Metrics
// ============================================================================

/// Record an access policy decision
///
/// Metric: `songify_auth_access_decisions_total`
/// Labels: `outcome`
pub fn record_access_decision(outcome: &str) {
    counter!("songify_auth_access_decisions_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// Key Material Metrics
// ============================================================================

/// Record key material initialization at startup
///
/// Metric: `songify_auth_key_material_init_total`
/// Labels: `source`, `status`
pub fn record_key_material_init(source: &str, status: &str) {
    counter!("songify_auth_key_material_init_total", "source" => source.to_string(), "status" => status.to_string())
        .increment(1);
}
