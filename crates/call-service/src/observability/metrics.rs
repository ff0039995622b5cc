//! Metrics definitions for the call service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `cs_` prefix for the call service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: a handful of parameterized paths
//! - `operation`: "join" or "request"
//! - `outcome`/`status`: "success" or "failure"

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the Prometheus recorder fails to install (e.g.
/// already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("cs_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Issuer calls sit on the network; buckets stretch out accordingly
        .set_buckets_for_metric(
            Matcher::Prefix("cs_rtc_issuer".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set issuer buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `cs_http_requests_total`, `cs_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures ALL HTTP responses including framework-level errors like
/// 415 (wrong Content-Type), 400 (JSON parse errors), 404 and 405.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("cs_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("cs_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Replaces dynamic segments (channel identifiers) with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/metrics" => "/metrics".to_string(),
        "/v1/health" => "/v1/health".to_string(),
        "/v1/ready" => "/v1/ready".to_string(),
        "/v1/auth/register" => "/v1/auth/register".to_string(),
        "/v1/auth/login" => "/v1/auth/login".to_string(),
        "/v1/calls" => "/v1/calls".to_string(),
        "/v1/tokens" => "/v1/tokens".to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

/// Normalize paths with dynamic segments
///
/// Call endpoints embed the channel identifier:
/// `/v1/calls/{channel_id}/token` and `/v1/calls/{channel_id}/join`.
fn normalize_dynamic_endpoint(path: &str) -> String {
    if path.starts_with("/v1/calls/") {
        let parts: Vec<&str> = path.split('/').collect();

        // /v1/calls/{channel_id}/{action} → parts.len() == 5
        if parts.len() == 5 {
            if let Some(action) = parts.get(4) {
                if *action == "token" {
                    return "/v1/calls/{channel_id}/token".to_string();
                }
                if *action == "join" {
                    return "/v1/calls/{channel_id}/join".to_string();
                }
            }
        }
    }

    // Unknown paths normalized to "/other" to bound cardinality
    "/other".to_string()
}

// ============================================================================
// Account Metrics
// ============================================================================

/// Record a completed registration.
///
/// Metric: `cs_registrations_total`
pub fn record_registration() {
    counter!("cs_registrations_total").increment(1);
}

/// Record a login attempt.
///
/// Metric: `cs_login_attempts_total`
/// Labels: `outcome` ("success" or "failure")
pub fn record_login_attempt(outcome: &str) {
    counter!("cs_login_attempts_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ============================================================================
// Call Workflow Metrics
// ============================================================================

/// Record a created call.
///
/// Metric: `cs_calls_created_total`
/// Labels: `call_type` ("video" or "voice")
pub fn record_call_created(call_type: &str) {
    counter!("cs_calls_created_total",
        "call_type" => call_type.to_string()
    )
    .increment(1);
}

/// Record an RTC token issuance attempt.
///
/// Metric: `cs_rtc_token_issuances_total`
/// Labels: `operation` ("join" or "request"), `outcome`
pub fn record_rtc_token_issuance(operation: &str, outcome: &str) {
    counter!("cs_rtc_token_issuances_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an issuer round trip.
///
/// Metric: `cs_rtc_issuer_request_duration_seconds`
/// Labels: `outcome`
pub fn record_issuer_request(outcome: &str, duration: Duration) {
    histogram!("cs_rtc_issuer_request_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());
}

// ============================================================================
// Tests
// ============================================================================
