//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is unauthenticated to allow Prometheus to scrape
//! metrics. No PII or secrets are exposed in metrics, only operational
//! data with bounded cardinality labels.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus-formatted metrics for scraping. This is an
/// operational endpoint, not versioned under /v1.
///
/// # Response
///
/// Returns 200 OK with Prometheus text format:
/// ```text
/// # HELP cs_http_requests_total Total HTTP requests
/// # TYPE cs_http_requests_total counter
/// cs_http_requests_total{method="GET",endpoint="/v1/health",status_code="200"} 42
/// ```
#[tracing::instrument(skip_all, name = "cs.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
