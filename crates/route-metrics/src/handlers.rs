//! Prometheus scrape endpoint handler.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns the Prometheus text exposition of every recorded series:
/// ```text
/// # HELP chi_requests_total Number of HTTP requests partitioned by status code, method and HTTP path.
/// # TYPE chi_requests_total counter
/// chi_requests_total{service="api",code="200",method="GET",path="/"} 42
/// ```
#[tracing::instrument(skip_all, name = "route_metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
