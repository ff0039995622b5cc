//! Per-request metrics recording.
//!
//! Sits outermost in the middleware stack, so every response passes
//! through it: handler results, auth rejections, timeouts from the
//! timeout layer, and router-level 404/405s alike.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Record method, endpoint, status, and latency for one request.
///
/// The raw path is normalized inside `record_http_request` so channel
/// identifiers never become label values.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    // The recorder is process-global, so these tests only verify that
    // requests pass through the layer unchanged for each outcome class.

    fn instrumented_app() -> Router {
        Router::new()
            .route("/ok", get(|| async { "OK" }))
            .route(
                "/boom",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/ok")
            .body(Body::empty())
            .unwrap();

        let response = instrumented_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_error_passes_through() {
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/boom")
            .body(Body::empty())
            .unwrap();

        let response = instrumented_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_router_miss_passes_through() {
        // A 404 never reaches a handler but still crosses this layer.
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/missing")
            .body(Body::empty())
            .unwrap();

        let response = instrumented_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
