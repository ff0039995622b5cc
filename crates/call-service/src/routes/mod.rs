//! HTTP routes for the call service.
//!
//! Defines the Axum router and application state.

use crate::auth::SessionKeys;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::TokenIssuer;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// RTC token issuer client.
    pub issuer: Arc<dyn TokenIssuer>,

    /// Session token keys (signing and verification).
    pub session_keys: Arc<SessionKeys>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/health` - Liveness probe (simple "OK") - public
/// - `/v1/ready` - Readiness probe (database ping) - public
/// - `/metrics` - Prometheus metrics endpoint - public, unversioned
/// - `/v1/auth/register`, `/v1/auth/login` - account endpoints - public
/// - `/v1/calls` - Create call (authenticated)
/// - `/v1/calls/{channel_id}/join` - Join call (authenticated)
/// - `/v1/calls/{channel_id}/token` - Request RTC token (authenticated)
/// - `/v1/tokens` - List own tokens (authenticated)
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        session_keys: Arc::clone(&state.session_keys),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/ready", get(handlers::readiness_check))
        .route("/v1/auth/register", post(handlers::register))
        .route("/v1/auth/login", post(handlers::login))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/v1/calls", post(handlers::create_call))
        .route("/v1/calls/:channel_id/join", post(handlers::join_call))
        .route("/v1/calls/:channel_id/token", post(handlers::request_token))
        .route("/v1/tokens", get(handlers::list_my_tokens))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Merge routes and apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
