//! Registration and login handlers.

use crate::errors::CallError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::routes::AppState;
use crate::services::account_service;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handle account registration.
///
/// POST /v1/auth/register
#[instrument(skip(state, payload), name = "cs.handlers.register")]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), CallError> {
    let response = account_service::register(
        &state.pool,
        &state.session_keys,
        &payload,
        state.config.bcrypt_cost,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handle login.
///
/// POST /v1/auth/login
#[instrument(skip(state, payload), name = "cs.handlers.login")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, CallError> {
    let response = account_service::login(
        &state.pool,
        &state.session_keys,
        &payload,
        state.config.bcrypt_cost,
    )
    .await?;

    Ok(Json(response))
}
