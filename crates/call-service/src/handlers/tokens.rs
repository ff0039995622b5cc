//! Token listing handler.

use crate::errors::CallError;
use crate::middleware::AuthenticatedUser;
use crate::models::TokenListResponse;
use crate::routes::AppState;
use crate::services::call_session;
use axum::extract::State;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// List every token issued to the caller, newest first.
///
/// GET /v1/tokens
#[instrument(skip(state, user), name = "cs.handlers.list_my_tokens")]
pub async fn list_my_tokens(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<TokenListResponse>, CallError> {
    let response = call_session::list_my_tokens(&state.pool, user.user_id).await?;
    Ok(Json(response))
}
