//! Call workflow handlers: creation, joining, and token requests.

use crate::errors::CallError;
use crate::middleware::AuthenticatedUser;
use crate::models::{
    CreateCallRequest, CreateCallResponse, JoinCallRequest, RequestTokenRequest, RtcTokenResponse,
};
use crate::routes::AppState;
use crate::services::call_session;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handle call creation.
///
/// POST /v1/calls
///
/// The caller becomes the call's host. The body is optional; a request
/// without one creates a video call. A body that fails to parse is
/// rejected without creating anything.
#[instrument(skip(state, user, payload), name = "cs.handlers.create_call")]
pub async fn create_call(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateCallRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateCallResponse>), CallError> {
    let request = match payload {
        Ok(Json(request)) => request,
        // No JSON content type means no body was sent.
        Err(JsonRejection::MissingJsonContentType(_)) => CreateCallRequest::default(),
        Err(rejection) => return Err(CallError::BadRequest(rejection.body_text())),
    };
    let call_type = request.call_type().map_err(CallError::BadRequest)?;

    let created = call_session::create_call(&state.pool, user.user_id, call_type).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCallResponse {
            channel_id: created.channel_id,
        }),
    ))
}

/// Handle joining a call.
///
/// POST /v1/calls/{channel_id}/join
///
/// Idempotent per caller; always returns a freshly issued token.
#[instrument(
    skip(state, user, payload),
    fields(channel_id = %channel_id),
    name = "cs.handlers.join_call"
)]
pub async fn join_call(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(channel_id): Path<String>,
    Json(payload): Json<JoinCallRequest>,
) -> Result<Json<RtcTokenResponse>, CallError> {
    let role = payload.role().map_err(CallError::BadRequest)?;

    let token = call_session::join_call(
        &state.pool,
        state.issuer.as_ref(),
        &channel_id,
        user.user_id,
        role,
    )
    .await?;

    Ok(Json(RtcTokenResponse { token }))
}

/// Handle an RTC token request for an existing member.
///
/// POST /v1/calls/{channel_id}/token
#[instrument(
    skip(state, user, payload),
    fields(channel_id = %channel_id),
    name = "cs.handlers.request_token"
)]
pub async fn request_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(channel_id): Path<String>,
    Json(payload): Json<RequestTokenRequest>,
) -> Result<Json<RtcTokenResponse>, CallError> {
    let role = payload.role().map_err(CallError::BadRequest)?;

    let token = call_session::request_token(
        &state.pool,
        state.issuer.as_ref(),
        &channel_id,
        user.user_id,
        payload.uid,
        role,
    )
    .await?;

    Ok(Json(RtcTokenResponse { token }))
}
