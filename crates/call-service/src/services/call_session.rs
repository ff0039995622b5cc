//! Call/membership/token workflow.
//!
//! Ordering rules enforced here:
//!
//! - Membership is established (or verified) BEFORE the issuer is
//!   contacted
//! - A token row is recorded only AFTER the issuer succeeds; an issuer
//!   failure leaves no token row behind
//! - Joining is idempotent per (call, user); repeat joins reuse the
//!   existing membership and still receive a fresh token for the role
//!   the request asked for

use crate::errors::CallError;
use crate::models::{CallRole, CallType, TokenEntry, TokenListResponse};
use crate::observability::metrics;
use crate::repositories::{call_members, calls, rtc_tokens};
use crate::services::token_issuer::{RtcTokenRequest, TokenIssuer};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

/// Default validity of issued RTC tokens in seconds (52 weeks).
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 31_104_000;

/// Outcome of creating a call.
#[derive(Debug, Clone)]
pub struct CreatedCall {
    pub call_id: Uuid,
    pub channel_id: String,
}

/// Create a call and make the creator its host.
#[instrument(skip(pool), fields(user_id = %creator_id), name = "cs.call_session.create_call")]
pub async fn create_call(
    pool: &PgPool,
    creator_id: Uuid,
    call_type: CallType,
) -> Result<CreatedCall, CallError> {
    let call = calls::create_call(pool, call_type).await?;
    call_members::add_member(pool, call.call_id, creator_id, CallRole::Host).await?;

    info!(
        target: "cs.services.call_session",
        channel_id = %call.channel_id,
        call_type = %call_type,
        "Created call"
    );
    metrics::record_call_created(call_type.as_str());

    Ok(CreatedCall {
        call_id: call.call_id,
        channel_id: call.channel_id,
    })
}

/// Join a call and receive an RTC token bound to the caller's account.
///
/// Membership comes first so an issuer outage cannot leave the caller
/// outside the call; the token row is written only once the issuer has
/// produced a token. A repeat join keeps the stored membership role,
/// but the token is always issued for the role this request asked for.
#[instrument(
    skip(pool, issuer),
    fields(user_id = %user_id, channel_id = %channel_id),
    name = "cs.call_session.join_call"
)]
pub async fn join_call(
    pool: &PgPool,
    issuer: &dyn TokenIssuer,
    channel_id: &str,
    user_id: Uuid,
    role: CallRole,
) -> Result<String, CallError> {
    let call = calls::find_by_channel(pool, channel_id)
        .await?
        .ok_or_else(|| CallError::NotFound(format!("No call with channel '{}'", channel_id)))?;

    // The membership row keeps its original role on a repeat join; the
    // requested role only shapes the issued token.
    call_members::add_member(pool, call.call_id, user_id, role).await?;

    let token = issue_and_record(
        pool,
        issuer,
        &call.channel_id,
        call.call_id,
        user_id,
        user_id.to_string(),
        role,
        "join",
    )
    .await?;

    info!(
        target: "cs.services.call_session",
        role = %role,
        "Joined call"
    );

    Ok(token)
}

/// Issue an RTC token for an existing member of a call.
///
/// The token is bound to the caller-chosen numeric uid; only membership
/// in the call is required, the requested role is passed through to the
/// issuer without touching the stored membership.
#[instrument(
    skip(pool, issuer),
    fields(user_id = %user_id, channel_id = %channel_id),
    name = "cs.call_session.request_token"
)]
pub async fn request_token(
    pool: &PgPool,
    issuer: &dyn TokenIssuer,
    channel_id: &str,
    user_id: Uuid,
    target_uid: i64,
    role: CallRole,
) -> Result<String, CallError> {
    let call = calls::find_by_channel(pool, channel_id)
        .await?
        .ok_or_else(|| CallError::NotFound(format!("No call with channel '{}'", channel_id)))?;

    if !call_members::is_member(pool, call.call_id, user_id).await? {
        return Err(CallError::NotMember);
    }

    issue_and_record(
        pool,
        issuer,
        &call.channel_id,
        call.call_id,
        user_id,
        target_uid.to_string(),
        role,
        "request",
    )
    .await
}

/// List every token ever issued to a user, newest first.
#[instrument(skip(pool), fields(user_id = %user_id), name = "cs.call_session.list_my_tokens")]
pub async fn list_my_tokens(pool: &PgPool, user_id: Uuid) -> Result<TokenListResponse, CallError> {
    let records = rtc_tokens::list_for_user(pool, user_id).await?;

    let tokens = records
        .into_iter()
        .map(|r| TokenEntry {
            call_id: r.channel_id,
            token: r.token,
            generated_at: r.generated_at,
            expiry_time: r.expiry_time,
        })
        .collect();

    Ok(TokenListResponse { tokens })
}

/// Call the issuer, then record the token it produced.
#[allow(clippy::too_many_arguments)]
async fn issue_and_record(
    pool: &PgPool,
    issuer: &dyn TokenIssuer,
    channel_id: &str,
    call_id: Uuid,
    user_id: Uuid,
    account: String,
    role: CallRole,
    operation: &'static str,
) -> Result<String, CallError> {
    let request = RtcTokenRequest {
        channel_name: channel_id.to_string(),
        account,
        role,
        expire_seconds: DEFAULT_TOKEN_TTL_SECONDS,
    };

    let token = match issuer.issue(&request).await {
        Ok(token) => token,
        Err(e) => {
            metrics::record_rtc_token_issuance(operation, "failure");
            return Err(e);
        }
    };

    rtc_tokens::insert_token(pool, call_id, user_id, &token, DEFAULT_TOKEN_TTL_SECONDS).await?;
    metrics::record_rtc_token_issuance(operation, "success");

    Ok(token)
}
