//! Call membership repository.
//!
//! The UNIQUE constraint on (call_id, user_id) is the serialization
//! point for concurrent joins; `add_member` is insert-or-fetch on top
//! of it, so at most one membership row can ever exist per pair.

use crate::errors::CallError;
use crate::models::CallRole;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Membership model (maps to call_members table)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CallMember {
    pub member_id: Uuid,
    pub call_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

const MEMBER_COLUMNS: &str = "member_id, call_id, user_id, role, joined_at";

/// Add a member to a call, idempotently.
///
/// If a membership for (call, user) already exists the existing row is
/// returned unchanged, whatever role it carries. Two concurrent first
/// joins race on the unique constraint; the loser's insert is a no-op
/// and the follow-up fetch observes the winner's row.
pub async fn add_member(
    pool: &PgPool,
    call_id: Uuid,
    user_id: Uuid,
    role: CallRole,
) -> Result<CallMember, CallError> {
    let insert = format!(
        "INSERT INTO call_members (call_id, user_id, role) \
         VALUES ($1, $2, $3) \
         ON CONFLICT ON CONSTRAINT call_members_call_user_unique DO NOTHING \
         RETURNING {}",
        MEMBER_COLUMNS
    );

    let inserted = sqlx::query_as::<_, CallMember>(&insert)
        .bind(call_id)
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(pool)
        .await
        .map_err(|e| CallError::Database(format!("Failed to add member: {}", e)))?;

    if let Some(member) = inserted {
        return Ok(member);
    }

    // Row already existed; fetch it.
    get_member(pool, call_id, user_id)
        .await?
        .ok_or_else(|| {
            // Only reachable if the row was deleted between the insert
            // and the fetch (cascade from a concurrent call delete).
            CallError::Database("Membership row vanished during insert-or-fetch".to_string())
        })
}

/// Get a member row for (call, user).
pub async fn get_member(
    pool: &PgPool,
    call_id: Uuid,
    user_id: Uuid,
) -> Result<Option<CallMember>, CallError> {
    let query = format!(
        "SELECT {} FROM call_members WHERE call_id = $1 AND user_id = $2",
        MEMBER_COLUMNS
    );

    let member = sqlx::query_as::<_, CallMember>(&query)
        .bind(call_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| CallError::Database(format!("Failed to fetch member: {}", e)))?;

    Ok(member)
}

/// Whether a user is a member of a call.
pub async fn is_member(pool: &PgPool, call_id: Uuid, user_id: Uuid) -> Result<bool, CallError> {
    Ok(get_member(pool, call_id, user_id).await?.is_some())
}
