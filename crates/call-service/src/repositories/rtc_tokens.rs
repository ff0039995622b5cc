//! Issued RTC token ledger.
//!
//! Append-only: every successful issuance inserts one row, nothing is
//! ever mutated or expired out of the table.

use crate::errors::CallError;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Token record (maps to rtc_tokens table)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RtcToken {
    pub token_id: Uuid,
    pub call_id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub generated_at: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
}

impl RtcToken {
    /// True iff the token's validity window has passed.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiry_time
    }
}

/// A token record annotated with its call's channel identifier, as
/// returned by the per-user listing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserToken {
    pub channel_id: String,
    pub token: String,
    pub generated_at: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
}

/// Record an issued token.
///
/// Expiry is computed as generation + TTL here, before the insert; the
/// `rtc_tokens_expiry_after_generation` CHECK constraint rejects any
/// regression.
pub async fn insert_token(
    pool: &PgPool,
    call_id: Uuid,
    user_id: Uuid,
    token: &str,
    ttl_seconds: i64,
) -> Result<RtcToken, CallError> {
    let generated_at = Utc::now();
    let expiry_time = generated_at + Duration::seconds(ttl_seconds);

    let record = sqlx::query_as::<_, RtcToken>(
        r#"
        INSERT INTO rtc_tokens (call_id, user_id, token, generated_at, expiry_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING token_id, call_id, user_id, token, generated_at, expiry_time
        "#,
    )
    .bind(call_id)
    .bind(user_id)
    .bind(token)
    .bind(generated_at)
    .bind(expiry_time)
    .fetch_one(pool)
    .await
    .map_err(|e| CallError::Database(format!("Failed to record token: {}", e)))?;

    Ok(record)
}

/// List all token records for a user across all calls, newest first.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<UserToken>, CallError> {
    let tokens = sqlx::query_as::<_, UserToken>(
        r#"
        SELECT c.channel_id, t.token, t.generated_at, t.expiry_time
        FROM rtc_tokens t
        JOIN calls c ON c.call_id = t.call_id
        WHERE t.user_id = $1
        ORDER BY t.generated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| CallError::Database(format!("Failed to list tokens: {}", e)))?;

    Ok(tokens)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let live = RtcToken {
            token_id: Uuid::new_v4(),
            call_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "t".to_string(),
            generated_at: now,
            expiry_time: now + Duration::hours(1),
        };
        assert!(!live.is_expired());

        let stale = RtcToken {
            expiry_time: now - Duration::seconds(1),
            ..live
        };
        assert!(stale.is_expired());
    }
}
