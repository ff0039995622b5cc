//! Call repository: call rows and channel-identifier allocation.

use crate::errors::CallError;
use crate::models::CallType;
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sqlx::PgPool;
use uuid::Uuid;

/// Length of a channel identifier in hex characters.
pub const CHANNEL_ID_LEN: usize = 8;

/// Attempts at allocating a fresh channel identifier before giving up.
///
/// A collision needs two identical 32-bit CSPRNG draws, so more than
/// one retry is already extraordinary.
const MAX_CHANNEL_ID_ATTEMPTS: usize = 5;

/// Call model (maps to calls table)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Call {
    pub call_id: Uuid,
    pub channel_id: String,
    pub call_type: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const CALL_COLUMNS: &str =
    "call_id, channel_id, call_type, status, start_time, end_time, created_at";

/// Create a call in `pending` status with a freshly allocated channel
/// identifier.
///
/// The identifier is 4 CSPRNG bytes hex encoded. Uniqueness is enforced
/// by the `calls_channel_id_unique` constraint; on a collision the
/// insert returns no row and is retried with a new identifier.
pub async fn create_call(pool: &PgPool, call_type: CallType) -> Result<Call, CallError> {
    let query = format!(
        "INSERT INTO calls (channel_id, call_type, status) \
         VALUES ($1, $2, 'pending') \
         ON CONFLICT (channel_id) DO NOTHING \
         RETURNING {}",
        CALL_COLUMNS
    );

    for _ in 0..MAX_CHANNEL_ID_ATTEMPTS {
        let channel_id = generate_channel_id()?;

        let inserted = sqlx::query_as::<_, Call>(&query)
            .bind(&channel_id)
            .bind(call_type.as_str())
            .fetch_optional(pool)
            .await
            .map_err(|e| CallError::Database(format!("Failed to create call: {}", e)))?;

        match inserted {
            Some(call) => return Ok(call),
            None => {
                tracing::warn!(
                    target: "cs.repositories.calls",
                    "Channel identifier collision, retrying"
                );
            }
        }
    }

    tracing::error!(
        target: "cs.repositories.calls",
        attempts = MAX_CHANNEL_ID_ATTEMPTS,
        "Exhausted channel identifier allocation attempts"
    );
    Err(CallError::Internal)
}

/// Find a call by its channel identifier.
pub async fn find_by_channel(pool: &PgPool, channel_id: &str) -> Result<Option<Call>, CallError> {
    let query = format!("SELECT {} FROM calls WHERE channel_id = $1", CALL_COLUMNS);

    let call = sqlx::query_as::<_, Call>(&query)
        .bind(channel_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| CallError::Database(format!("Failed to fetch call: {}", e)))?;

    Ok(call)
}

/// Generate a channel identifier: 4 CSPRNG bytes, hex encoded.
fn generate_channel_id() -> Result<String, CallError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; CHANNEL_ID_LEN / 2];

    rng.fill(&mut bytes).map_err(|_| {
        tracing::error!(target: "cs.repositories.calls", "Failed to generate random bytes");
        CallError::Internal
    })?;

    Ok(hex::encode(bytes))
}
