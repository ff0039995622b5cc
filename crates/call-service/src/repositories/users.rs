//! User repository.

use crate::errors::CallError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// User model (maps to users table)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str = "user_id, email, password_hash, display_name, \
    is_active, created_at, updated_at, last_login_at";

/// Get a user by email.
pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, CallError> {
    let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

    let user = sqlx::query_as::<_, User>(&query)
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| CallError::Database(format!("Failed to fetch user by email: {}", e)))?;

    Ok(user)
}

/// Create a new user.
///
/// A duplicate email maps to `Conflict` via the `users_email_unique`
/// constraint.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    display_name: &str,
) -> Result<User, CallError> {
    let query = format!(
        "INSERT INTO users (email, password_hash, display_name) \
         VALUES ($1, $2, $3) RETURNING {}",
        USER_COLUMNS
    );

    let user = sqlx::query_as::<_, User>(&query)
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            let is_duplicate = e
                .as_database_error()
                .and_then(|d| d.constraint())
                .map(|c| c == "users_email_unique")
                .unwrap_or(false);

            if is_duplicate {
                CallError::Conflict("An account with this email already exists".to_string())
            } else {
                CallError::Database(format!("Failed to create user: {}", e))
            }
        })?;

    Ok(user)
}

/// Update the last_login_at timestamp for a user.
pub async fn update_last_login(pool: &PgPool, user_id: Uuid) -> Result<(), CallError> {
    sqlx::query("UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| CallError::Database(format!("Failed to update last login: {}", e)))?;

    Ok(())
}
