//! Registration and login.
//!
//! Both operations end by signing a session token, so a successful
//! registration doubles as the first login.
//!
//! # Security
//!
//! - Passwords are bcrypt hashed at the configured cost
//! - Login failure is always `InvalidCredentials`; missing account,
//!   wrong password, and deactivated account are indistinguishable
//! - When the account does not exist the same bcrypt work is burned
//!   so response timing does not reveal which emails are registered

use crate::auth::password;
use crate::auth::{jwt, SessionKeys};
use crate::errors::CallError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::observability::metrics;
use crate::repositories::users;
use sqlx::PgPool;
use tracing::{info, instrument};

/// Register a new account and sign its first session token.
#[instrument(skip(pool, keys, request), name = "cs.account.register")]
pub async fn register(
    pool: &PgPool,
    keys: &SessionKeys,
    request: &RegisterRequest,
    bcrypt_cost: u32,
) -> Result<AuthResponse, CallError> {
    request
        .validate()
        .map_err(CallError::BadRequest)?;

    let password_hash = password::hash_password(&request.password, bcrypt_cost)?;

    let user = users::create_user(
        pool,
        &request.email,
        &password_hash,
        request.display_name.trim(),
    )
    .await?;

    info!(
        target: "cs.services.account",
        user_id = %user.user_id,
        "Registered new account"
    );
    metrics::record_registration();

    let access_token = keys.sign(user.user_id, &user.email)?;

    Ok(AuthResponse {
        user_id: user.user_id,
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt::SESSION_TOKEN_TTL_SECONDS,
    })
}

/// Authenticate an account and sign a session token.
#[instrument(skip(pool, keys, request), name = "cs.account.login")]
pub async fn login(
    pool: &PgPool,
    keys: &SessionKeys,
    request: &LoginRequest,
    bcrypt_cost: u32,
) -> Result<AuthResponse, CallError> {
    let user = match users::get_by_email(pool, &request.email).await? {
        Some(user) => user,
        None => {
            // Same bcrypt work as the verification below, so timing
            // does not distinguish unknown emails.
            password::burn_verification(&request.password, bcrypt_cost);
            metrics::record_login_attempt("failure");
            return Err(CallError::InvalidCredentials);
        }
    };

    if !password::verify_password(&request.password, &user.password_hash) {
        metrics::record_login_attempt("failure");
        return Err(CallError::InvalidCredentials);
    }

    if !user.is_active {
        metrics::record_login_attempt("failure");
        return Err(CallError::InvalidCredentials);
    }

    users::update_last_login(pool, user.user_id).await?;

    info!(
        target: "cs.services.account",
        user_id = %user.user_id,
        "Login succeeded"
    );
    metrics::record_login_attempt("success");

    let access_token = keys.sign(user.user_id, &user.email)?;

    Ok(AuthResponse {
        user_id: user.user_id,
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt::SESSION_TOKEN_TTL_SECONDS,
    })
}
