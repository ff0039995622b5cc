//! Password hashing and verification (bcrypt).

use crate::errors::CallError;

/// Hash a password with bcrypt at the configured cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, CallError> {
    bcrypt::hash(password, cost).map_err(|e| {
        tracing::error!(target: "cs.auth.password", error = %e, "Failed to hash password");
        CallError::Internal
    })
}

/// Verify a password against a stored bcrypt hash.
///
/// A malformed stored hash is treated as a verification failure, not an
/// internal error, so the caller's error path stays uniform.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Burn the same bcrypt work as a real verification.
///
/// Called when the account does not exist so login timing does not
/// reveal whether an email is registered.
pub fn burn_verification(password: &str, cost: u32) {
    let _ = bcrypt::hash(password, cost);
}
