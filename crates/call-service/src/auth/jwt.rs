//! Session JWT signing and validation.
//!
//! Session tokens are EdDSA (Ed25519) JWTs signed with a single key
//! configured at process start. Validation is deliberately strict:
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only the EdDSA algorithm is accepted
//! - `exp` is enforced; `iat` is rejected when too far in the future
//! - Error messages are generic to prevent information leakage
//!
//! The `sub` and `email` fields in [`SessionClaims`] are redacted in
//! Debug output.

use crate::errors::CallError;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical session tokens are a few hundred bytes; anything larger is
/// rejected before base64 decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Prevents misconfiguration that would weaken iat validation.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Session token lifetime in seconds (24 hours).
pub const SESSION_TOKEN_TTL_SECONDS: u64 = 86_400;

/// Generic validation failure message returned to clients.
const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// Claims carried by a session token.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user's UUID.
    pub sub: String,

    /// Email of the authenticated user.
    pub email: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Unique token identifier.
    pub jti: String,
}

impl fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClaims")
            .field("sub", &"[REDACTED]")
            .field("email", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &self.jti)
            .finish()
    }
}

impl SessionClaims {
    /// Parse the subject as a user UUID.
    pub fn user_id(&self) -> Result<Uuid, CallError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| CallError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string()))
    }
}

/// Signing and verification keys for session tokens.
///
/// Built once at startup from the configured Ed25519 PKCS#8 document
/// and shared behind an `Arc`.
pub struct SessionKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock_skew_seconds: i64,
}

impl SessionKeys {
    /// Build session keys from an Ed25519 PKCS#8 document.
    pub fn new(pkcs8_der: &[u8], clock_skew_seconds: i64) -> Result<Self, CallError> {
        // Derive the public key for verification from the same document.
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8_der).map_err(|_| {
            tracing::error!(target: "cs.auth.jwt", "Session signing key is not valid Ed25519 PKCS#8");
            CallError::Internal
        })?;
        let public_key_bytes = key_pair.public_key().as_ref().to_vec();

        Ok(Self {
            encoding_key: EncodingKey::from_ed_der(pkcs8_der),
            decoding_key: DecodingKey::from_ed_der(&public_key_bytes),
            clock_skew_seconds,
        })
    }

    /// Sign a session token for a user.
    pub fn sign(&self, user_id: Uuid, email: &str) -> Result<String, CallError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + SESSION_TOKEN_TTL_SECONDS as i64,
            jti: Uuid::new_v4().to_string(),
        };

        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());

        encode(&header, &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(target: "cs.auth.jwt", error = %e, "Failed to sign session token");
            CallError::Internal
        })
    }

    /// Validate a session token and return its claims.
    ///
    /// Size cap, EdDSA-only, exp enforced, iat clock-skew checked.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, CallError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "cs.auth.jwt",
                size = token.len(),
                "Rejected oversized session token"
            );
            return Err(CallError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string()));
        }

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.validate_exp = true;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "cs.auth.jwt", error = %e, "Session token validation failed");
            CallError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
        })?;

        // iat must not be too far in the future (clock skew tolerance)
        let now = Utc::now().timestamp();
        if data.claims.iat > now + self.clock_skew_seconds {
            tracing::debug!(
                target: "cs.auth.jwt",
                "Session token iat is too far in the future"
            );
            return Err(CallError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string()));
        }

        Ok(data.claims)
    }
}
