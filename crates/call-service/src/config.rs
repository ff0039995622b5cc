//! Call Service configuration.
//!
//! Configuration is loaded from environment variables once at process
//! start and passed by reference everywhere else; nothing reads the
//! environment at call sites. All sensitive fields are redacted in
//! Debug output.

use crate::auth::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use base64::{engine::general_purpose, Engine as _};
use ring::signature::Ed25519KeyPair;
use secrecy::{ExposeSecret, SecretBox, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default bcrypt cost for password hashing.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Default graceful-shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Call Service configuration.
///
/// Loaded from environment variables with sensible defaults. The
/// database URL, RTC certificate, and session signing key are redacted
/// in Debug output to prevent credential leakage.
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// RTC token issuer application identifier.
    pub rtc_app_id: String,

    /// RTC token issuer shared certificate (Bearer credential).
    pub rtc_app_certificate: SecretString,

    /// Base URL of the RTC token issuer.
    pub rtc_issuer_url: String,

    /// Ed25519 PKCS#8 document used to sign session JWTs.
    pub auth_signing_key: SecretBox<Vec<u8>>,

    /// JWT clock skew tolerance in seconds for iat validation.
    pub jwt_clock_skew_seconds: i64,

    /// Bcrypt cost for password hashing.
    pub bcrypt_cost: u32,

    /// Graceful-shutdown drain period in seconds.
    pub drain_seconds: u64,
}

/// `SecretBox<Vec<u8>>` does not implement Clone, so the signing key is
/// re-boxed by hand. Axum's State extractor needs Config to be Clone.
impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            database_url: self.database_url.clone(),
            bind_address: self.bind_address.clone(),
            rtc_app_id: self.rtc_app_id.clone(),
            rtc_app_certificate: self.rtc_app_certificate.clone(),
            rtc_issuer_url: self.rtc_issuer_url.clone(),
            auth_signing_key: SecretBox::new(Box::new(
                self.auth_signing_key.expose_secret().clone(),
            )),
            jwt_clock_skew_seconds: self.jwt_clock_skew_seconds,
            bcrypt_cost: self.bcrypt_cost,
            drain_seconds: self.drain_seconds,
        }
    }
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("rtc_app_id", &self.rtc_app_id)
            .field("rtc_app_certificate", &"[REDACTED]")
            .field("rtc_issuer_url", &self.rtc_issuer_url)
            .field("auth_signing_key", &"[REDACTED]")
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid session signing key: {0}")]
    InvalidSigningKey(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = require(vars, "DATABASE_URL")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let rtc_app_id = require(vars, "RTC_APP_ID")?;
        let rtc_app_certificate = SecretString::from(require(vars, "RTC_APP_CERTIFICATE")?);
        let rtc_issuer_url = require(vars, "RTC_ISSUER_URL")?;

        let signing_key_base64 = require(vars, "AUTH_SIGNING_KEY")?;
        let signing_key = general_purpose::STANDARD
            .decode(signing_key_base64)
            .map_err(ConfigError::Base64Error)?;

        // Validate eagerly so a bad key fails at startup, not on the
        // first login.
        Ed25519KeyPair::from_pkcs8(&signing_key).map_err(|_| {
            ConfigError::InvalidSigningKey(
                "AUTH_SIGNING_KEY is not a valid Ed25519 PKCS#8 document".to_string(),
            )
        })?;

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        // Parse drain period with validation
        let drain_seconds = if let Some(value_str) = vars.get("CS_DRAIN_SECONDS") {
            value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "CS_DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_DRAIN_SECONDS
        };

        Ok(Config {
            database_url,
            bind_address,
            rtc_app_id,
            rtc_app_certificate,
            rtc_issuer_url,
            auth_signing_key: SecretBox::new(Box::new(signing_key)),
            jwt_clock_skew_seconds,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            drain_seconds,
        })
    }

    /// The decoded session signing key bytes.
    pub fn signing_key_bytes(&self) -> &[u8] {
        self.auth_signing_key.expose_secret()
    }
}

fn require(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}
