//! Domain enums and HTTP request/response types.
//!
//! Request DTOs carry `deny_unknown_fields` and explicit `validate()`
//! methods; validation failures surface as 400s before any side effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Minimum accepted password length for registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// ============================================================================
// Domain enums
// ============================================================================

/// Type of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Video,
    Voice,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Video => "video",
            CallType::Voice => "voice",
        }
    }
}

impl FromStr for CallType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(CallType::Video),
            "voice" => Ok(CallType::Voice),
            _ => Err(format!(
                "Invalid call type '{}', must be 'video' or 'voice'",
                s
            )),
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a call.
///
/// Only `pending` is reachable through this service; the other states
/// are driven by out-of-scope signaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Pending,
    Ongoing,
    Completed,
    Cancelled,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::Ongoing => "ongoing",
            CallStatus::Completed => "completed",
            CallStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CallStatus::Pending),
            "ongoing" => Ok(CallStatus::Ongoing),
            "completed" => Ok(CallStatus::Completed),
            "cancelled" => Ok(CallStatus::Cancelled),
            _ => Err(format!("Invalid call status: {}", s)),
        }
    }
}

/// Role of a user within a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallRole {
    Host,
    Audience,
}

impl CallRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallRole::Host => "host",
            CallRole::Audience => "audience",
        }
    }

    /// Numeric role code used by the RTC token issuer
    /// (1 = publisher, 2 = subscriber).
    pub fn rtc_role_code(&self) -> u8 {
        match self {
            CallRole::Host => 1,
            CallRole::Audience => 2,
        }
    }
}

impl FromStr for CallRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(CallRole::Host),
            "audience" => Ok(CallRole::Audience),
            _ => Err(format!(
                "Invalid role '{}', must be 'host' or 'audience'",
                s
            )),
        }
    }
}

impl fmt::Display for CallRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Auth requests/responses
// ============================================================================

/// Request body for POST /v1/auth/register.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_email(&self.email) {
            return Err("Invalid email format".to_string());
        }

        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ));
        }

        if self.display_name.trim().is_empty() {
            return Err("Display name cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Request body for POST /v1/auth/login.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

// ============================================================================
// Call requests/responses
// ============================================================================

/// Request body for POST /v1/calls.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCallRequest {
    /// Call type (default: video).
    pub call_type: Option<String>,
}

impl CreateCallRequest {
    /// Resolve the requested call type, defaulting to video.
    pub fn call_type(&self) -> Result<CallType, String> {
        match &self.call_type {
            Some(s) => CallType::from_str(s),
            None => Ok(CallType::Video),
        }
    }
}

/// Response for POST /v1/calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCallResponse {
    pub channel_id: String,
}

/// Request body for POST /v1/calls/{channel_id}/token.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestTokenRequest {
    /// Numeric RTC uid the token is bound to.
    pub uid: i64,
    pub role: String,
}

impl RequestTokenRequest {
    pub fn role(&self) -> Result<CallRole, String> {
        CallRole::from_str(&self.role)
    }
}

/// Request body for POST /v1/calls/{channel_id}/join.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinCallRequest {
    pub role: String,
}

impl JoinCallRequest {
    pub fn role(&self) -> Result<CallRole, String> {
        CallRole::from_str(&self.role)
    }
}

/// Response carrying an issued RTC token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtcTokenResponse {
    pub token: String,
}

/// One entry in the token listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Channel identifier of the call the token was issued for.
    pub call_id: String,
    pub token: String,
    pub generated_at: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
}

/// Response for GET /v1/tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenListResponse {
    pub tokens: Vec<TokenEntry>,
}

// ============================================================================
// Operational responses
// ============================================================================

/// Response for the readiness probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Simple email validation: non-empty local part, dotted domain with
/// no empty labels.
pub fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let (local, domain) = match (parts.first(), parts.get(1)) {
        (Some(l), Some(d)) => (*l, *d),
        _ => return false,
    };

    if local.is_empty() {
        return false;
    }

    let domain_parts: Vec<&str> = domain.split('.').collect();
    if domain_parts.len() < 2 {
        return false;
    }

    domain_parts.iter().all(|p| !p.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_call_type_parsing() {
        assert_eq!(CallType::from_str("video").ok(), Some(CallType::Video));
        assert_eq!(CallType::from_str("voice").ok(), Some(CallType::Voice));
        assert!(CallType::from_str("screencast").is_err());
        assert!(CallType::from_str("Video").is_err());
    }

    #[test]
    fn test_call_role_parsing() {
        assert_eq!(CallRole::from_str("host").ok(), Some(CallRole::Host));
        assert_eq!(CallRole::from_str("audience").ok(), Some(CallRole::Audience));
        assert!(CallRole::from_str("moderator").is_err());
    }

    #[test]
    fn test_rtc_role_codes() {
        assert_eq!(CallRole::Host.rtc_role_code(), 1);
        assert_eq!(CallRole::Audience.rtc_role_code(), 2);
    }

    #[test]
    fn test_call_status_round_trip() {
        for status in [
            CallStatus::Pending,
            CallStatus::Ongoing,
            CallStatus::Completed,
            CallStatus::Cancelled,
        ] {
            assert_eq!(CallStatus::from_str(status.as_str()).ok(), Some(status));
        }
    }

    #[test]
    fn test_create_call_request_defaults_to_video() {
        let request = CreateCallRequest { call_type: None };
        assert_eq!(request.call_type().unwrap(), CallType::Video);
    }

    #[test]
    fn test_create_call_request_rejects_unknown_type() {
        let request = CreateCallRequest {
            call_type: Some("hologram".to_string()),
        };
        assert!(request.call_type().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            email: "alice@example.com".to_string(),
            password: "long-enough".to_string(),
            display_name: "Alice".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            password: "short".to_string(),
            ..valid.clone()
        };
        assert!(short_password
            .validate()
            .unwrap_err()
            .contains("at least 8"));

        let blank_name = RegisterRequest {
            display_name: "   ".to_string(),
            ..valid
        };
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b@sub.example.co"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice@.com"));
        assert!(!is_valid_email("alice@example..com"));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn test_join_request_rejects_unknown_fields() {
        let json = r#"{"role": "host", "channel_id": "abc"}"#;
        let result: Result<JoinCallRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_token_deserialization() {
        let json = r#"{"uid": 42, "role": "audience"}"#;
        let request: RequestTokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.uid, 42);
        assert_eq!(request.role().unwrap(), CallRole::Audience);
    }
}
