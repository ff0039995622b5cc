//! RTC token issuer client.
//!
//! The issuer is an external service that signs channel access tokens
//! given (channel, account, role, expiry). It is reached over HTTPS and
//! authenticated with the application certificate as a Bearer
//! credential. This module exposes it behind the [`TokenIssuer`] trait
//! so handlers can hold a mock in tests.
//!
//! # Security
//!
//! - Timeouts bound every request (10 s total, 5 s connect)
//! - The certificate never appears in logs or Debug output
//! - Upstream failure detail is logged server-side; callers receive
//!   an upstream error with status and summarized message

use crate::errors::CallError;
use crate::models::CallRole;
use crate::observability::metrics;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, instrument, warn};

/// Total request timeout for issuer calls in seconds.
const ISSUER_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Connect timeout for issuer calls in seconds.
const ISSUER_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Parameters of one token issuance.
#[derive(Debug, Clone)]
pub struct RtcTokenRequest {
    /// Channel the token grants access to.
    pub channel_name: String,

    /// Account the token is bound to (user UUID or numeric uid as a
    /// string, depending on the operation).
    pub account: String,

    /// Role within the channel.
    pub role: CallRole,

    /// Requested validity in seconds.
    pub expire_seconds: i64,
}

/// External RTC token issuer.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issue a signed token, or fail with `CallError::Upstream`.
    async fn issue(&self, request: &RtcTokenRequest) -> Result<String, CallError>;
}

/// Wire format of the issuer request body.
#[derive(Debug, Serialize)]
struct IssuerRequestBody<'a> {
    app_id: &'a str,
    channel_name: &'a str,
    account: &'a str,
    /// 1 = publisher (host), 2 = subscriber (audience).
    role: u8,
    expire_seconds: i64,
}

/// Wire format of the issuer success response.
#[derive(Debug, Deserialize)]
struct IssuerResponseBody {
    token: String,
}

/// HTTP-backed issuer client.
pub struct HttpTokenIssuer {
    client: Client,
    base_url: String,
    app_id: String,
    app_certificate: SecretString,
}

impl HttpTokenIssuer {
    /// Create a new issuer client.
    ///
    /// # Errors
    ///
    /// Returns `CallError::Internal` if the HTTP client cannot be built.
    pub fn new(
        base_url: String,
        app_id: String,
        app_certificate: SecretString,
    ) -> Result<Self, CallError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(ISSUER_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(ISSUER_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "cs.services.token_issuer", error = %e, "Failed to build HTTP client");
                CallError::Internal
            })?;

        Ok(Self {
            client,
            base_url,
            app_id,
            app_certificate,
        })
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    #[instrument(
        skip(self, request),
        fields(channel = %request.channel_name, role = %request.role),
        name = "cs.token_issuer.issue"
    )]
    async fn issue(&self, request: &RtcTokenRequest) -> Result<String, CallError> {
        let url = format!("{}/rtc/token", self.base_url);

        let body = IssuerRequestBody {
            app_id: &self.app_id,
            channel_name: &request.channel_name,
            account: &request.account,
            role: request.role.rtc_role_code(),
            expire_seconds: request.expire_seconds,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.app_certificate.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "cs.services.token_issuer", error = %e, "Issuer request failed");
                metrics::record_issuer_request("failure", start.elapsed());
                CallError::Upstream {
                    status: None,
                    message: format!("Token issuer unreachable: {}", e),
                }
            })?;

        let status = response.status();
        let outcome = if status.is_success() {
            "success"
        } else {
            "failure"
        };
        metrics::record_issuer_request(outcome, start.elapsed());

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(
                target: "cs.services.token_issuer",
                status = %status,
                body = %detail,
                "Issuer rejected token request"
            );
            return Err(CallError::Upstream {
                status: Some(status.as_u16()),
                message: format!("Token issuer returned {}", status),
            });
        }

        let parsed: IssuerResponseBody = response.json().await.map_err(|e| {
            error!(target: "cs.services.token_issuer", error = %e, "Failed to parse issuer response");
            CallError::Upstream {
                status: Some(status.as_u16()),
                message: "Token issuer returned an unparseable response".to_string(),
            }
        })?;

        Ok(parsed.token)
    }
}

/// In-memory issuer for tests.
///
/// Returns a distinct token string on every call; can be flipped into
/// failure mode to exercise upstream error paths.
#[derive(Default)]
pub struct MockTokenIssuer {
    counter: AtomicU64,
    fail: AtomicBool,
}

impl MockTokenIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `issue` call fail with an upstream error.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Number of issuance calls observed so far.
    pub fn issued_count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenIssuer for MockTokenIssuer {
    async fn issue(&self, request: &RtcTokenRequest) -> Result<String, CallError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CallError::Upstream {
                status: Some(503),
                message: "mock issuer failure".to_string(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "mock-token-{}-{}-{}-{}",
            request.channel_name, request.account, request.role, n
        ))
    }
}
