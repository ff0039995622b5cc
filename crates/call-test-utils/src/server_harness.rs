//! Test server harness for E2E testing
//!
//! Provides TestCallServer for spawning real call-service instances in
//! tests, with either an in-process mock issuer or a wiremock-backed
//! HTTP issuer.

use crate::token_builders::TestKeypair;
use call_service::auth::SessionKeys;
use call_service::config::Config;
use call_service::routes::{self, AppState};
use call_service::services::{HttpTokenIssuer, MockTokenIssuer, TokenIssuer};
use secrecy::{SecretBox, SecretString};
use serde_json::json;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Bcrypt cost used by test servers. Low to keep auth tests fast.
pub const TEST_BCRYPT_COST: u32 = 4;

/// Certificate the test issuer expects as the Bearer credential.
pub const TEST_RTC_CERTIFICATE: &str = "test-rtc-certificate";

/// Test harness for spawning the call service in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_call_flow_e2e(pool: PgPool) -> Result<()> {
///     let server = TestCallServer::spawn(pool).await?;
///     let (user_id, token) = server.register_user("alice@example.com").await?;
///
///     let response = reqwest::Client::new()
///         .post(format!("{}/v1/calls", server.url()))
///         .bearer_auth(&token)
///         .json(&serde_json::json!({}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 201);
///     Ok(())
/// }
/// ```
pub struct TestCallServer {
    addr: SocketAddr,
    pool: PgPool,
    keypair: TestKeypair,
    session_keys: Arc<SessionKeys>,
    mock_issuer: Option<Arc<MockTokenIssuer>>,
    _handle: JoinHandle<()>,
}

impl TestCallServer {
    /// Spawn a test server with an in-process mock issuer.
    ///
    /// The server binds to a random port and runs in the background
    /// until the harness is dropped. The mock issuer is reachable via
    /// [`mock_issuer`](Self::mock_issuer) for failure injection and
    /// call counting.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        let issuer = Arc::new(MockTokenIssuer::new());
        let mut server =
            Self::spawn_inner(pool, issuer.clone() as Arc<dyn TokenIssuer>, None).await?;
        server.mock_issuer = Some(issuer);
        Ok(server)
    }

    /// Spawn a test server whose issuer client points at `issuer_url`
    /// (typically a wiremock server).
    pub async fn spawn_with_issuer_url(
        pool: PgPool,
        issuer_url: &str,
    ) -> Result<Self, anyhow::Error> {
        let issuer = Arc::new(
            HttpTokenIssuer::new(
                issuer_url.to_string(),
                "test-app-id".to_string(),
                SecretString::from(TEST_RTC_CERTIFICATE),
            )
            .map_err(|e| anyhow::anyhow!("Failed to build issuer client: {}", e))?,
        );
        Self::spawn_inner(pool, issuer, Some(issuer_url.to_string())).await
    }

    async fn spawn_inner(
        pool: PgPool,
        issuer: Arc<dyn TokenIssuer>,
        issuer_url: Option<String>,
    ) -> Result<Self, anyhow::Error> {
        let keypair = TestKeypair::new(1);

        let session_keys = Arc::new(
            SessionKeys::new(keypair.pkcs8_der(), 300)
                .map_err(|e| anyhow::anyhow!("Failed to build session keys: {}", e))?,
        );

        // Build configuration
        let config = Config {
            database_url: String::new(), // Not used after connection established
            bind_address: "127.0.0.1:0".to_string(),
            rtc_app_id: "test-app-id".to_string(),
            rtc_app_certificate: SecretString::from(TEST_RTC_CERTIFICATE),
            rtc_issuer_url: issuer_url.unwrap_or_else(|| "http://127.0.0.1:1".to_string()),
            auth_signing_key: SecretBox::new(Box::new(keypair.pkcs8_der().to_vec())),
            jwt_clock_skew_seconds: 300,
            bcrypt_cost: TEST_BCRYPT_COST,
            drain_seconds: 0,
        };

        // Create application state
        let state = Arc::new(AppState {
            pool: pool.clone(),
            config,
            issuer,
            session_keys: session_keys.clone(),
        });

        // Initialize metrics recorder for the test server.
        // This may fail if already installed in the test process; in
        // that case build a standalone recorder without installing it.
        let metrics_handle =
            match call_service::observability::metrics::init_metrics_recorder() {
                Ok(handle) => handle,
                Err(_) => {
                    use metrics_exporter_prometheus::PrometheusBuilder;
                    let recorder = PrometheusBuilder::new().build_recorder();
                    recorder.handle()
                }
            };

        // Build routes using call-service's real route builder
        let app = routes::build_routes(state, metrics_handle);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            keypair,
            session_keys,
            mock_issuer: None,
            _handle: handle,
        })
    }

    /// Get reference to the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The keypair the server signs session tokens with.
    pub fn keypair(&self) -> &TestKeypair {
        &self.keypair
    }

    /// The in-process mock issuer, when spawned with [`spawn`](Self::spawn).
    pub fn mock_issuer(&self) -> &MockTokenIssuer {
        self.mock_issuer
            .as_deref()
            .expect("server was not spawned with a mock issuer")
    }

    /// Register an account through the real endpoint and return its
    /// user id and session token.
    pub async fn register_user(&self, email: &str) -> Result<(Uuid, String), anyhow::Error> {
        let response = reqwest::Client::new()
            .post(format!("{}/v1/auth/register", self.url()))
            .json(&json!({
                "email": email,
                "password": "correct-horse-battery",
                "display_name": email.split('@').next().unwrap_or("user"),
            }))
            .send()
            .await?;

        if response.status() != 201 {
            anyhow::bail!(
                "Registration failed with status {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let body: serde_json::Value = response.json().await?;
        let user_id = body["user_id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing user_id in response"))?
            .parse()?;
        let access_token = body["access_token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing access_token in response"))?
            .to_string();

        Ok((user_id, access_token))
    }

    /// Mint a session token directly with the server's signing key,
    /// bypassing the registration endpoint. The user id does not need
    /// to exist in the database.
    pub fn mint_session_token(&self, user_id: Uuid, email: &str) -> String {
        self.session_keys
            .sign(user_id, email)
            .expect("Failed to sign session token")
    }
}

impl Drop for TestCallServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so the test tears down immediately.
        self._handle.abort();
    }
}
