//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, validates
//! the session JWT, and injects the authenticated identity into request
//! extensions.

use crate::auth::SessionKeys;
use crate::errors::CallError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Session token keys shared with the signing side.
    pub session_keys: Arc<SessionKeys>,
}

/// Identity of the authenticated caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Authentication middleware that validates session tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns 401 Unauthorized with WWW-Authenticate header if the token
///   is missing or invalid
/// - Continues to the next handler with [`AuthenticatedUser`] in
///   extensions if the token is valid
#[instrument(skip(state, req, next), name = "cs.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, CallError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "cs.middleware.auth", "Missing Authorization header");
            CallError::InvalidToken("Missing Authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "cs.middleware.auth", "Invalid Authorization header format");
        CallError::InvalidToken("Invalid Authorization header format".to_string())
    })?;

    let claims = state.session_keys.verify(token)?;
    let user = AuthenticatedUser {
        user_id: claims.user_id()?,
        email: claims.email,
    };

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Extension, Router};
    use ring::rand::SystemRandom;
    use ring::signature::Ed25519KeyPair;
    use tower::ServiceExt;

    fn test_keys() -> Arc<SessionKeys> {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).expect("keygen");
        Arc::new(SessionKeys::new(pkcs8.as_ref(), 300).unwrap())
    }

    async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> String {
        user.user_id.to_string()
    }

    fn test_app(keys: Arc<SessionKeys>) -> Router {
        let auth_state = Arc::new(AuthState { session_keys: keys });
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
    }

    #[tokio::test]
    async fn test_missing_header_is_401() {
        let app = test_app(test_keys());

        let request = axum::http::Request::builder()
            .uri("/whoami")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));
    }

    #[tokio::test]
    async fn test_non_bearer_header_is_401() {
        let app = test_app(test_keys());

        let request = axum::http::Request::builder()
            .uri("/whoami")
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let keys = test_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "alice@example.com").unwrap();
        let app = test_app(keys);

        let request = axum::http::Request::builder()
            .uri("/whoami")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(body, user_id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_token_signed_by_other_key_is_401() {
        let signing_keys = test_keys();
        let token = signing_keys
            .sign(Uuid::new_v4(), "alice@example.com")
            .unwrap();

        let app = test_app(test_keys());
        let request = axum::http::Request::builder()
            .uri("/whoami")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
