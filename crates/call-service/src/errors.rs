//! Call Service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse`
//! impl. Error messages returned to clients are intentionally generic for
//! internal failures; actual errors are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Call Service error type.
///
/// Maps to appropriate HTTP status codes:
/// - Database, Internal: 500 Internal Server Error
/// - BadRequest: 400 Bad Request
/// - InvalidCredentials, InvalidToken: 401 Unauthorized
/// - NotMember: 403 Forbidden
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - Upstream: 502 Bad Gateway
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("User is not a member of this call")]
    NotMember,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Token issuer error ({status:?}): {message}")]
    Upstream {
        /// HTTP status returned by the issuer, if it responded at all.
        status: Option<u16>,
        message: String,
    },

    #[error("Internal server error")]
    Internal,
}

impl CallError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            CallError::Database(_) | CallError::Internal => 500,
            CallError::BadRequest(_) => 400,
            CallError::InvalidCredentials | CallError::InvalidToken(_) => 401,
            CallError::NotMember => 403,
            CallError::NotFound(_) => 404,
            CallError::Conflict(_) => 409,
            CallError::Upstream { .. } => 502,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for CallError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            CallError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "cs.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            CallError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            CallError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            CallError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason.clone())
            }
            CallError::NotMember => (
                StatusCode::FORBIDDEN,
                "NOT_MEMBER",
                "User is not a member of this call".to_string(),
            ),
            CallError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            CallError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            CallError::Upstream { status, message } => {
                // Upstream detail is logged server-side; clients get a summary
                tracing::warn!(
                    target: "cs.upstream",
                    upstream_status = ?status,
                    message = %message,
                    "RTC token issuer request failed"
                );
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "RTC token issuer request failed".to_string(),
                )
            }
            CallError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) =
                "Bearer realm=\"call-service-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Convert sqlx errors to CallError
impl From<sqlx::Error> for CallError {
    fn from(err: sqlx::Error) -> Self {
        CallError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_not_member() {
        let error = CallError::NotMember;
        assert_eq!(
            format!("{}", error),
            "User is not a member of this call"
        );
    }

    #[test]
    fn test_display_upstream() {
        let error = CallError::Upstream {
            status: Some(503),
            message: "issuer down".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Token issuer error (Some(503)): issuer down"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CallError::Database("test".to_string()).status_code(), 500);
        assert_eq!(CallError::BadRequest("test".to_string()).status_code(), 400);
        assert_eq!(CallError::InvalidCredentials.status_code(), 401);
        assert_eq!(
            CallError::InvalidToken("test".to_string()).status_code(),
            401
        );
        assert_eq!(CallError::NotMember.status_code(), 403);
        assert_eq!(CallError::NotFound("test".to_string()).status_code(), 404);
        assert_eq!(CallError::Conflict("test".to_string()).status_code(), 409);
        assert_eq!(
            CallError::Upstream {
                status: None,
                message: "test".to_string()
            }
            .status_code(),
            502
        );
        assert_eq!(CallError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_database_error_is_generic() {
        let error = CallError::Database("connection refused at 10.0.0.5".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "DATABASE_ERROR");
        // Internal detail must not leak
        assert!(!body_json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_into_response_invalid_token_has_www_authenticate() {
        let error = CallError::InvalidToken("token expired".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response.headers().get("WWW-Authenticate");
        assert!(www_auth.is_some());
        let www_auth_str = www_auth.unwrap().to_str().unwrap();
        assert!(www_auth_str.contains("Bearer realm=\"call-service-api\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INVALID_TOKEN");
        assert_eq!(body_json["error"]["message"], "token expired");
    }

    #[tokio::test]
    async fn test_into_response_not_member() {
        let error = CallError::NotMember;
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_MEMBER");
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let error = CallError::NotFound("Call not found".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_FOUND");
        assert_eq!(body_json["error"]["message"], "Call not found");
    }

    #[tokio::test]
    async fn test_into_response_conflict() {
        let error = CallError::Conflict("An account with this email already exists".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_into_response_upstream_summarized() {
        let error = CallError::Upstream {
            status: Some(500),
            message: "stack trace with internal hostnames".to_string(),
        };
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "UPSTREAM_ERROR");
        // Upstream detail is summarized, not forwarded verbatim
        assert_eq!(
            body_json["error"]["message"],
            "RTC token issuer request failed"
        );
    }

    #[tokio::test]
    async fn test_into_response_bad_request() {
        let error = CallError::BadRequest("Invalid role, must be 'host' or 'audience'".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BAD_REQUEST");
        assert_eq!(
            body_json["error"]["message"],
            "Invalid role, must be 'host' or 'audience'"
        );
    }
}
