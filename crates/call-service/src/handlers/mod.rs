//! HTTP request handlers for the call service.

pub mod auth;
pub mod calls;
pub mod health;
pub mod metrics;
pub mod tokens;

pub use auth::{login, register};
pub use calls::{create_call, join_call, request_token};
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use tokens::list_my_tokens;
