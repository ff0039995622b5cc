//! Session authentication: EdDSA session tokens and password hashing.

pub mod jwt;
pub mod password;

pub use jwt::{SessionClaims, SessionKeys};
