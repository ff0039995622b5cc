//! Call Service Library
//!
//! Thin backend for a video/voice calling application: user accounts,
//! call records, call membership, and RTC token issuance through an
//! external token-signing service.
//!
//! # Modules
//!
//! - `auth` - Session token signing/validation and password hashing
//! - `config` - Service configuration
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics middleware
//! - `models` - Request/response types and domain enums
//! - `repositories` - Database access layer
//! - `routes` - Router construction
//! - `services` - Business logic and the RTC token issuer client

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
