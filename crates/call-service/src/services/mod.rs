//! Business logic layer.
//!
//! - `account_service` - registration, login, session issuance
//! - `call_session` - the call/membership/token workflow
//! - `token_issuer` - RTC token issuer client (trait + HTTP and mock impls)

pub mod account_service;
pub mod call_session;
pub mod token_issuer;

pub use token_issuer::{HttpTokenIssuer, MockTokenIssuer, RtcTokenRequest, TokenIssuer};
