//! Test utilities for the call service.
//!
//! - [`server_harness`] - spawn real server instances against an
//!   isolated database
//! - [`token_builders`] - deterministic keypairs and malformed-token
//!   builders for auth attack tests

pub mod server_harness;
pub mod token_builders;

pub use server_harness::TestCallServer;
pub use token_builders::TestKeypair;
