//! Database access layer.
//!
//! Each module owns the SQL for one table. Nothing outside this layer
//! writes queries.

pub mod call_members;
pub mod calls;
pub mod rtc_tokens;
pub mod users;
