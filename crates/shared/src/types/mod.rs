//! Shared domain types.

mod id;

pub use id::{SessionId, UserId};
