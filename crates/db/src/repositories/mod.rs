//! Repository abstractions for data access.
//!
//! Repositories implement the core store traits, hiding the `SeaORM`
//! implementation details from the rest of the application.

pub mod session;
pub mod user;

pub use session::SessionRepository;
pub use user::UserRepository;

use sea_orm::{DbErr, SqlErr};
use upwatch_core::auth::StoreError;

/// Maps a database error onto the store taxonomy.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::Conflict(detail),
        _ => StoreError::Database(err.to_string()),
    }
}
