//! `SeaORM` entity definitions.

pub mod sessions;
pub mod users;
