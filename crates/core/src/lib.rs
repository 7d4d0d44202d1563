//! Core authentication logic for Upwatch.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached through the store traits in [`auth::store`].
//!
//! # Modules
//!
//! - `auth` - Registration, login, logout and refresh-token rotation

pub mod auth;
