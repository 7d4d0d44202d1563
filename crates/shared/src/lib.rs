//! Shared types, errors, and configuration for Upwatch.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for users and sessions
//! - The caller-visible error taxonomy
//! - Configuration management
//! - JWT issuing and validation for access and refresh tokens
//! - Request and response payloads of the auth API

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;


pub use auth::{Claims, TokenPair};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{IssuedTokens, TokenConfig, TokenError, TokenIssuer, TokenKind};
pub use types::{SessionId, UserId};
