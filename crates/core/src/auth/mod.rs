//! Authentication and session lifecycle.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - The user and session store contracts, plus an in-memory store
//! - `UserDirectory` for registration and credential checks
//! - `SessionManager` for per-device refresh sessions
//! - `AuthService`, which ties them to the token issuer

pub mod directory;
pub mod error;
pub mod memory;
pub mod password;
pub mod service;
pub mod sessions;
pub mod store;


pub use directory::UserDirectory;
pub use error::{AuthError, AuthErrorKind, AuthResult};
pub use memory::InMemoryStore;
pub use password::{PasswordError, PasswordHashing};
pub use service::{AuthService, SessionPolicy};
pub use sessions::SessionManager;
pub use store::{
    ContactDetails, NewSession, NewUser, Session, SessionStore, StoreError, User, UserStore,
    refresh_token_digest,
};
