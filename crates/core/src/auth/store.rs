//! Persistence contracts for users and sessions.
//!
//! The database crate implements these traits with SeaORM; [`super::memory`]
//! implements them in-process. Row-level atomicity is the store's job: the
//! coordinator holds no locks of its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use upwatch_shared::{SessionId, UserId, auth::SessionInfo};

/// Errors reported by a store implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// Any other storage failure.
    #[error("database error: {0}")]
    Database(String),
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Unique, case-sensitive username.
    pub username: String,
    /// Optional contact email.
    pub email: Option<String>,
    /// Optional external messenger contact.
    pub contact_id: Option<i64>,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// Optional contact details supplied at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    /// Contact email.
    pub email: Option<String>,
    /// External messenger contact.
    pub contact_id: Option<i64>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Username.
    pub username: String,
    /// Already-hashed password.
    pub password_hash: String,
    /// Contact details.
    pub contact: ContactDetails,
}

/// A per-device session backing one outstanding refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Session ID.
    pub id: SessionId,
    /// Owner.
    pub user_id: UserId,
    /// SHA-256 hex digest of the refresh token.
    pub refresh_token_digest: String,
    /// Device fingerprint.
    pub fingerprint: String,
    /// Expiry, equal to the refresh token's expiry.
    pub expires_at: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Returns true once the session can no longer be redeemed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            fingerprint: session.fingerprint,
            expires_at: session.expires_at,
            created_at: session.created_at,
        }
    }
}

/// Input for creating a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Owner.
    pub user_id: UserId,
    /// Raw refresh token; stores persist only its digest.
    pub refresh_token: String,
    /// Device fingerprint.
    pub fingerprint: String,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
}

/// Digest under which a refresh token is persisted and looked up.
#[must_use]
pub fn refresh_token_digest(refresh_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(refresh_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// User persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. A taken username yields `StoreError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<UserId, StoreError>;

    /// Finds a user by ID.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Finds a user by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Deletes a user and, by cascade, every session they own.
    /// Returns false if no such user existed.
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;
}

/// Session persistence.
///
/// `(user_id, refresh token digest, fingerprint)` resolves at most one row.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a session.
    async fn create_session(&self, session: NewSession) -> Result<SessionId, StoreError>;

    /// Finds the unexpired session matching all three parts exactly.
    async fn get_session(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
    ) -> Result<Option<Session>, StoreError>;

    /// Lists a user's unexpired sessions, newest first.
    async fn get_user_sessions(&self, user_id: UserId) -> Result<Vec<Session>, StoreError>;

    /// Deletes one session. Deleting a missing session is not an error.
    async fn delete_session(&self, id: SessionId) -> Result<(), StoreError>;

    /// Deletes every session of a user, returning how many were removed.
    async fn delete_all_sessions(&self, user_id: UserId) -> Result<u64, StoreError>;

    /// Atomically replaces the session matching the triple with `replacement`.
    ///
    /// Returns `None` and writes nothing when no unexpired session matches, so
    /// a refresh token is redeemed at most once even under concurrent calls.
    async fn rotate_session(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
        replacement: NewSession,
    ) -> Result<Option<SessionId>, StoreError>;

    /// Deletes a user's oldest sessions so at most `keep` remain.
    async fn evict_oldest_sessions(&self, user_id: UserId, keep: u64) -> Result<u64, StoreError>;

    /// Deletes every expired session.
    async fn delete_expired(&self) -> Result<u64, StoreError>;
}
