//! Authentication types for JWT claims and request/response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::{SessionId, UserId};

/// JWT claims shared by access and refresh tokens.
///
/// The two classes differ only in lifetime and signing secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user.
    pub user_id: UserId,
    /// Unique token ID, so two tokens minted in the same second never collide.
    pub jti: Uuid,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user, issued now.
    #[must_use]
    pub fn new(user_id: UserId, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            jti: Uuid::new_v4(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// Token pair returned after successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived).
    pub access_token: String,
    /// Refresh token (long-lived, single use).
    pub refresh_token: String,
    /// Access token expiration in seconds.
    pub expires_in: i64,
}

impl TokenPair {
    /// Creates a new token pair.
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
        }
    }
}

/// Registration request payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username, unique and case-sensitive.
    #[validate(length(min = 3, max = 30))]
    pub username: String,
    /// Plaintext password.
    #[validate(length(min = 6))]
    pub password: String,
    /// Optional contact email.
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    /// Optional external messenger contact (e.g. a chat id for alerts).
    pub contact_id: Option<i64>,
    /// Device fingerprint the new session is bound to. At most 255
    /// characters, the width of the stored column.
    #[validate(length(min = 1, max = 255))]
    pub fingerprint: String,
}

/// Login request payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1))]
    pub username: String,
    /// Plaintext password.
    #[validate(length(min = 1))]
    pub password: String,
    /// Device fingerprint.
    #[validate(length(min = 1, max = 255))]
    pub fingerprint: String,
}

/// Refresh token request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    /// The refresh token to redeem.
    #[validate(length(min = 1))]
    pub refresh_token: String,
    /// Device fingerprint the session was created with.
    #[validate(length(min = 1, max = 255))]
    pub fingerprint: String,
}

/// Logout request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LogoutRequest {
    /// The refresh token to invalidate.
    #[validate(length(min = 1))]
    pub refresh_token: String,
    /// Device fingerprint the session was created with.
    #[validate(length(min = 1, max = 255))]
    pub fingerprint: String,
}

/// A live session as shown in device listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session ID.
    pub id: SessionId,
    /// Device fingerprint.
    pub fingerprint: String,
    /// When the session (and its refresh token) expires.
    pub expires_at: DateTime<Utc>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// Response of a "log out everywhere" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutAllResponse {
    /// Number of sessions removed.
    pub revoked: u64,
}
