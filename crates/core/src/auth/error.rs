//! Authentication error types.

use thiserror::Error;
use upwatch_shared::{AppError, TokenError};

use super::store::StoreError;

/// Result type alias using `AuthError`.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors produced by the authentication subsystem.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No user with the given ID or username.
    #[error("user not found")]
    UserNotFound,

    /// Registration with a username that already exists.
    #[error("username already taken")]
    UsernameTaken,

    /// The password hash could not be computed.
    #[error("failed to hash password: {0}")]
    HashingFailed(String),

    /// Login failed. Unknown user and wrong password both end up here.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// No live session matches the presented refresh token and fingerprint.
    #[error("session not found")]
    SessionNotFound,

    /// Token has expired.
    #[error("token has expired")]
    TokenExpired,

    /// Token signature or claims are invalid.
    #[error("invalid token")]
    TokenInvalid,

    /// Token is structurally malformed.
    #[error("malformed token")]
    TokenWrongFormat,

    /// A store call failed.
    #[error("{context}: {source}")]
    Store {
        /// Operation that was running.
        context: &'static str,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// Any other internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Discriminant of [`AuthError`], compared structurally by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// See [`AuthError::UserNotFound`].
    UserNotFound,
    /// See [`AuthError::UsernameTaken`].
    UsernameTaken,
    /// See [`AuthError::HashingFailed`].
    HashingFailed,
    /// See [`AuthError::InvalidCredentials`].
    InvalidCredentials,
    /// See [`AuthError::SessionNotFound`].
    SessionNotFound,
    /// See [`AuthError::TokenExpired`].
    TokenExpired,
    /// See [`AuthError::TokenInvalid`].
    TokenInvalid,
    /// See [`AuthError::TokenWrongFormat`].
    TokenWrongFormat,
    /// Store failures and other internal errors.
    Internal,
}

impl AuthError {
    /// Returns the error's kind.
    #[must_use]
    pub const fn kind(&self) -> AuthErrorKind {
        match self {
            Self::UserNotFound => AuthErrorKind::UserNotFound,
            Self::UsernameTaken => AuthErrorKind::UsernameTaken,
            Self::HashingFailed(_) => AuthErrorKind::HashingFailed,
            Self::InvalidCredentials => AuthErrorKind::InvalidCredentials,
            Self::SessionNotFound => AuthErrorKind::SessionNotFound,
            Self::TokenExpired => AuthErrorKind::TokenExpired,
            Self::TokenInvalid => AuthErrorKind::TokenInvalid,
            Self::TokenWrongFormat => AuthErrorKind::TokenWrongFormat,
            Self::Store { .. } | Self::Internal(_) => AuthErrorKind::Internal,
        }
    }

    /// Wraps a store failure with the operation it interrupted.
    pub(crate) fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { context, source }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::WrongFormat => Self::TokenWrongFormat,
            TokenError::Invalid => Self::TokenInvalid,
            TokenError::Encoding(msg) | TokenError::Config(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserNotFound => Self::NotFound("user not found".into()),
            AuthError::UsernameTaken => Self::Conflict("username already taken".into()),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::SessionNotFound => Self::SessionNotFound,
            AuthError::TokenExpired => Self::TokenExpired,
            AuthError::TokenInvalid => Self::TokenInvalid,
            AuthError::TokenWrongFormat => Self::TokenWrongFormat,
            AuthError::Store { .. } => Self::Database(err.to_string()),
            AuthError::HashingFailed(_) | AuthError::Internal(_) => Self::Internal(err.to_string()),
        }
    }
}
