//! Caller-visible error taxonomy.
//!
//! Everything that crosses the API boundary is converted into an [`AppError`]
//! first, so the HTTP status and machine-readable code are decided in one place.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Unknown user or wrong password. The two are never distinguished here.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The refresh token does not match a live session.
    #[error("Session not found")]
    SessionNotFound,

    /// Token has expired.
    #[error("Token has expired")]
    TokenExpired,

    /// Token signature or claims are invalid.
    #[error("Invalid token")]
    TokenInvalid,

    /// Token is structurally malformed.
    #[error("Malformed token")]
    TokenWrongFormat,

    /// Authentication is required but was not supplied.
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (e.g., duplicate entry).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials
            | Self::SessionNotFound
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::TokenWrongFormat
            | Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::TokenWrongFormat => "TOKEN_WRONG_FORMAT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true for failures the caller cannot fix by changing the request.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::InvalidCredentials, 401, "INVALID_CREDENTIALS")]
    #[case(AppError::SessionNotFound, 401, "SESSION_NOT_FOUND")]
    #[case(AppError::TokenExpired, 401, "TOKEN_EXPIRED")]
    #[case(AppError::TokenInvalid, 401, "TOKEN_INVALID")]
    #[case(AppError::TokenWrongFormat, 401, "TOKEN_WRONG_FORMAT")]
    #[case(AppError::Unauthorized(String::new()), 401, "UNAUTHORIZED")]
    #[case(AppError::NotFound(String::new()), 404, "NOT_FOUND")]
    #[case(AppError::Validation(String::new()), 400, "VALIDATION_ERROR")]
    #[case(AppError::Conflict(String::new()), 409, "CONFLICT")]
    #[case(AppError::Database(String::new()), 500, "DATABASE_ERROR")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(
        #[case] error: AppError,
        #[case] status: u16,
        #[case] code: &'static str,
    ) {
        assert_eq!(error.status_code(), status);
        assert_eq!(error.error_code(), code);
        assert_eq!(error.is_server_error(), status >= 500);
    }

    #[test]
    fn test_token_kinds_stay_distinct() {
        let codes = [
            AppError::TokenExpired.error_code(),
            AppError::TokenInvalid.error_code(),
            AppError::TokenWrongFormat.error_code(),
        ];
        assert_ne!(codes[0], codes[1]);
        assert_ne!(codes[1], codes[2]);
        assert_ne!(codes[0], codes[2]);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
        assert_eq!(
            AppError::Conflict("msg".into()).to_string(),
            "Conflict: msg"
        );
        assert_eq!(
            AppError::Validation("msg".into()).to_string(),
            "Validation error: msg"
        );
    }
}
