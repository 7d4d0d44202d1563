//! JWT token generation and validation.
//!
//! Access and refresh tokens are two independent classes: each is signed with
//! its own secret, so a leaked access secret cannot mint refresh tokens and
//! vice versa. Only HS256 is accepted on validation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;

use crate::auth::Claims;
use crate::types::UserId;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Token issuer configuration.
#[derive(Clone)]
pub struct TokenConfig {
    /// Secret for signing access tokens.
    pub access_secret: String,
    /// Secret for signing refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,
    /// Access token lifetime.
    pub access_ttl: Duration,
    /// Refresh token lifetime. Must exceed `access_ttl`.
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"[hidden]")
            .field("refresh_secret", &"[hidden]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Errors that can occur during token operations.
///
/// Validation failures come in three kinds; callers decide between "refresh"
/// and "log in again" by matching on them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token is structurally malformed or uses an unexpected algorithm.
    #[error("token is malformed")]
    WrongFormat,

    /// Signature mismatch or unexpected claims.
    #[error("invalid token")]
    Invalid,

    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    Encoding(String),

    /// The issuer was configured with unusable secrets or lifetimes.
    #[error("invalid token configuration: {0}")]
    Config(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::Base64(_)
            | ErrorKind::Utf8(_) => Self::WrongFormat,
            _ => Self::Invalid,
        }
    }
}

/// The two token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Short-lived, stateless bearer credential.
    Access,
    /// Long-lived credential backed by a server-side session.
    Refresh,
}

/// A freshly minted token pair with its expiry instants.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    /// Signed access token.
    pub access_token: String,
    /// Signed refresh token.
    pub refresh_token: String,
    /// When the access token expires.
    pub access_expires_at: DateTime<Utc>,
    /// When the refresh token expires.
    pub refresh_expires_at: DateTime<Utc>,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Stateless signer and verifier for access and refresh tokens.
pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_keys", &"[hidden]")
            .field("refresh_keys", &"[hidden]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates a new token issuer.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Config` if a secret is empty, both secrets are the
    /// same, a lifetime is not positive, or the refresh lifetime does not
    /// exceed the access lifetime.
    pub fn new(config: TokenConfig) -> Result<Self, TokenError> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(TokenError::Config("secrets must not be empty".into()));
        }
        if config.access_secret == config.refresh_secret {
            return Err(TokenError::Config(
                "access and refresh secrets must differ".into(),
            ));
        }
        if config.access_ttl <= Duration::zero() {
            return Err(TokenError::Config("access ttl must be positive".into()));
        }
        if config.refresh_ttl <= config.access_ttl {
            return Err(TokenError::Config(
                "refresh ttl must exceed access ttl".into(),
            ));
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;

        Ok(Self {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            validation,
        })
    }

    /// Mints an access token and a refresh token for a user.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn generate(&self, user_id: UserId) -> Result<IssuedTokens, TokenError> {
        let now = Utc::now();
        let access_expires_at = now + self.access_ttl;
        let refresh_expires_at = now + self.refresh_ttl;

        let access_token = self.sign(
            TokenKind::Access,
            &Claims::new(user_id, now, access_expires_at),
        )?;
        let refresh_token = self.sign(
            TokenKind::Refresh,
            &Claims::new(user_id, now, refresh_expires_at),
        )?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Validates an access token and returns the user it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::WrongFormat` or
    /// `TokenError::Invalid`.
    pub fn validate_access(&self, token: &str) -> Result<UserId, TokenError> {
        self.claims(TokenKind::Access, token).map(|c| c.user_id())
    }

    /// Validates a refresh token's signature and lifetime.
    ///
    /// A valid refresh token is honored only if it also matches a live session.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::WrongFormat` or
    /// `TokenError::Invalid`.
    pub fn validate_refresh(&self, token: &str) -> Result<UserId, TokenError> {
        self.claims(TokenKind::Refresh, token).map(|c| c.user_id())
    }

    /// Decodes and verifies a token of the given class.
    ///
    /// # Errors
    ///
    /// Same as [`Self::validate_access`].
    pub fn claims(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)
    }

    /// Returns the access token lifetime.
    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Returns the refresh token lifetime.
    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Returns the access token expiration in seconds.
    #[must_use]
    pub fn access_token_expires_in(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    fn sign(&self, kind: TokenKind, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.keys(kind).encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    const fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}
