//! The authentication coordinator.
//!
//! `AuthService` composes the token issuer, the user directory and the
//! session manager. It keeps no per-request state, so one instance is shared
//! by every request handler.

use std::sync::Arc;

use tracing::{info, warn};
use upwatch_shared::config::SessionConfig;
use upwatch_shared::{TokenIssuer, TokenPair, UserId, auth::SessionInfo};

use super::directory::UserDirectory;
use super::error::{AuthError, AuthResult};
use super::sessions::SessionManager;
use super::store::{ContactDetails, NewSession};

/// Limits applied when a session is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Maximum live sessions per user. Creating one more evicts the oldest.
    /// `None` means unlimited.
    pub max_sessions_per_user: Option<u32>,
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_sessions_per_user: config.max_per_user,
        }
    }
}

/// Register, login, logout and refresh, plus the session housekeeping built
/// on them.
#[derive(Debug, Clone)]
pub struct AuthService {
    users: UserDirectory,
    sessions: SessionManager,
    tokens: Arc<TokenIssuer>,
    policy: SessionPolicy,
}

impl AuthService {
    /// Creates a coordinator with an unlimited session policy.
    #[must_use]
    pub fn new(users: UserDirectory, sessions: SessionManager, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            users,
            sessions,
            tokens,
            policy: SessionPolicy::default(),
        }
    }

    /// Replaces the session policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The token issuer in use.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Registers a user and opens their first session.
    ///
    /// # Errors
    ///
    /// Returns `UsernameTaken`, `HashingFailed`, or an internal error.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        contact: ContactDetails,
        fingerprint: &str,
    ) -> AuthResult<TokenPair> {
        let user_id = self
            .users
            .register_user(username, password, contact)
            .await?;

        self.create_auth_result(user_id, fingerprint).await
    }

    /// Checks credentials and opens a new session for the device.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown user and for a wrong
    /// password alike, or an internal error. Both failures run one password
    /// verification, so they also take the same time.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        fingerprint: &str,
    ) -> AuthResult<TokenPair> {
        let user = match self.users.get_by_username(username).await {
            Ok(user) => user,
            Err(AuthError::UserNotFound) => {
                self.users.verify_unknown_user(password).await;
                warn!(username, "Login attempt for unknown user");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !self
            .users
            .verify_password(&user.password_hash, password)
            .await
        {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, fingerprint, "User logged in");
        self.create_auth_result(user.id, fingerprint).await
    }

    /// Ends the session behind `refresh_token`. Safe to repeat: a missing
    /// session counts as already logged out.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the store fails.
    pub async fn logout(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
    ) -> AuthResult<()> {
        match self
            .sessions
            .get_session(user_id, refresh_token, fingerprint)
            .await
        {
            Ok(session) => self.sessions.delete_session(session.id).await,
            Err(AuthError::SessionNotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Redeems a refresh token whose owner is already known.
    ///
    /// The presented session is replaced by the new one in a single store
    /// transaction, so the old token cannot be redeemed again and a failure
    /// leaves the old session in place.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the token has no live session for this
    /// device, or an internal error. No tokens are returned on failure.
    pub async fn refresh_tokens(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
    ) -> AuthResult<TokenPair> {
        let issued = self.tokens.generate(user_id)?;

        let replacement = NewSession {
            user_id,
            refresh_token: issued.refresh_token.clone(),
            fingerprint: fingerprint.to_owned(),
            expires_at: issued.refresh_expires_at,
        };

        self.sessions
            .rotate(user_id, refresh_token, fingerprint, replacement)
            .await?;

        Ok(TokenPair::new(
            issued.access_token,
            issued.refresh_token,
            self.tokens.access_token_expires_in(),
        ))
    }

    /// Redeems a refresh token presented without a caller identity.
    ///
    /// The user is taken from the token's verified claims, never from the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns `TokenExpired`, `TokenInvalid` or `TokenWrongFormat` for a bad
    /// token, otherwise as [`Self::refresh_tokens`].
    pub async fn refresh(&self, refresh_token: &str, fingerprint: &str) -> AuthResult<TokenPair> {
        let user_id = self.tokens.validate_refresh(refresh_token)?;
        self.refresh_tokens(user_id, refresh_token, fingerprint)
            .await
    }

    /// Ends every session of a user and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the store fails.
    pub async fn logout_all(&self, user_id: UserId) -> AuthResult<u64> {
        self.sessions.delete_all_sessions(user_id).await
    }

    /// Lists a user's live sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the store fails.
    pub async fn list_sessions(&self, user_id: UserId) -> AuthResult<Vec<SessionInfo>> {
        let sessions = self.sessions.get_all_user_sessions(user_id).await?;
        Ok(sessions.into_iter().map(SessionInfo::from).collect())
    }

    /// Deletes a user together with all their sessions.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or an internal error.
    pub async fn delete_account(&self, user_id: UserId) -> AuthResult<()> {
        self.users.delete_user(user_id).await
    }

    /// Resolves an access token to its user.
    ///
    /// # Errors
    ///
    /// Returns `TokenExpired`, `TokenInvalid` or `TokenWrongFormat`.
    pub fn authenticate(&self, access_token: &str) -> AuthResult<UserId> {
        Ok(self.tokens.validate_access(access_token)?)
    }

    /// Deletes expired sessions of every user.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the store fails.
    pub async fn purge_expired_sessions(&self) -> AuthResult<u64> {
        self.sessions.purge_expired().await
    }

    /// Mints a token pair and persists its session. Nothing is returned
    /// unless both steps succeed.
    ///
    /// Under a session cap the oldest sessions are evicted first, leaving room
    /// for the new one; a failed eviction aborts before anything is written.
    async fn create_auth_result(
        &self,
        user_id: UserId,
        fingerprint: &str,
    ) -> AuthResult<TokenPair> {
        let issued = self.tokens.generate(user_id)?;

        if let Some(max) = self.policy.max_sessions_per_user {
            let keep = u64::from(max).saturating_sub(1);
            self.sessions.evict_oldest(user_id, keep).await?;
        }

        self.sessions
            .create_session(
                user_id,
                &issued.refresh_token,
                fingerprint,
                issued.refresh_expires_at,
            )
            .await?;

        Ok(TokenPair::new(
            issued.access_token,
            issued.refresh_token,
            self.tokens.access_token_expires_in(),
        ))
    }
}
