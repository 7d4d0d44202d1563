//! Session lifecycle on top of a [`SessionStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};
use upwatch_shared::{SessionId, UserId};

use super::error::{AuthError, AuthResult};
use super::store::{NewSession, Session, SessionStore};

/// Creates, finds, rotates and removes per-device sessions.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager over a session store.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Persists a session for a freshly issued refresh token.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn create_session(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<SessionId> {
        let session = NewSession {
            user_id,
            refresh_token: refresh_token.to_owned(),
            fingerprint: fingerprint.to_owned(),
            expires_at,
        };

        let id = self.store.create_session(session).await.map_err(|e| {
            error!(user_id = %user_id, error = %e, "Failed to create session");
            AuthError::store("failed to create session")(e)
        })?;

        info!(user_id = %user_id, session_id = %id, fingerprint, "Session created");
        Ok(id)
    }

    /// Finds the live session for `(user_id, refresh_token, fingerprint)`.
    ///
    /// A right token presented from the wrong device is `SessionNotFound`,
    /// the same as an unknown token.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` or a store error.
    pub async fn get_session(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
    ) -> AuthResult<Session> {
        match self
            .store
            .get_session(user_id, refresh_token, fingerprint)
            .await
        {
            Ok(Some(session)) => {
                info!(user_id = %user_id, session_id = %session.id, fingerprint, "Session found");
                Ok(session)
            }
            Ok(None) => {
                info!(user_id = %user_id, fingerprint, "Session not found");
                Err(AuthError::SessionNotFound)
            }
            Err(e) => {
                error!(user_id = %user_id, fingerprint, error = %e, "Session lookup failed");
                Err(AuthError::store("failed to get session")(e))
            }
        }
    }

    /// Lists a user's live sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn get_all_user_sessions(&self, user_id: UserId) -> AuthResult<Vec<Session>> {
        self.store
            .get_user_sessions(user_id)
            .await
            .map_err(AuthError::store("failed to list sessions"))
    }

    /// Deletes one session.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn delete_session(&self, id: SessionId) -> AuthResult<()> {
        self.store.delete_session(id).await.map_err(|e| {
            error!(session_id = %id, error = %e, "Failed to delete session");
            AuthError::store("failed to delete session")(e)
        })?;

        info!(session_id = %id, "Session deleted");
        Ok(())
    }

    /// Deletes every session of a user.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn delete_all_sessions(&self, user_id: UserId) -> AuthResult<u64> {
        let removed = self
            .store
            .delete_all_sessions(user_id)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, error = %e, "Failed to delete all sessions");
                AuthError::store("failed to delete all sessions")(e)
            })?;

        info!(user_id = %user_id, removed, "All sessions deleted for user");
        Ok(removed)
    }

    /// Swaps the session behind `refresh_token` for a new one in one atomic
    /// step.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the presented token has no live session
    /// (already rotated, logged out, expired, or wrong device), or a store
    /// error. Nothing is written in either case.
    pub async fn rotate(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
        replacement: NewSession,
    ) -> AuthResult<SessionId> {
        let rotated = self
            .store
            .rotate_session(user_id, refresh_token, fingerprint, replacement)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, fingerprint, error = %e, "Session rotation failed");
                AuthError::store("failed to rotate session")(e)
            })?;

        if let Some(id) = rotated {
            info!(user_id = %user_id, session_id = %id, fingerprint, "Session rotated");
            Ok(id)
        } else {
            info!(user_id = %user_id, fingerprint, "Refresh presented for missing session");
            Err(AuthError::SessionNotFound)
        }
    }

    /// Trims a user's sessions to the `keep` newest.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn evict_oldest(&self, user_id: UserId, keep: u64) -> AuthResult<u64> {
        let evicted = self
            .store
            .evict_oldest_sessions(user_id, keep)
            .await
            .map_err(AuthError::store("failed to evict sessions"))?;

        if evicted > 0 {
            info!(user_id = %user_id, evicted, keep, "Evicted oldest sessions");
        }
        Ok(evicted)
    }

    /// Deletes expired sessions across all users.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let purged = self
            .store
            .delete_expired()
            .await
            .map_err(AuthError::store("failed to purge expired sessions"))?;

        info!(purged, "Expired sessions purged");
        Ok(purged)
    }
}
