//! In-process store used by tests and local development.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use upwatch_shared::{SessionId, UserId};

use super::store::{
    NewSession, NewUser, Session, SessionStore, StoreError, User, UserStore,
    refresh_token_digest,
};

#[derive(Debug, Default)]
struct State {
    last_user_id: i64,
    last_session_id: i64,
    users: BTreeMap<UserId, User>,
    sessions: BTreeMap<SessionId, Session>,
}

impl State {
    fn insert_session(&mut self, session: NewSession) -> SessionId {
        self.last_session_id += 1;
        let id = SessionId::new(self.last_session_id);
        self.sessions.insert(
            id,
            Session {
                id,
                user_id: session.user_id,
                refresh_token_digest: refresh_token_digest(&session.refresh_token),
                fingerprint: session.fingerprint,
                expires_at: session.expires_at,
                created_at: Utc::now(),
            },
        );
        id
    }

    fn find_live(&self, user_id: UserId, digest: &str, fingerprint: &str) -> Option<&Session> {
        let now = Utc::now();
        self.sessions.values().find(|s| {
            s.user_id == user_id
                && s.refresh_token_digest == digest
                && s.fingerprint == fingerprint
                && !s.is_expired(now)
        })
    }

    fn has_triple(&self, session: &NewSession, digest: &str) -> bool {
        self.sessions.values().any(|s| {
            s.user_id == session.user_id
                && s.refresh_token_digest == digest
                && s.fingerprint == session.fingerprint
        })
    }
}

/// Users and sessions behind one lock, with the same constraints as the
/// database schema: unique usernames, unique session triples, and sessions
/// removed with their user.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        let mut state = self.state.lock().await;

        if state.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username {} exists",
                user.username
            )));
        }

        state.last_user_id += 1;
        let id = UserId::new(state.last_user_id);
        state.users.insert(
            id,
            User {
                id,
                username: user.username,
                email: user.contact.email,
                contact_id: user.contact.contact_id,
                password_hash: user.password_hash,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.sessions.retain(|_, s| s.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, session: NewSession) -> Result<SessionId, StoreError> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&session.user_id) {
            return Err(StoreError::Database(format!(
                "user {} does not exist",
                session.user_id
            )));
        }
        let digest = refresh_token_digest(&session.refresh_token);
        if state.has_triple(&session, &digest) {
            return Err(StoreError::Conflict("session exists".into()));
        }

        Ok(state.insert_session(session))
    }

    async fn get_session(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
    ) -> Result<Option<Session>, StoreError> {
        let state = self.state.lock().await;
        let digest = refresh_token_digest(refresh_token);
        Ok(state.find_live(user_id, &digest, fingerprint).cloned())
    }

    async fn get_user_sessions(&self, user_id: UserId) -> Result<Vec<Session>, StoreError> {
        let state = self.state.lock().await;
        let now = Utc::now();

        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && !s.is_expired(now))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), StoreError> {
        self.state.lock().await.sessions.remove(&id);
        Ok(())
    }

    async fn delete_all_sessions(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn rotate_session(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
        replacement: NewSession,
    ) -> Result<Option<SessionId>, StoreError> {
        let mut state = self.state.lock().await;
        let digest = refresh_token_digest(refresh_token);

        let Some(old_id) = state
            .find_live(user_id, &digest, fingerprint)
            .map(|s| s.id)
        else {
            return Ok(None);
        };

        state.sessions.remove(&old_id);
        Ok(Some(state.insert_session(replacement)))
    }

    async fn evict_oldest_sessions(&self, user_id: UserId, keep: u64) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;

        let mut owned: Vec<&Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let keep = usize::try_from(keep).unwrap_or(usize::MAX);
        let stale: Vec<SessionId> = owned.iter().skip(keep).map(|s| s.id).collect();
        for id in &stale {
            state.sessions.remove(id);
        }
        Ok(stale.len() as u64)
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - state.sessions.len()) as u64)
    }
}
