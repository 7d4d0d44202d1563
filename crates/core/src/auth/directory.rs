//! User registration, lookup and credential checks.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};
use upwatch_shared::UserId;

use super::error::{AuthError, AuthResult};
use super::password::PasswordHashing;
use super::store::{ContactDetails, NewUser, StoreError, User, UserStore};

/// Password hashed once per directory to check candidates of unknown users
/// against, so their logins cost the same as a wrong password.
const DUMMY_PASSWORD: &str = "upwatch-unknown-user";

/// Credential storage and verification.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    hashing: PasswordHashing,
    dummy_hash: Arc<OnceCell<String>>,
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("hashing", &self.hashing)
            .finish_non_exhaustive()
    }
}

impl UserDirectory {
    /// Creates a directory over a user store.
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, hashing: PasswordHashing) -> Self {
        Self {
            store,
            hashing,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Hashes a password on the blocking pool.
    async fn hash_blocking(&self, password: &str) -> AuthResult<String> {
        let hashing = self.hashing.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hashing.hash(&password))
            .await
            .map_err(|e| AuthError::HashingFailed(e.to_string()))?
            .map_err(|e| AuthError::HashingFailed(e.to_string()))
    }

    /// Registers a user and returns its ID.
    ///
    /// The password is hashed on the blocking pool; a failure there is final
    /// for this request and is not retried.
    ///
    /// # Errors
    ///
    /// Returns `UsernameTaken` if the username exists (including when a
    /// concurrent registration wins the unique index), `HashingFailed` if the
    /// hash cannot be computed, or a store error.
    pub async fn register_user(
        &self,
        username: &str,
        password: &str,
        contact: ContactDetails,
    ) -> AuthResult<UserId> {
        info!(username, "Attempting to register user");

        if self
            .store
            .find_by_username(username)
            .await
            .map_err(AuthError::store("failed to check username"))?
            .is_some()
        {
            warn!(username, "Username already taken");
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.hash_blocking(password).await.inspect_err(|e| {
            error!(username, error = %e, "Failed to hash password");
        })?;

        let user = NewUser {
            username: username.to_owned(),
            password_hash,
            contact,
        };

        match self.store.create_user(user).await {
            Ok(id) => {
                info!(username, user_id = %id, "User registered successfully");
                Ok(id)
            }
            Err(StoreError::Conflict(_)) => {
                warn!(username, "Username taken by a concurrent registration");
                Err(AuthError::UsernameTaken)
            }
            Err(e) => {
                error!(username, error = %e, "Failed to create user");
                Err(AuthError::store("failed to create user")(e))
            }
        }
    }

    /// Looks a user up by exact username.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or a store error.
    pub async fn get_by_username(&self, username: &str) -> AuthResult<User> {
        debug!(username, "Fetching user by username");

        self.store
            .find_by_username(username)
            .await
            .map_err(AuthError::store("failed to get user by username"))?
            .ok_or(AuthError::UserNotFound)
    }

    /// Looks a user up by ID.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or a store error.
    pub async fn get_by_id(&self, id: UserId) -> AuthResult<User> {
        debug!(user_id = %id, "Fetching user by ID");

        self.store
            .find_by_id(id)
            .await
            .map_err(AuthError::store("failed to get user by id"))?
            .ok_or(AuthError::UserNotFound)
    }

    /// Checks a candidate password against a stored hash.
    ///
    /// A corrupt stored hash counts as a mismatch.
    pub async fn verify_password(&self, stored_hash: &str, candidate: &str) -> bool {
        let hashing = self.hashing.clone();
        let stored_hash = stored_hash.to_owned();
        let candidate = candidate.to_owned();

        match tokio::task::spawn_blocking(move || hashing.verify(&candidate, &stored_hash)).await
        {
            Ok(Ok(matches)) => {
                if !matches {
                    debug!("Password verification failed");
                }
                matches
            }
            Ok(Err(e)) => {
                error!(error = %e, "Stored password hash could not be checked");
                false
            }
            Err(e) => {
                error!(error = %e, "Password verification task failed");
                false
            }
        }
    }

    /// Runs a full verification of `candidate` against a hash made with the
    /// configured cost, for a login whose user does not exist. The
    /// result is discarded; only the elapsed time matters.
    pub async fn verify_unknown_user(&self, candidate: &str) {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.hash_blocking(DUMMY_PASSWORD))
            .await;

        match dummy {
            Ok(hash) => {
                self.verify_password(hash, candidate).await;
            }
            Err(e) => error!(error = %e, "Failed to prepare unknown-user hash"),
        }
    }

    #[cfg(test)]
    pub(crate) fn dummy_hash(&self) -> Option<&str> {
        self.dummy_hash.get().map(String::as_str)
    }

    /// Deletes a user. Their sessions go with them.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or a store error.
    pub async fn delete_user(&self, id: UserId) -> AuthResult<()> {
        info!(user_id = %id, "Deleting user");

        if self
            .store
            .delete_user(id)
            .await
            .map_err(AuthError::store("failed to delete user"))?
        {
            info!(user_id = %id, "User deleted successfully");
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
    }
}
