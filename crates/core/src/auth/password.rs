//! Password hashing with Argon2id.
//!
//! The hash is the replaceable, intentionally slow primitive behind
//! registration and login. Its cost comes from configuration.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, Version,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;
use upwatch_shared::config::PasswordConfig;

/// Errors that can occur during password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Cost parameters rejected by Argon2.
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),

    /// Failed to hash password.
    #[error("failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password.
    #[error("failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format.
    #[error("invalid password hash format")]
    InvalidHash,
}

/// Argon2id hasher with fixed cost parameters.
#[derive(Debug, Clone)]
pub struct PasswordHashing {
    params: Params,
}

impl Default for PasswordHashing {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHashing {
    /// Creates a hasher from configured cost parameters.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidParams` if Argon2 rejects the parameters
    /// (for example a memory cost below `8 * parallelism` KiB).
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a password into a PHC string with a random salt.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if hashing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use upwatch_core::auth::PasswordHashing;
    ///
    /// let hash = PasswordHashing::default().hash("my_secure_password").unwrap();
    /// assert!(hash.starts_with("$argon2id$"));
    /// ```
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    /// Verifies a password against a stored PHC hash.
    ///
    /// The comparison is done by Argon2 itself, in constant time. Parameters
    /// are read from the stored hash, so hashes made under an older cost
    /// still verify.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidHash` if the hash format is invalid.
    /// Returns `PasswordError::VerifyError` if verification fails unexpectedly.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

        match self.argon2().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHashing {
        PasswordHashing::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_password() {
        let password = "test_password_123!";
        let hash = cheap().hash(password).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=1024,t=1,p=1"));
        assert_ne!(hash, password);
    }

    #[test]
    fn test_verify_correct_and_wrong_password() {
        let hashing = cheap();
        let hash = hashing.hash("correct_password").unwrap();

        assert!(hashing.verify("correct_password", &hash).unwrap());
        assert!(!hashing.verify("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_salts() {
        let hashing = cheap();
        let hash1 = hashing.hash("password1").unwrap();
        let hash2 = hashing.hash("password1").unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_reads_cost_from_hash() {
        let old = PasswordHashing::default().hash("pw123456").unwrap();
        assert!(cheap().verify("pw123456", &old).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = cheap().verify("password", "invalid_hash");
        assert!(matches!(result, Err(PasswordError::InvalidHash)));
    }

    #[test]
    fn test_rejects_unusable_params() {
        let result = PasswordHashing::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        });
        assert!(matches!(result, Err(PasswordError::InvalidParams(_))));
    }
}
