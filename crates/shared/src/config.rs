//! Application configuration management.

use serde::Deserialize;

use crate::jwt::TokenConfig;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Session lifecycle configuration.
    #[serde(default)]
    pub sessions: SessionConfig,
    /// Password hashing cost.
    #[serde(default)]
    pub password: PasswordConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request deadline; an expired request drops its in-flight store call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection establishment timeout.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Apply pending migrations on startup.
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    5
}

/// JWT configuration.
#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing access tokens.
    pub access_secret: String,
    /// Secret key for signing refresh tokens.
    pub refresh_secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token expiration in seconds.
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"[hidden]")
            .field("refresh_secret", &"[hidden]")
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("refresh_token_expiry_secs", &self.refresh_token_expiry_secs)
            .finish()
    }
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

fn default_refresh_token_expiry() -> u64 {
    604_800 // 7 days
}

/// Longest accepted token lifetime, ten years.
pub const MAX_TOKEN_EXPIRY_SECS: u64 = 315_360_000;

fn ttl(secs: u64) -> chrono::Duration {
    let secs = i64::try_from(secs.min(MAX_TOKEN_EXPIRY_SECS)).unwrap_or(i64::MAX);
    chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
}

impl JwtConfig {
    /// Builds the token issuer configuration. Lifetimes are capped at
    /// [`MAX_TOKEN_EXPIRY_SECS`].
    #[must_use]
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            access_secret: self.access_secret.clone(),
            refresh_secret: self.refresh_secret.clone(),
            access_ttl: ttl(self.access_token_expiry_secs),
            refresh_ttl: ttl(self.refresh_token_expiry_secs),
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Maximum concurrent sessions per user; the oldest devices are evicted
    /// beyond it. Unlimited when absent.
    #[serde(default)]
    pub max_per_user: Option<u32>,
    /// How often expired sessions are purged.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_per_user: None,
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_cleanup_interval() -> u64 {
    3600
}

/// Argon2id cost parameters.
///
/// Defaults match the `argon2` crate defaults and put tens of milliseconds on
/// every login and registration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB.
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Number of passes.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Degree of parallelism.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default level for the service's own crates (`RUST_LOG` wins when set).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or fails validation.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("UPWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` describing the first violation.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let jwt = &self.jwt;
        if jwt.access_secret.is_empty() {
            return Err(config::ConfigError::Message(
                "jwt.access_secret is not set (UPWATCH__JWT__ACCESS_SECRET)".into(),
            ));
        }
        if jwt.refresh_secret.is_empty() {
            return Err(config::ConfigError::Message(
                "jwt.refresh_secret is not set (UPWATCH__JWT__REFRESH_SECRET)".into(),
            ));
        }
        if jwt.access_secret == jwt.refresh_secret {
            return Err(config::ConfigError::Message(
                "jwt.access_secret and jwt.refresh_secret must differ".into(),
            ));
        }
        if jwt.access_token_expiry_secs == 0
            || jwt.refresh_token_expiry_secs <= jwt.access_token_expiry_secs
        {
            return Err(config::ConfigError::Message(
                "jwt.refresh_token_expiry_secs must exceed a non-zero access token expiry".into(),
            ));
        }
        if jwt.refresh_token_expiry_secs > MAX_TOKEN_EXPIRY_SECS {
            return Err(config::ConfigError::Message(format!(
                "jwt.refresh_token_expiry_secs must not exceed {MAX_TOKEN_EXPIRY_SECS}"
            )));
        }
        if self.sessions.max_per_user == Some(0) {
            return Err(config::ConfigError::Message(
                "sessions.max_per_user must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_VARS: [(&str, Option<&str>); 4] = [
        ("RUN_MODE", Some("test-no-such-file")),
        ("UPWATCH__DATABASE__URL", Some("postgres://localhost/upwatch")),
        ("UPWATCH__JWT__ACCESS_SECRET", Some("access-secret")),
        ("UPWATCH__JWT__REFRESH_SECRET", Some("refresh-secret")),
    ];

    #[test]
    fn test_load_from_env_with_defaults() {
        temp_env::with_vars(BASE_VARS, || {
            let config = AppConfig::load().unwrap();

            assert_eq!(config.server.port, 8080);
            assert_eq!(config.database.url, "postgres://localhost/upwatch");
            assert_eq!(config.jwt.access_token_expiry_secs, 900);
            assert_eq!(config.jwt.refresh_token_expiry_secs, 604_800);
            assert_eq!(config.sessions.max_per_user, None);
            assert_eq!(config.log.format, LogFormat::Pretty);
            assert_eq!(config.password.iterations, 2);
        });
    }

    #[test]
    fn test_env_overrides_nested_values() {
        temp_env::with_vars(
            [
                BASE_VARS[0],
                BASE_VARS[1],
                BASE_VARS[2],
                BASE_VARS[3],
                ("UPWATCH__SERVER__PORT", Some("9090")),
                ("UPWATCH__SESSIONS__MAX_PER_USER", Some("5")),
                ("UPWATCH__LOG__FORMAT", Some("json")),
            ],
            || {
                let config = AppConfig::load().unwrap();

                assert_eq!(config.server.port, 9090);
                assert_eq!(config.sessions.max_per_user, Some(5));
                assert_eq!(config.log.format, LogFormat::Json);
            },
        );
    }

    #[test]
    fn test_rejects_identical_secrets() {
        temp_env::with_vars(
            [
                BASE_VARS[0],
                BASE_VARS[1],
                ("UPWATCH__JWT__ACCESS_SECRET", Some("same")),
                ("UPWATCH__JWT__REFRESH_SECRET", Some("same")),
            ],
            || {
                let err = AppConfig::load().unwrap_err();
                assert!(err.to_string().contains("must differ"));
            },
        );
    }

    #[test]
    fn test_rejects_refresh_expiry_not_above_access() {
        temp_env::with_vars(
            [
                BASE_VARS[0],
                BASE_VARS[1],
                BASE_VARS[2],
                BASE_VARS[3],
                ("UPWATCH__JWT__ACCESS_TOKEN_EXPIRY_SECS", Some("3600")),
                ("UPWATCH__JWT__REFRESH_TOKEN_EXPIRY_SECS", Some("60")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }

    #[test]
    fn test_rejects_expiry_beyond_ten_years() {
        temp_env::with_vars(
            [
                BASE_VARS[0],
                BASE_VARS[1],
                BASE_VARS[2],
                BASE_VARS[3],
                ("UPWATCH__JWT__REFRESH_TOKEN_EXPIRY_SECS", Some("400000000")),
            ],
            || {
                let err = AppConfig::load().unwrap_err();
                assert!(err.to_string().contains("must not exceed"));
            },
        );
    }

    #[test]
    fn test_token_config_caps_huge_expiry() {
        let jwt = JwtConfig {
            access_secret: "a".into(),
            refresh_secret: "r".into(),
            access_token_expiry_secs: 900,
            refresh_token_expiry_secs: u64::MAX,
        };
        let tokens = jwt.token_config();

        assert_eq!(tokens.refresh_ttl, chrono::Duration::days(3650));
    }

    #[test]
    fn test_token_config_conversion() {
        let jwt = JwtConfig {
            access_secret: "a".into(),
            refresh_secret: "r".into(),
            access_token_expiry_secs: 900,
            refresh_token_expiry_secs: 604_800,
        };
        let tokens = jwt.token_config();

        assert_eq!(tokens.access_ttl, chrono::Duration::minutes(15));
        assert_eq!(tokens.refresh_ttl, chrono::Duration::days(7));
        assert!(!format!("{jwt:?}").contains("\"a\""));
    }
}
