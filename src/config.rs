//! Configuration module for Warden Core.
//!
//! Loads configuration from YAML files and environment variables.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::auth::ExclusionRule;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Which strategy guards the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    BasicAuth,
    SessionAuth,
    SessionExpAuth,
    #[default]
    SessionDbAuth,
}

impl AuthType {
    pub fn uses_sessions(&self) -> bool {
        !matches!(self, AuthType::BasicAuth)
    }
}

/// Where `session_db_auth` keeps its sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStoreKind {
    #[default]
    Sqlite,
    File,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub auth_type: AuthType,
    /// Cookie carrying the session id.
    #[serde(default = "default_session_name")]
    pub session_name: String,
    /// Session lifetime in seconds; zero or less never expires.
    #[serde(default)]
    pub session_duration: i64,
    /// How often expired sessions are swept.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Paths that skip authentication. A trailing `*` matches by prefix.
    #[serde(default)]
    pub excluded_paths: Vec<ExclusionRule>,
    #[serde(default)]
    pub session_store: SessionStoreKind,
    #[serde(default = "default_session_file")]
    pub session_file: String,
    /// Mark the session cookie `Secure`.
    #[serde(default)]
    pub cookie_secure: bool,
}

fn default_session_name() -> String {
    "_my_session_id".to_string()
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_session_file() -> String {
    ".db_UserSession.json".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_type: AuthType::default(),
            session_name: default_session_name(),
            session_duration: 0,
            sweep_interval_secs: default_sweep_interval(),
            excluded_paths: Vec::new(),
            session_store: SessionStoreKind::default(),
            session_file: default_session_file(),
            cookie_secure: false,
        }
    }
}

/// Parse a `SESSION_DURATION` value. Absent means never expire.
pub fn parse_session_duration(raw: Option<&str>) -> Result<i64, ConfigError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value.parse().map_err(|_| {
            ConfigError::Message(format!(
                "SESSION_DURATION must be an integer number of seconds, got '{}'",
                value
            ))
        }),
    }
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. `AUTH_TYPE`, `SESSION_NAME`, `SESSION_DURATION`
    /// 2. Environment variables (WARDEN__*)
    /// 3. config/local.yaml (if exists)
    /// 4. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let duration = std::env::var("SESSION_DURATION")
            .ok()
            .map(|raw| parse_session_duration(Some(&raw)))
            .transpose()?;

        let config = ConfigLoader::builder()
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Layer on local overrides
            .add_source(File::with_name("config/local").required(false))
            // Layer on environment variables with WARDEN prefix
            .add_source(
                Environment::with_prefix("WARDEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("auth.auth_type", std::env::var("AUTH_TYPE").ok())?
            .set_override_option("auth.session_name", std::env::var("SESSION_NAME").ok())?
            .set_override_option("auth.session_duration", duration)?
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.auth_type.uses_sessions() && self.auth.session_name.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.session_name must not be empty for session authentication".to_string(),
            ));
        }
        if self.auth.sweep_interval_secs == 0 {
            return Err(ConfigError::Message(
                "auth.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if self.auth.session_store == SessionStoreKind::File && self.auth.session_file.is_empty() {
            return Err(ConfigError::Message(
                "auth.session_file is required for the file session store".to_string(),
            ));
        }
        Ok(())
    }
}
