//! Process-wide configuration.
//!
//! Loaded once at startup from defaults, an optional TOML file and
//! `ILLUMINATE__SECTION__KEY` environment variables, then treated as
//! immutable.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{DEFAULT_TOKEN_TTL_SECS, ExtensionAuth, MAX_TOKEN_TTL_SECS};
use crate::dispatch::{DEFAULT_API_BASE_URL, DEFAULT_MAX_MESSAGE_BYTES};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ILLUMINATE";

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "illuminate.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/dist`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
    /// How long shutdown waits for in-flight dispatches.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: None,
            shutdown_grace_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Base64 encoded extension secret.
    pub secret: String,
    pub client_id: String,
    pub api_base_url: String,
    /// Lifetime of minted outbound tokens.
    pub token_ttl_secs: i64,
    pub request_timeout_secs: u64,
    pub max_message_bytes: usize,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            client_id: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            request_timeout_secs: 30,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub extension: ExtensionConfig,
}

impl AppConfig {
    /// Load from `path` (optional unless given explicitly) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE))
                .format(FileFormat::Toml)
                .required(false),
        };

        let built = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(built.try_deserialize()?)
    }

    /// Check the values the relay cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "extension.secret is required".to_string(),
            ));
        }
        ExtensionAuth::from_base64_secret(&self.extension.secret, self.extension.token_ttl_secs)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.extension.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "extension.client_id is required".to_string(),
            ));
        }
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.extension.token_ttl_secs) {
            return Err(ConfigError::Invalid(format!(
                "extension.token_ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
            )));
        }
        Ok(())
    }

    /// Copy safe to print.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.extension.secret.is_empty() {
            config.extension.secret = "<redacted>".to_string();
        }
        config
    }
}
