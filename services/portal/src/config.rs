//! Portal client configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `PORTAL_` (nested keys use `__`, e.g.
//! `PORTAL_STORE__BACKEND=redis`).

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{PortalError, PortalResult};

/// Identity API used when `api_url` is not configured
pub const DEFAULT_API_URL: &str = "http://localhost:8081";

/// Inactivity limit used when none is configured (one hour)
pub const DEFAULT_INACTIVITY_LIMIT_SECS: u64 = 60 * 60;

/// Configuration file read when `PORTAL_CONFIG` is not set
pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

/// Where the persisted session lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
    Redis,
}

/// Session store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Backend kind
    pub backend: StoreBackend,
    /// Document path for the file backend
    pub path: PathBuf,
    /// Connection URL for the Redis backend
    pub redis_url: String,
    /// Key namespace for the Redis backend
    pub key_prefix: String,
}

/// Portal client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Base URL of the Identity API
    pub api_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Idle time after which a session is expired, in seconds
    pub inactivity_limit_secs: u64,
    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,
    /// Session store settings
    pub store: StoreConfig,
}

impl PortalConfig {
    /// Load the configuration from `PORTAL_CONFIG` (or `portal.toml`) and the
    /// environment
    pub fn load() -> PortalResult<Self> {
        let path =
            std::env::var("PORTAL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load the configuration from the given file (which may be absent) and
    /// the environment
    pub fn load_from(path: &str) -> PortalResult<Self> {
        let settings = Config::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("request_timeout_secs", 30)?
            .set_default("inactivity_limit_secs", DEFAULT_INACTIVITY_LIMIT_SECS)?
            .set_default("log_level", "info")?
            .set_default("store.backend", "file")?
            .set_default("store.path", ".portal/session.json")?
            .set_default("store.redis_url", "redis://localhost:6379")?
            .set_default("store.key_prefix", "portal")?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("PORTAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: PortalConfig = settings.try_deserialize()?;
        config.api_url = config.api_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> PortalResult<()> {
        if self.api_url.is_empty() {
            return Err(PortalError::Validation(
                "api_url must not be empty".to_string(),
            ));
        }
        if self.inactivity_limit_secs == 0 {
            return Err(PortalError::Validation(
                "inactivity_limit_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Inactivity limit as a duration
    pub fn inactivity_limit(&self) -> Duration {
        Duration::from_secs(self.inactivity_limit_secs)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
