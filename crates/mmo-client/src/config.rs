//! # Client Configuration
//!
//! Backend location, OAuth2 application credentials and the debounce
//! windows of the two reactive screens.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  defaults ──► client.toml ──► MMO_* environment ──► validate()          │
//! │                                                                         │
//! │  client.toml lives in the platform config dir:                          │
//! │     ~/.config/market/client.toml (Linux)                                │
//! │     ~/Library/Application Support/com.mmo.market/client.toml (macOS)    │
//! │                                                                         │
//! │  Environment: MMO_API_URL, MMO_CLIENT_ID, MMO_CLIENT_SECRET,            │
//! │  MMO_VOUCHER_DEBOUNCE_MS, MMO_SEARCH_DEBOUNCE_MS,                       │
//! │  MMO_REQUEST_TIMEOUT_SECS                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```toml
//! # client.toml
//! [api]
//! base_url = "http://localhost:8000"
//! request_timeout_secs = 15
//!
//! [auth]
//! client_id = "mobile-app"
//! client_secret = "..."
//!
//! [timing]
//! voucher_debounce_ms = 1000
//! search_debounce_ms = 500
//! page_size = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use mmo_core::{DEFAULT_PAGE_SIZE, SEARCH_DEBOUNCE_MS, VOUCHER_DEBOUNCE_MS};

use crate::error::{ClientError, ClientResult};

// =============================================================================
// API Settings
// =============================================================================

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Backend root, e.g. `https://api.mmo.example`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Auth Settings
// =============================================================================

/// OAuth2 application credentials used for the password grant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,
}

// =============================================================================
// Timing Settings
// =============================================================================

/// Debounce windows and paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Quiescence before a typed voucher code is checked (milliseconds).
    #[serde(default = "default_voucher_debounce")]
    pub voucher_debounce_ms: u64,

    /// Quiescence before a search or category change reloads the list
    /// (milliseconds).
    #[serde(default = "default_search_debounce")]
    pub search_debounce_ms: u64,

    /// Products per catalog page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_voucher_debounce() -> u64 {
    VOUCHER_DEBOUNCE_MS
}

fn default_search_debounce() -> u64 {
    SEARCH_DEBOUNCE_MS
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for TimingSettings {
    fn default() -> Self {
        TimingSettings {
            voucher_debounce_ms: default_voucher_debounce(),
            search_debounce_ms: default_search_debounce(),
            page_size: default_page_size(),
        }
    }
}

// =============================================================================
// Main Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub timing: TimingSettings,
}

impl ClientConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the effective configuration: defaults, then `config_path` (or
    /// the platform default) if it exists, then `MMO_*` overrides.
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Like [`ClientConfig::load`], falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml()?)?;

        info!(?path, "Client config saved");
        Ok(())
    }

    /// Renders the configuration as it would be saved.
    pub fn to_toml(&self) -> ClientResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = url::Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(ClientError::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.timing.page_size == 0 {
            return Err(ClientError::Config(
                "page_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from a key lookup (the process environment in
    /// [`ClientConfig::load`]).
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MMO_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(id) = lookup("MMO_CLIENT_ID") {
            self.auth.client_id = id;
        }

        if let Some(secret) = lookup("MMO_CLIENT_SECRET") {
            self.auth.client_secret = secret;
        }

        if let Some(ms) = lookup("MMO_VOUCHER_DEBOUNCE_MS") {
            match ms.parse::<u64>() {
                Ok(v) => self.timing.voucher_debounce_ms = v,
                Err(_) => warn!(value = %ms, "Ignoring invalid MMO_VOUCHER_DEBOUNCE_MS"),
            }
        }

        if let Some(ms) = lookup("MMO_SEARCH_DEBOUNCE_MS") {
            match ms.parse::<u64>() {
                Ok(v) => self.timing.search_debounce_ms = v,
                Err(_) => warn!(value = %ms, "Ignoring invalid MMO_SEARCH_DEBOUNCE_MS"),
            }
        }

        if let Some(secs) = lookup("MMO_REQUEST_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(v) => self.api.request_timeout_secs = v,
                Err(_) => warn!(value = %secs, "Ignoring invalid MMO_REQUEST_TIMEOUT_SECS"),
            }
        }
    }

    /// `client.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "mmo", "market")
            .map(|dirs| dirs.config_dir().join("client.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the backend root without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn voucher_debounce(&self) -> Duration {
        Duration::from_millis(self.timing.voucher_debounce_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.timing.search_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timing.voucher_debounce_ms, 1000);
        assert_eq!(config.timing.search_debounce_ms, 500);
        assert_eq!(config.timing.page_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.api.base_url = "ws://localhost:8000".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "https://api.mmo.example/".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "https://api.mmo.example");

        config.timing.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("MMO_API_URL", "https://staging.mmo.example"),
            ("MMO_CLIENT_ID", "cli"),
            ("MMO_VOUCHER_DEBOUNCE_MS", "250"),
            ("MMO_SEARCH_DEBOUNCE_MS", "soon"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://staging.mmo.example");
        assert_eq!(config.auth.client_id, "cli");
        assert_eq!(config.voucher_debounce(), Duration::from_millis(250));
        // Unparseable values keep the previous setting
        assert_eq!(config.timing.search_debounce_ms, 500);
    }

    #[test]
    fn test_toml_round_trip_keeps_sections() {
        let config = ClientConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[timing]"));

        let partial: ClientConfig = toml::from_str("[timing]\npage_size = 5\n").unwrap();
        assert_eq!(partial.timing.page_size, 5);
        assert_eq!(partial.timing.voucher_debounce_ms, 1000);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("mmo-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("client.toml");

        let mut config = ClientConfig::default();
        config.auth.client_id = "saved-id".to_string();
        config.save(Some(path.clone())).unwrap();

        let loaded: ClientConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.auth.client_id, "saved-id");

        let _ = std::fs::remove_dir_all(dir);
    }
}
