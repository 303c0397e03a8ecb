//! Configuration management for deposit_watch
//!
//! Loads configuration from YAML files and environment variables.
//! Environment variables override YAML values.

use crate::constants::{protocol, timings, FEED_RETENTION};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Backend endpoints
    #[serde(default)]
    pub api: ApiConfig,
    /// Push session timings
    #[serde(default)]
    pub session: SessionConfig,
    /// Live update feed settings
    #[serde(default)]
    pub feed: FeedConfig,
    /// What to monitor
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// REST base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Push channel base URL; derived from `base_url` when unset
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Upper bound for a single REST request in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    timings::REQUEST_TIMEOUT_MS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Push channel base URL (`http` -> `ws`, `https` -> `wss`)
    pub fn push_base_url(&self) -> String {
        match &self.ws_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => self
                .base_url
                .trim_end_matches('/')
                .replacen("http", "ws", 1),
        }
    }

    /// Full push endpoint for a wallet address
    pub fn push_url(&self, wallet_address: &str) -> Result<reqwest::Url, ConfigError> {
        let base = format!("{}{}", self.push_base_url(), protocol::PUSH_PATH);
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| ConfigError::Message(format!("Invalid push URL {}: {}", base, e)))?;
        url.query_pairs_mut()
            .append_pair(protocol::WALLET_ADDRESS_PARAM, wallet_address);
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Push session timing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Liveness probe interval in seconds
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,
    /// Fixed delay before reconnecting, in seconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// Handshake timeout in milliseconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_ms: u64,
}

fn default_keepalive_interval() -> u64 {
    timings::KEEPALIVE_INTERVAL_SECS
}

fn default_reconnect_delay() -> u64 {
    timings::RECONNECT_DELAY_SECS
}

fn default_handshake_timeout() -> u64 {
    timings::HANDSHAKE_TIMEOUT_MS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive_interval_secs: default_keepalive_interval(),
            reconnect_delay_secs: default_reconnect_delay(),
            handshake_timeout_ms: default_handshake_timeout(),
        }
    }
}

impl SessionConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Live update feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Maximum number of entries kept for display
    #[serde(default = "default_retention")]
    pub retention: usize,
}

fn default_retention() -> usize {
    FEED_RETENTION
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
        }
    }
}

/// Monitoring target configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorConfig {
    /// Active user whose wallet registry is loaded
    #[serde(default)]
    pub user_id: Option<Uuid>,
    /// Address to monitor when none is given on the command line
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default = "default_json_logs")]
    pub json: bool,
}

fn default_json_logs() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: default_json_logs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            feed: FeedConfig::default(),
            monitor: MonitorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DEPOSIT_WATCH_*)
    /// 2. config/deposit_watch.yaml (if exists)
    /// 3. deposit_watch.yaml (if exists)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&["deposit_watch", "config/deposit_watch"])
    }

    /// Load configuration using the given file stems (without extension)
    pub fn load_from(files: &[&str]) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("api.base_url", default_base_url())?
            .set_default("api.request_timeout_ms", default_request_timeout())?
            .set_default("session.keepalive_interval_secs", default_keepalive_interval())?
            .set_default("session.reconnect_delay_secs", default_reconnect_delay())?
            .set_default("session.handshake_timeout_ms", default_handshake_timeout())?
            .set_default("feed.retention", default_retention() as u64)?
            .set_default("logging.json", default_json_logs())?;

        for file in files {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        // DEPOSIT_WATCH_API__BASE_URL=http://host:8000 -> api.base_url
        // DEPOSIT_WATCH_MONITOR__USER_ID=<uuid> -> monitor.user_id
        let config = builder
            .add_source(
                Environment::with_prefix("DEPOSIT_WATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.is_empty() {
            return Err(ConfigError::Message("API base URL must be set".to_string()));
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(ConfigError::Message(format!(
                "API base URL must be http(s): {}",
                self.api.base_url
            )));
        }

        if let Some(ws_url) = &self.api.ws_url {
            if !ws_url.is_empty() && !ws_url.starts_with("ws://") && !ws_url.starts_with("wss://")
            {
                return Err(ConfigError::Message(format!(
                    "Push URL must be ws(s): {}",
                    ws_url
                )));
            }
        }

        if self.session.keepalive_interval_secs == 0 {
            return Err(ConfigError::Message(
                "Keepalive interval must be greater than zero".to_string(),
            ));
        }

        if self.feed.retention == 0 {
            return Err(ConfigError::Message(
                "Feed retention must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
