//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use voxlead_flows::{FollowUpTemplates, TelephonyConfig};
use voxlead_ingest::IngestConfig;
use voxlead_notify::NotifyConfig;
use voxlead_voice::InferenceConfig;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Webhook callback URLs, voice defaults and scripted phrases.
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Conversational model endpoint. Without an API key calls still run, but
    /// every turn gets the fallback reply.
    #[serde(default)]
    pub inference: InferenceConfig,

    /// SMS, email, calendar, outbound calls and CRM webhook.
    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub follow_up: FollowUpTemplates,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted dataset upload, in bytes (base64 included).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voxlead_flows=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_db_path() -> String {
    "voxlead.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// TwiML URL for outbound AI calls; defaults to our own voice webhook.
    pub fn outbound_twiml_url(&self) -> Option<String> {
        if let Some(url) = self
            .notify
            .outbound_twiml_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
        {
            return Some(url.to_string());
        }
        url::Url::parse(&self.telephony.public_url)
            .and_then(|base| base.join("/webhooks/voice"))
            .map(|u| u.to_string())
            .map_err(|e| tracing::warn!(error = %e, "invalid telephony.public_url"))
            .ok()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VOXLEAD_HOST`, `VOXLEAD_PORT`
/// - `VOXLEAD_DB_PATH`
/// - `VOXLEAD_LOG_LEVEL`, `VOXLEAD_LOG_JSON` ("true" or "1")
/// - `VOXLEAD_PUBLIC_URL` overrides `telephony.public_url`
/// - `VOXLEAD_INFERENCE_API_KEY`
/// - `VOXLEAD_TWILIO_ACCOUNT_SID`, `VOXLEAD_TWILIO_AUTH_TOKEN`
/// - `VOXLEAD_SENDGRID_API_KEY`, `VOXLEAD_CALCOM_API_KEY`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(parsed) = var("VOXLEAD_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = parsed;
    }
    if let Some(parsed) = var("VOXLEAD_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = parsed;
    }
    if let Some(db_path) = var("VOXLEAD_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("VOXLEAD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("VOXLEAD_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(url) = var("VOXLEAD_PUBLIC_URL") {
        config.telephony.public_url = url;
    }
    if let Some(key) = var("VOXLEAD_INFERENCE_API_KEY") {
        config.inference.api_key = key;
    }
    if let Some(sid) = var("VOXLEAD_TWILIO_ACCOUNT_SID") {
        config.notify.twilio.account_sid = sid;
    }
    if let Some(token) = var("VOXLEAD_TWILIO_AUTH_TOKEN") {
        config.notify.twilio.auth_token = token;
    }
    if let Some(key) = var("VOXLEAD_SENDGRID_API_KEY") {
        config.notify.sendgrid.api_key = key;
    }
    if let Some(key) = var("VOXLEAD_CALCOM_API_KEY") {
        config.notify.calcom.api_key = key;
    }
}
