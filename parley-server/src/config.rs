//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use parley_core::{AttachmentPolicy, ProviderConfig, DEFAULT_GREETING};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
}

/// Runtime configuration for parley-server.
///
/// Provider settings are required; everything else falls back to a default.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS allow-list; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Mount Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// Upstream chat-completion endpoint, key and model.
    pub provider: ProviderConfig,

    /// Largest accepted attachment, in bytes.
    pub max_upload_bytes: u64,

    /// Directory that holds spooled attachments.
    pub upload_dir: PathBuf,

    /// Assistant greeting seeded into the conversation; `None` disables it.
    pub greeting: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env_or("PARLEY_BIND", "0.0.0.0:3000"),
            log_level: env_or("PARLEY_LOG", "info"),
            log_json: parse_flag("PARLEY_LOG_JSON", false),
            cors_allowed_origins: std::env::var("PARLEY_CORS_ORIGINS").ok(),
            enable_swagger: parse_flag("PARLEY_ENABLE_SWAGGER", true),
            provider: ProviderConfig {
                endpoint: require_env("PARLEY_API_URL")?,
                api_key: require_env("PARLEY_API_KEY")?,
                model: require_env("PARLEY_MODEL")?,
                timeout: std::env::var("PARLEY_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_secs),
            },
            max_upload_bytes: parse_env("PARLEY_MAX_UPLOAD_SIZE_MB", 20u64) * 1024 * 1024,
            upload_dir: std::env::var("PARLEY_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            greeting: match std::env::var("PARLEY_GREETING") {
                Ok(v) if v.trim().is_empty() => None,
                Ok(v) => Some(v),
                Err(_) => Some(DEFAULT_GREETING.to_owned()),
            },
        })
    }

    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy {
            max_bytes: self.max_upload_bytes,
            spool_dir: self.upload_dir.clone(),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn require_env(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
