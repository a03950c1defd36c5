//! Configuration loading, validation, and management for Shamba.
//!
//! Loads configuration from `~/.shamba/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.shamba/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session lifetime settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Registration registry settings
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Upper bound on one USSD round trip before a timeout reply is sent
    #[serde(default = "default_response_deadline")]
    pub response_deadline_secs: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_response_deadline() -> u64 {
    25
}
fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            response_deadline_secs: default_response_deadline(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl GatewayConfig {
    pub fn response_deadline(&self) -> Duration {
        Duration::from_secs(self.response_deadline_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity after which a session is swept
    #[serde(default = "default_session_timeout")]
    pub timeout_secs: u64,

    /// How often the sweeper runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_session_timeout() -> u64 {
    300
}
fn default_sweep_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_session_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// "memory" or "file"
    #[serde(default = "default_registry_backend")]
    pub backend: String,

    /// JSONL file for the "file" backend; defaults to `~/.shamba/registry.jsonl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Offset of the reference timezone used for `registered_at`
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_registry_backend() -> String {
    "memory".into()
}
fn default_utc_offset_hours() -> i32 {
    3
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: default_registry_backend(),
            path: None,
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl RegistryConfig {
    /// The reference timezone. Falls back to UTC for out-of-range offsets,
    /// which `validate` rejects anyway.
    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Resolved path of the registry file, expanding a leading `~/`.
    pub fn file_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => match p.strip_prefix("~/") {
                Some(rest) => dirs_home().join(rest),
                None => PathBuf::from(p),
            },
            None => AppConfig::config_dir().join("registry.jsonl"),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.shamba/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `SHAMBA_HOST`
    /// - `SHAMBA_PORT`, then `PORT`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_path())
    }

    /// Load from a specific file, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if let Ok(host) = std::env::var("SHAMBA_HOST") {
            config.gateway.host = host;
        }

        if let Some(port) = std::env::var("SHAMBA_PORT")
            .ok()
            .or_else(|| std::env::var("PORT").ok())
        {
            config.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("port override is not a number: {port}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".shamba")
    }

    /// Default location of `config.toml`.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError("gateway.port must be > 0".into()));
        }

        if self.gateway.response_deadline_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.response_deadline_secs must be > 0".into(),
            ));
        }

        if self.session.timeout_secs == 0 || self.session.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session.timeout_secs and session.sweep_interval_secs must be > 0".into(),
            ));
        }

        if !matches!(self.registry.backend.as_str(), "memory" | "file") {
            return Err(ConfigError::ValidationError(format!(
                "unknown registry.backend '{}' (expected \"memory\" or \"file\")",
                self.registry.backend
            )));
        }

        if !(-14..=14).contains(&self.registry.utc_offset_hours) {
            return Err(ConfigError::ValidationError(
                "registry.utc_offset_hours must be between -14 and 14".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
