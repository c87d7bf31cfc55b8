//! TOML-based device configuration.
//!
//! Holds:
//! - Service-account identity and key location
//! - Calendar id, API base and fetch window
//! - Sync interval, HTTP limits and the failure policy
//! - Heartbeat settings
//!
//! Configuration is stored at `~/.config/calboard/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{CredentialSigner, ServiceAccountKey};
use crate::error::{ConfigError, CredentialError};
use crate::transport::{HTTP_TIMEOUT, MAX_RESPONSE_BYTES};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Largest accepted fetch window, one leap year.
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Service-account identity. Fields left unset fall back to the key file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Issuer (`client_email` of the service account)
    #[serde(default)]
    pub service_account_email: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Token endpoint, also used as the JWT audience
    #[serde(default)]
    pub token_uri: Option<String>,
    /// Google JSON key file
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// Bare PEM private key, for keys not shipped as JSON
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,
}

/// Which calendar to show and how far ahead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

/// What the supervisor does with a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Exit with a non-zero status and let the init system restart us
    #[default]
    Restart,
    /// Log and wait for the next interval
    Retry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

/// Low-frequency liveness logging, independent of the sync loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub interval_secs: u64,
    /// Optional `host:port` checked with a TCP connect on every beat
    #[serde(default)]
    pub check_addr: Option<String>,
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
    /// Consecutive check failures before a warning is logged
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
}

/// Device configuration.
///
/// Serialized to/from TOML at `~/.config/calboard/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

// Default functions
fn default_calendar_id() -> String {
    "primary".into()
}
fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}
fn default_window_days() -> u32 {
    30
}
fn default_interval_secs() -> u64 {
    20 * 60
}
fn default_http_timeout_secs() -> u64 {
    HTTP_TIMEOUT.as_secs()
}
fn default_max_response_bytes() -> usize {
    MAX_RESPONSE_BYTES
}
fn default_true() -> bool {
    true
}
fn default_heartbeat_interval_secs() -> u64 {
    10
}
fn default_check_timeout_ms() -> u64 {
    1500
}
fn default_max_failures() -> u32 {
    3
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: default_calendar_id(),
            api_base: default_api_base(),
            window_days: default_window_days(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            failure_policy: FailurePolicy::default(),
            http_timeout_secs: default_http_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_heartbeat_interval_secs(),
            check_addr: None,
            check_timeout_ms: default_check_timeout_ms(),
            max_failures: default_max_failures(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Returns `<config_dir>/calboard[-dev]/config.toml` based on CALBOARD_ENV.
///
/// Set CALBOARD_ENV=dev to use a development configuration.
///
/// # Errors
/// Returns an error if no configuration directory can be determined.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let env = std::env::var("CALBOARD_ENV").unwrap_or_else(|_| "production".to_string());
    let dir = if env == "dev" {
        base.join("calboard-dev")
    } else {
        base.join("calboard")
    };
    Ok(dir.join("config.toml"))
}

/// Identity strings and key material ready for the signer.
#[derive(Clone)]
pub struct ResolvedCredentials {
    pub issuer: String,
    pub scope: String,
    pub token_uri: String,
    pub private_key_pem: String,
}

impl ResolvedCredentials {
    /// Parse the key and build a signer.
    ///
    /// # Errors
    ///
    /// `KeyParse` if the PEM is not an RSA private key.
    pub fn signer(&self) -> Result<CredentialSigner, CredentialError> {
        CredentialSigner::from_pem(
            &self.private_key_pem,
            &self.issuer,
            &self.scope,
            &self.token_uri,
        )
    }
}

impl Config {
    /// Load from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from `path`, returning defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Check values that would otherwise fail only at sync time.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        if self.calendar.calendar_id.trim().is_empty() {
            return Err(invalid("calendar.calendar_id", "must not be empty"));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.calendar.window_days) {
            return Err(invalid("calendar.window_days", "must be between 1 and 366"));
        }
        if self.sync.interval_secs == 0 {
            return Err(invalid("sync.interval_secs", "must be at least 1"));
        }
        if self.sync.http_timeout_secs == 0 {
            return Err(invalid("sync.http_timeout_secs", "must be at least 1"));
        }
        if self.sync.max_response_bytes == 0 {
            return Err(invalid("sync.max_response_bytes", "must be at least 1"));
        }
        Ok(())
    }

    /// Merge explicit settings with the key file. Explicit settings win.
    ///
    /// # Errors
    ///
    /// `MissingKey` when no key source or issuer is configured; `KeyFile`
    /// when a configured file cannot be read.
    pub fn resolve_credentials(&self) -> Result<ResolvedCredentials, crate::error::CoreError> {
        let creds = &self.credentials;

        let key_file = match &creds.key_file {
            Some(path) => Some(ServiceAccountKey::from_file(path)?),
            None => None,
        };

        let private_key_pem = match (&creds.private_key_file, &key_file) {
            (Some(path), _) => std::fs::read_to_string(path).map_err(|e| CredentialError::KeyFile {
                path: path.clone(),
                message: e.to_string(),
            })?,
            (None, Some(key)) => key.private_key.clone(),
            (None, None) => {
                return Err(ConfigError::MissingKey("credentials.key_file".into()).into());
            }
        };

        let issuer = creds
            .service_account_email
            .clone()
            .or_else(|| key_file.as_ref().map(|k| k.client_email.clone()))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingKey("credentials.service_account_email".into()))?;

        let token_uri = creds
            .token_uri
            .clone()
            .or_else(|| key_file.as_ref().map(|k| k.token_uri.clone()))
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Ok(ResolvedCredentials {
            issuer,
            scope: creds.scope.clone().unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            token_uri,
            private_key_pem,
        })
    }
}
