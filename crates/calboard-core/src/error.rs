//! Core error types for calboard-core.
//!
//! Each pipeline stage has its own error enum so the supervisor can tell
//! failure kinds apart in its logs, while the sync cycle itself collapses
//! them into a single [`CycleError`] verdict.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for calboard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Credential loading or signing errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// A sync cycle failed
    #[error("Sync cycle failed: {0}")]
    Cycle(#[from] CycleError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Could not determine a configuration directory
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Errors raised while loading the service-account key or signing an assertion.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The private key material is not a valid RSA PEM
    #[error("Failed to parse private key: {0}")]
    KeyParse(String),

    /// The RSA signing primitive failed
    #[error("Failed to sign assertion: {0}")]
    Signing(#[source] rsa::Error),

    /// The claim set could not be serialized
    #[error("Failed to encode claims: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The key file could not be read or is not a service-account key
    #[error("Failed to read key file {path}: {message}")]
    KeyFile { path: PathBuf, message: String },
}

/// Transport-level failures. All of them are considered transient.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request did not complete within the configured timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other request failure (TLS, protocol, body read)
    #[error("Request failed: {0}")]
    Request(String),
}

/// Token exchange failures. The token cache stays invalid after any of these.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Could not mint assertion: {0}")]
    Credential(#[from] CredentialError),

    #[error("Token endpoint unreachable: {0}")]
    Transport(#[from] TransportError),

    #[error("Token endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

/// Event list failures.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No access token available")]
    AuthUnavailable,

    #[error("Events endpoint unreachable: {0}")]
    Transport(#[from] TransportError),

    #[error("Events endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Malformed events response: {0}")]
    MalformedResponse(String),
}

/// Normalization failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A timestamp could not be split into date and time parts, or a part
    /// was out of range
    #[error("Invalid date in event {index} ('{stamp}'): {reason}")]
    InvalidDate {
        index: usize,
        stamp: String,
        reason: &'static str,
    },
}

/// Cycle-level verdict handed to the supervisor.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("authentication unavailable: {0}")]
    AuthUnavailable(#[source] AuthError),

    #[error("event fetch failed: {0}")]
    FetchFailed(#[source] FetchError),

    #[error("event normalization failed: {0}")]
    InvalidDate(#[source] NormalizeError),
}

impl CycleError {
    /// Short machine-friendly name of the failure kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::AuthUnavailable(_) => "auth_unavailable",
            CycleError::FetchFailed(_) => "fetch_failed",
            CycleError::InvalidDate(_) => "invalid_date",
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
