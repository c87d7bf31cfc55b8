pub mod completions;
pub mod config;
pub mod once;
pub mod run;
pub mod token;

use std::path::{Path, PathBuf};

use calboard_core::{config::default_path, Config, ReqwestTransport};

/// The explicit path if given, else the per-user default.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(default_path()?),
    }
}

/// Resolve the config path and load it. A missing file yields defaults.
pub fn load_config(
    explicit: Option<&Path>,
) -> Result<(PathBuf, Config), Box<dyn std::error::Error>> {
    let path = config_path(explicit)?;
    let config = Config::load_or_default(&path)?;
    Ok((path, config))
}

/// HTTP client honoring the configured timeout and response cap.
pub fn build_transport(config: &Config) -> Result<ReqwestTransport, Box<dyn std::error::Error>> {
    Ok(ReqwestTransport::new(config.sync.http_timeout(), config.sync.max_response_bytes)?)
}
