//! Client configuration.
//!
//! Resolution order for every setting: environment variable, then
//! `config.toml` under the platform config directory, then the built-in
//! default. The data directory holds the persisted session record.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default remote API base URL (public demo backend).
pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";

/// Default access-token lifetime requested on login/refresh (minutes).
pub const DEFAULT_EXPIRES_IN_MINS: u32 = 30;

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote API base URL, without a trailing slash.
    pub base_url: String,
    /// Access-token lifetime requested on login/refresh (minutes).
    pub expires_in_mins: u32,
    /// Directory holding the persisted session record.
    pub data_dir: PathBuf,
}

/// On-disk layout of `config.toml`.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    api: ApiSection,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    base_url: Option<String>,
    expires_in_mins: Option<u32>,
}

impl ClientConfig {
    /// Load configuration from the environment and the config file.
    pub fn load() -> Result<Self> {
        let file = read_config_file()?;

        let base_url = std::env::var("TURNSTILE_API_URL")
            .ok()
            .or(file.api.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let expires_in_mins = match std::env::var("TURNSTILE_TOKEN_TTL_MINS") {
            Ok(raw) => raw
                .parse()
                .context("TURNSTILE_TOKEN_TTL_MINS must be a positive integer")?,
            Err(_) => file.api.expires_in_mins.unwrap_or(DEFAULT_EXPIRES_IN_MINS),
        };

        let data_dir = match std::env::var("TURNSTILE_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_data_dir()?,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            expires_in_mins,
            data_dir,
        })
    }

    /// Path of the persisted session record.
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(crate::session::STORAGE_FILE)
    }
}

fn read_config_file() -> Result<ConfigFile> {
    let Some(path) = config_file_path() else {
        return Ok(ConfigFile::default());
    };
    match std::fs::read_to_string(&path) {
        Ok(raw) => toml::from_str(&raw)
            .with_context(|| format!("invalid config file at {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "turnstile")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn default_data_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "turnstile")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("could not determine a data directory for this platform")
}
