//! Configuration management for Rewind
//!
//! Handles config file loading/saving and credential lookup.
//! Config is stored at ~/.config/rewind/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::stream::PollPolicy;

/// Environment variable for the server URL
pub const ENV_SERVER_URL: &str = "REWIND_SERVER_URL";
/// Environment variable for the username
pub const ENV_USERNAME: &str = "REWIND_USERNAME";
/// Environment variable for the password (never stored on disk)
pub const ENV_PASSWORD: &str = "REWIND_PASSWORD";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rewind server base URL
    pub server_url: Option<String>,
    /// Username of the last successful login
    pub username: Option<String>,
    /// Heartbeat delay while a stream is pending (ms)
    pub pending_poll_ms: Option<u64>,
    /// Heartbeat delay while a stream is available (s)
    pub available_poll_secs: Option<u64>,
    /// HTTP request timeout (s)
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Get config file path (~/.config/rewind/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rewind").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    /// Load config from `path`, or return default if missing or invalid
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Resolve the server URL: flag, then REWIND_SERVER_URL, then config
    pub fn server_url(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string)
            .or_else(|| std::env::var(ENV_SERVER_URL).ok())
            .or_else(|| self.server_url.clone())
    }

    /// Resolve the username: flag, then REWIND_USERNAME, then config
    pub fn username(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string)
            .or_else(|| std::env::var(ENV_USERNAME).ok())
            .or_else(|| self.username.clone())
    }

    /// Resolve the password: flag, then REWIND_PASSWORD
    pub fn password(flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string)
            .or_else(|| std::env::var(ENV_PASSWORD).ok())
    }

    /// Heartbeat intervals, falling back to the defaults
    pub fn poll_policy(&self) -> PollPolicy {
        let defaults = PollPolicy::default();
        PollPolicy {
            pending: self
                .pending_poll_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pending),
            available: self
                .available_poll_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.available),
        }
    }

    /// HTTP request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(crate::api::rewind::DEFAULT_TIMEOUT)
    }

    /// Remember the server and user of a successful login
    pub fn remember_login(&mut self, server_url: &str, username: &str) {
        self.server_url = Some(server_url.to_string());
        self.username = Some(username.to_string());
    }
}
