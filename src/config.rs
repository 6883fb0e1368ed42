//! Configuration loaded from `~/.config/tuber/config.toml`.
//!
//! Every field has a default, so a missing file (or an empty one) yields a
//! working configuration.
//!
//! ```toml
//! timeout_secs = 20
//! youtube_instance = "https://yewtu.be"
//!
//! [hosts]
//! piped = ["piped.example.org"]
//! piped_api = ["pipedapi.example.org"]
//! invidious = ["yewtu.be"]
//! peertube = ["framatube.org"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Firefox user agent sent by [`crate::HttpTransport`].
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overall deadline for one resolution, in seconds.
    pub timeout_secs: u64,
    /// TCP/TLS connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Invidious instance used to resolve plain YouTube links.
    pub youtube_instance: Option<String>,
    pub hosts: Hosts,
}

/// Extra instance hosts per extractor, merged with the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Hosts {
    pub piped: Vec<String>,
    pub piped_api: Vec<String>,
    pub invidious: Vec<String>,
    pub peertube: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 7,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            youtube_instance: None,
            hosts: Hosts::default(),
        }
    }
}

impl Config {
    /// Load from the default location.
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_path(&path)
    }

    /// Load from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tuber")
        .join("config.toml")
}
