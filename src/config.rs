//! Relay configuration
//!
//! Built-in defaults, then an optional YAML file named by `RELAY_CONFIG`,
//! then environment variables. Empty variables count as unset.

use crate::relay::MirrorList;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MIRRORS: [&str; 4] = [
    "https://weao.xyz",
    "https://whatexpsare.online",
    "https://whatexploitsaretra.sh",
    "https://weao.gg",
];

pub const ENV_CONFIG_FILE: &str = "RELAY_CONFIG";
pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "RELAY_HOST";
pub const ENV_MIRRORS: &str = "RELAY_MIRRORS";
pub const ENV_UPSTREAM_TIMEOUT_MS: &str = "RELAY_UPSTREAM_TIMEOUT_MS";

/// Contents of the optional YAML file. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mirrors: Option<Vec<String>>,
    pub upstream_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Invalid relay config YAML")
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&text)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Mirrors in the order they are tried
    pub mirrors: MirrorList,
    /// Bound on each individual mirror call
    pub upstream_timeout: Duration,
}

impl Config {
    /// Load from the process environment (and the file it points to).
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let file = match lookup(ENV_CONFIG_FILE) {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };

        Self::resolve(file, lookup)
    }

    /// Layer environment values over a parsed file.
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = lookup(ENV_HOST)
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup(ENV_PORT) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("{} is not a valid port: {}", ENV_PORT, raw))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let mirrors = match lookup(ENV_MIRRORS) {
            Some(raw) => MirrorList::parse(raw.split(',').map(str::trim).filter(|s| !s.is_empty()))?,
            None => match file.mirrors {
                Some(list) => MirrorList::parse(list)?,
                None => MirrorList::parse(DEFAULT_MIRRORS)?,
            },
        };

        let timeout_ms = match lookup(ENV_UPSTREAM_TIMEOUT_MS) {
            Some(raw) => Some(raw.trim().parse::<u64>().with_context(|| {
                format!("{} is not a number of milliseconds: {}", ENV_UPSTREAM_TIMEOUT_MS, raw)
            })?),
            None => file.upstream_timeout_ms,
        };
        let upstream_timeout = match timeout_ms {
            Some(0) => anyhow::bail!("Upstream timeout must be greater than zero"),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        if mirrors.is_empty() {
            tracing::warn!("No mirrors configured, every request will fail with 502");
        }

        Ok(Self {
            host,
            port,
            mirrors,
            upstream_timeout,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
