//! Backend connection configuration.
//!
//! Settings are resolved from three layers, highest precedence first:
//! environment variables, an optional TOML file at
//! `~/.config/agrivision/config.toml`, then built-in defaults. The base URL
//! and anon key have no defaults and must come from one of the first two.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

const ENV_URL: &str = "AGRIVISION_URL";
const ENV_ANON_KEY: &str = "AGRIVISION_ANON_KEY";
const ENV_TABLE: &str = "AGRIVISION_TABLE";
const ENV_SCHEMA: &str = "AGRIVISION_SCHEMA";
const ENV_FETCH_LIMIT: &str = "AGRIVISION_FETCH_LIMIT";
const ENV_POLL_TIMEOUT: &str = "AGRIVISION_POLL_TIMEOUT_SECS";

const DEFAULT_TABLE: &str = "predictions";
const DEFAULT_SCHEMA: &str = "public";
const DEFAULT_FETCH_LIMIT: usize = 50;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 25;

/// Resolved backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend base URL, e.g. `https://example.backend.co`
    pub base_url: String,
    /// Anon API key presented on every request
    pub anon_key: String,
    /// Logical table holding prediction rows
    pub table: String,
    /// Remote schema name
    pub schema: String,
    /// Row cap for recent-record fetches
    pub fetch_limit: usize,
    /// Long-poll request deadline for the change feed
    pub poll_timeout_secs: u64,
}

/// File representation: every field optional so a partial file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    base_url: Option<String>,
    anon_key: Option<String>,
    table: Option<String>,
    schema: Option<String>,
    fetch_limit: Option<usize>,
    poll_timeout_secs: Option<u64>,
}

impl BackendConfig {
    /// Loads configuration from the environment and the default config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// if no base URL / anon key is provided by any layer.
    pub fn load() -> Result<Self> {
        let file = match Self::default_file_path() {
            Some(path) if path.exists() => Some(Self::read_file(&path)?),
            _ => None,
        };
        Self::resolve(file, |key| env::var(key).ok())
    }

    /// Loads configuration from an explicit file path plus env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = Some(Self::read_file(path)?);
        Self::resolve(file, |key| env::var(key).ok())
    }

    /// `~/.config/agrivision/config.toml` (platform equivalent via `dirs`).
    pub fn default_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("agrivision").join("config.toml"))
    }

    fn read_file(path: &Path) -> Result<FileConfig> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Merges the three layers. `lookup` abstracts the environment so the
    /// precedence rules stay testable.
    fn resolve(file: Option<FileConfig>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let Some(base_url) = lookup(ENV_URL).or(file.base_url) else {
            bail!("no backend URL configured; set {ENV_URL} or add base_url to the config file");
        };
        let Some(anon_key) = lookup(ENV_ANON_KEY).or(file.anon_key) else {
            bail!("no anon key configured; set {ENV_ANON_KEY} or add anon_key to the config file");
        };

        let fetch_limit = match lookup(ENV_FETCH_LIMIT) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("{ENV_FETCH_LIMIT} must be a positive integer"))?,
            None => file.fetch_limit.unwrap_or(DEFAULT_FETCH_LIMIT),
        };
        let poll_timeout_secs = match lookup(ENV_POLL_TIMEOUT) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("{ENV_POLL_TIMEOUT} must be a positive integer"))?,
            None => file.poll_timeout_secs.unwrap_or(DEFAULT_POLL_TIMEOUT_SECS),
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            table: lookup(ENV_TABLE)
                .or(file.table)
                .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            schema: lookup(ENV_SCHEMA)
                .or(file.schema)
                .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            fetch_limit,
            poll_timeout_secs,
        })
    }

    /// REST endpoint root, e.g. `https://host/rest/v1`.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base_url)
    }

    /// Auth endpoint root, e.g. `https://host/auth/v1`.
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.base_url)
    }

    /// Change-feed endpoint root, e.g. `https://host/changes/v1`.
    pub fn changes_url(&self) -> String {
        format!("{}/changes/v1", self.base_url)
    }
}
