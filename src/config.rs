//! Configuration loading and validation
//!
//! The config file is JSON by default (`./config.json`); a `.toml`
//! extension switches the parser. Everything is validated before the first
//! network call so a bad config never half-processes a batch.

use crate::error::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "./config.json";

/// Environment variables consulted when the config carries no token
const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Raw config file contents
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// GitHub access token (falls back to `GITHUB_TOKEN` / `GH_TOKEN`)
    #[serde(default)]
    pub access_token: Option<String>,
    /// Repository owner (user or organization)
    #[serde(default)]
    pub owner: String,
    /// Login the token belongs to; reviews by this user count as "ours"
    #[serde(default)]
    pub github_user: String,
    /// Repositories to scan
    #[serde(default)]
    pub repos: Vec<String>,
    /// Title regexes selecting the PRs to manage
    #[serde(default)]
    pub filters: Vec<String>,
    /// GitHub Enterprise host (None for github.com)
    #[serde(default)]
    pub host: Option<String>,
    /// Wait for `blocked` before posting a plan comment
    #[serde(default)]
    pub wait_for_checks_before_plan: bool,
}

/// Validated settings for a run
#[derive(Debug, Clone)]
pub struct Settings {
    /// GitHub access token
    pub access_token: String,
    /// Repository owner
    pub owner: String,
    /// Login whose reviews are inspected and who approves
    pub github_user: String,
    /// Repositories to scan
    pub repos: Vec<String>,
    /// Compiled title filters
    pub filters: TitleFilters,
    /// GitHub Enterprise host
    pub host: Option<String>,
    /// Wait for `blocked` before posting a plan comment
    pub wait_for_checks_before_plan: bool,
}

/// Compiled PR title filters
///
/// Each pattern matches at the start of the title. A title is selected if
/// any pattern matches.
#[derive(Debug, Clone)]
pub struct TitleFilters {
    patterns: Vec<Regex>,
}

impl TitleFilters {
    /// Compile filter patterns; at least one is required
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(Error::Config(
                "No filters to match, please provide at least one".to_string(),
            ));
        }

        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(&format!("^(?:{p})"))
                    .map_err(|e| Error::Config(format!("invalid filter {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Whether `title` is selected by any filter
    pub fn matches(&self, title: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(title))
    }

    /// Number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether there are no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Resolve which config file to read.
///
/// An explicit path is used as-is. For the default path, the user config
/// directory (`<config dir>/automerge/config.json`) is tried when
/// `./config.json` does not exist.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default.exists() {
        return default;
    }

    dirs::config_dir()
        .map(|dir| dir.join("automerge").join("config.json"))
        .filter(|p| p.exists())
        .unwrap_or(default)
}

/// Read and parse a config file without validating it
pub fn read_config(path: &Path) -> Result<ConfigFile> {
    debug!(path = %path.display(), "reading config file");
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Error reading config file at {}. {e}", path.display()))
    })?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    } else {
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }
}

/// Validate raw config into run settings
pub fn validate_config(config: ConfigFile) -> Result<Settings> {
    let access_token = config
        .access_token
        .filter(|t| !t.trim().is_empty())
        .or_else(token_from_env)
        .ok_or_else(|| {
            Error::Config(
                "access_token cannot be empty (set it in the config or via GITHUB_TOKEN)"
                    .to_string(),
            )
        })?;

    if config.owner.trim().is_empty() {
        return Err(Error::Config("owner cannot be empty".to_string()));
    }
    if config.github_user.trim().is_empty() {
        return Err(Error::Config("github_user cannot be empty".to_string()));
    }
    if config.repos.is_empty() {
        return Err(Error::Config("repos must be a non-empty list".to_string()));
    }
    if let Some(repo) = config.repos.iter().find(|r| r.trim().is_empty()) {
        return Err(Error::Config(format!("invalid repo name {repo:?}")));
    }

    let filters = TitleFilters::new(&config.filters)?;

    Ok(Settings {
        access_token,
        owner: config.owner,
        github_user: config.github_user,
        repos: config.repos,
        filters,
        host: config.host.filter(|h| !h.trim().is_empty()),
        wait_for_checks_before_plan: config.wait_for_checks_before_plan,
    })
}

/// Load and validate configuration from file
pub fn load_settings(path: &Path) -> Result<Settings> {
    validate_config(read_config(path)?)
}

fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|t| !t.trim().is_empty())
}
