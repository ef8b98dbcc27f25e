//! Runtime configuration.
//!
//! Loaded from a TOML file, with a couple of environment overrides applied
//! on top. Every field has a default so an empty file is a valid config.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Overrides `query.database`.
pub const ENV_DATABASE: &str = "REPOGATE_DATABASE";
/// Overrides `gateway.commit_limit`. Zero clears the limit.
pub const ENV_COMMIT_LIMIT: &str = "REPOGATE_COMMIT_LIMIT";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub query: QueryConfig,
}

/// Repository gateway options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Report untracked files as added in working-tree status.
    pub include_untracked: bool,
    /// Cap on the number of commits returned by history queries.
    pub commit_limit: Option<usize>,
    /// Hold a per-repository lock for the duration of each mutation.
    pub serialize_mutations: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            include_untracked: false,
            commit_limit: None,
            serialize_mutations: true,
        }
    }
}

impl GatewayConfig {
    /// Set include_untracked flag.
    pub fn include_untracked(mut self, value: bool) -> Self {
        self.include_untracked = value;
        self
    }

    /// Set the history limit.
    pub fn commit_limit(mut self, value: Option<usize>) -> Self {
        self.commit_limit = value;
        self
    }

    /// Set serialize_mutations flag.
    pub fn serialize_mutations(mut self, value: bool) -> Self {
        self.serialize_mutations = value;
        self
    }
}

/// Tabular query options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// SQLite database file. No executor is configured when unset.
    pub database: Option<PathBuf>,
    /// Truncate rendered tables after this many rows.
    pub max_rows: Option<usize>,
}

impl QueryConfig {
    /// Set the database path.
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }

    /// Set the row limit for rendered tables.
    pub fn max_rows(mut self, value: Option<usize>) -> Self {
        self.max_rows = value;
        self
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `REPOGATE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            self.query.database = Some(PathBuf::from(db));
        }

        if let Some(raw) = lookup(ENV_COMMIT_LIMIT) {
            let limit: usize = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_COMMIT_LIMIT,
                value: raw.clone(),
            })?;
            self.gateway.commit_limit = (limit > 0).then_some(limit);
        }

        Ok(())
    }
}
