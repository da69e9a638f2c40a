//! Configuration management for feedcache.
//!
//! Configuration is read from `~/.config/feedcache/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! Environment variables are applied on top of the file, once, before any
//! fetcher is built.

pub mod fetcher;

pub use fetcher::{FetcherConfig, WriteMode};

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const ENV_TIMEOUT: &str = "FEEDCACHE_FETCHER_TIMEOUT";
pub const ENV_RETRIES: &str = "FEEDCACHE_FETCHER_RETRIES";
pub const ENV_RETRY_DELAY: &str = "FEEDCACHE_FETCHER_RETRY_DELAY";
pub const ENV_NO_HEAD: &str = "FEEDCACHE_FETCHER_NOHEAD";
pub const ENV_CACHE: &str = "FEEDCACHE_CACHE";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the on-disk cache; providers get a subdirectory each.
    pub cache_dir: Option<PathBuf>,
    pub fetcher: FetcherConfig,
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// A missing default config file is created with comments. An explicitly
    /// given path must exist. Missing fields use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/feedcache/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedcache").join("config.toml"))
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// `FEEDCACHE_FETCHER_NOHEAD` is enabled by any non-empty value except
    /// `0` and `false`.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TIMEOUT) {
            self.fetcher.timeout_secs = parse_env(ENV_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_RETRIES) {
            self.fetcher.retries = parse_env(ENV_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_RETRY_DELAY) {
            self.fetcher.retry_delay_secs = parse_env(ENV_RETRY_DELAY, &value)?;
        }
        if let Some(value) = lookup(ENV_NO_HEAD) {
            let value = value.trim().to_lowercase();
            self.fetcher.no_head = !(value.is_empty() || value == "0" || value == "false");
        }
        if let Some(value) = lookup(ENV_CACHE) {
            if !value.is_empty() {
                self.cache_dir = Some(PathBuf::from(value));
            }
        }
        Ok(self)
    }

    /// Apply overrides from the process environment.
    pub fn with_process_env(self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Resolve the cache root: configured value, else `<cache dir>/feedcache`.
    pub fn cache_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::cache_dir()
                .map(|d| d.join("feedcache"))
                .ok_or(ConfigError::NoCacheDir),
        }
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# feedcache configuration
#
# Every [fetcher] value can also be overridden from the environment:
#   FEEDCACHE_FETCHER_TIMEOUT, FEEDCACHE_FETCHER_RETRIES,
#   FEEDCACHE_FETCHER_RETRY_DELAY, FEEDCACHE_FETCHER_NOHEAD
# and the cache root with FEEDCACHE_CACHE.

# Cache root (default: the platform cache directory + "/feedcache")
# cache_dir = "/var/cache/feedcache"

[fetcher]
# Total request timeout in seconds
timeout_secs = 120

# Maximum GET attempts per refresh, the first one included
retries = 3

# Fixed delay between attempts in seconds
retry_delay_secs = 30

# Always refresh, ignoring the remote Last-Modified header
no_head = false

# Verify TLS certificates
verify_ssl = true

# Accept header sent with every request
accept = "application/json"

# Maximum feeds fetched concurrently
workers = 10

# "atomic" keeps the previous cache on a failed refresh,
# "truncate" empties the cache file before downloading
write_mode = "atomic"
"##
        .to_string()
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine cache directory")]
    NoCacheDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}
