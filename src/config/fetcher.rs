use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::RetryPolicy;

/// How a refreshed body replaces the cache file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Stream into a temporary file and rename it over the cache file on success.
    /// A failed refresh leaves the previous cache content in place.
    #[default]
    Atomic,
    /// Truncate the cache file before the first request and stream into it.
    /// A failed refresh leaves an empty cache file behind.
    Truncate,
}

/// Configuration for the remote fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Total request timeout in seconds (default: 120)
    pub timeout_secs: u64,

    /// Maximum GET attempts per refresh, the first one included (default: 3)
    pub retries: u32,

    /// Fixed delay between attempts in seconds (default: 30)
    pub retry_delay_secs: u64,

    /// Ignore the Last-Modified comparison and always refresh (default: false)
    pub no_head: bool,

    /// Verify TLS certificates (default: true)
    pub verify_ssl: bool,

    /// User agent sent with every request
    pub user_agent: String,

    /// Accept header sent with every request (default: application/json)
    pub accept: String,

    /// Maximum feeds fetched concurrently (default: 10)
    pub workers: usize,

    /// Cache replacement strategy (default: atomic)
    pub write_mode: WriteMode,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            retries: 3,
            retry_delay_secs: 30,
            no_head: false,
            verify_ssl: true,
            user_agent: format!("feedcache/{}", env!("CARGO_PKG_VERSION")),
            accept: "application/json".to_string(),
            workers: 10,
            write_mode: WriteMode::Atomic,
        }
    }
}

impl FetcherConfig {
    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the delay between attempts as a Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.retry_delay(), self.timeout())
    }
}
