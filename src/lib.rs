//! # feedcache
//!
//! Keeps local copies of remote feed files (blocklists, CSV exports, zipped
//! dumps) up to date without downloading them more often than needed.
//!
//! ## Architecture
//!
//! ```text
//! Rule → Resolve → Fetcher (HEAD probe → GET with retry → chunked write) → Decoder
//! ```
//!
//! - [`resolve`]: Turns a rule's feed entry into a URL and a cache path
//! - [`fetcher`]: Freshness probe, bounded retry and streaming writes
//! - [`decoder`]: Optional gzip/zip extraction of fetched files
//! - [`watch`]: Periodic refresh until interrupted
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch every feed of a rule file
//! feedcache fetch rules/abuse.toml
//!
//! # Fetch one URL into the cache
//! feedcache get https://example.com/list.txt
//!
//! # Show what is cached
//! feedcache status rules/abuse.toml
//!
//! # Refresh every 6 hours
//! feedcache watch rules/abuse.toml --interval 6h
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the
/// configuration, cache root, worker pool and cancellation token.
pub mod app;

/// Configuration management.
///
/// Loads from `~/.config/feedcache/config.toml`, then applies
/// `FEEDCACHE_*` environment overrides.
pub mod config;

/// Command-line interface using clap.
///
/// - `fetch <rule>` - Fetch a rule's feeds
/// - `get <url>` - Fetch a single URL
/// - `status <rule>` - Show cache state
/// - `watch <rule>` - Refresh periodically
pub mod cli;

/// Post-fetch gzip/zip decoding.
pub mod decoder;

/// Core domain models.
///
/// - [`Rule`](domain::Rule): Feed rule file
/// - [`FetchTarget`](domain::FetchTarget): Where and how to fetch
/// - [`CacheSlot`](domain::CacheSlot): Where the copy lives
/// - [`RetryPolicy`](domain::RetryPolicy): Attempts, delay and timeout
pub mod domain;

/// Cache-aware HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Keeps one cache slot in sync
/// - [`Transport`](fetcher::Transport): Async trait over HEAD/GET
/// - [`HttpTransport`](fetcher::HttpTransport): reqwest-based implementation
/// - [`ParallelFetcher`](fetcher::parallel::ParallelFetcher): Concurrent fetching with semaphore
pub mod fetcher;

/// Rule resolution: remote URL, provider and cache path.
pub mod resolve;

/// Foreground watch loop.
pub mod watch;
