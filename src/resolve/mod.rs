//! Resolution of a rule's feed into a fetch target and a cache slot.
//!
//! Remote: invocation override, then rule defaults, then the feed table.
//! Provider: rule, then rule defaults, then inferred from the remote host.
//! Cache file: `<root>/<provider>/<name>` where the name is the feed's
//! explicit `cache` entry, a data file name found in the remote path, or the
//! feed name itself.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::app::{FetchError, Result};
use crate::config::FetcherConfig;
use crate::domain::{CacheSlot, Credentials, FeedEntry, FetchTarget, Rule};

static RE_FQDN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:xn--)?[a-z0-9][a-z0-9\-_.]{0,245}[a-z0-9]?\.(?:xn--)?(?:[a-z0-9\-]{1,61}|[a-z0-9\-]{1,30}\.[a-z]{2,})",
    )
    .expect("valid FQDN pattern")
});

static RE_CACHE_TYPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.-]+\.(?:csv|zip|txt|gz|json|xml|tsv)$").expect("valid cache name pattern")
});

/// Everything a fetcher needs for one feed.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub feed: String,
    pub provider: String,
    pub target: FetchTarget,
    pub slot: CacheSlot,
}

pub fn resolve(
    rule: &Rule,
    feed: &str,
    cache_root: &Path,
    config: &FetcherConfig,
) -> Result<Resolved> {
    let entry = rule
        .feed(feed)
        .ok_or_else(|| FetchError::FeedNotFound(feed.to_string()))?;

    let remote = resolve_remote(rule, feed, entry)?;
    let provider = resolve_provider(rule, &remote)?;
    let path = cache_path(cache_root, &provider, feed, entry, &remote);
    tracing::debug!("Cache for {}/{}: {}", provider, feed, path.display());

    let target = FetchTarget::new(remote)
        .with_credentials(resolve_credentials(rule, entry))
        .with_verify_ssl(entry.verify_ssl.unwrap_or(config.verify_ssl))
        .with_timeout(config.timeout());

    Ok(Resolved {
        feed: feed.to_string(),
        provider,
        target,
        slot: CacheSlot::new(path),
    })
}

fn resolve_remote(rule: &Rule, feed: &str, entry: &FeedEntry) -> Result<String> {
    rule.remote
        .clone()
        .or_else(|| rule.defaults.remote.clone())
        .or_else(|| entry.remote.clone())
        .ok_or_else(|| FetchError::MissingRemote(feed.to_string()))
}

fn resolve_provider(rule: &Rule, remote: &str) -> Result<String> {
    rule.provider
        .clone()
        .or_else(|| rule.defaults.provider.clone())
        .or_else(|| infer_provider(remote))
        .ok_or_else(|| FetchError::UnknownProvider(remote.to_string()))
}

fn resolve_credentials(rule: &Rule, entry: &FeedEntry) -> Option<Credentials> {
    let (username, password) = match &entry.username {
        Some(username) => (username, &entry.password),
        None => (rule.defaults.username.as_ref()?, &rule.defaults.password),
    };
    Some(Credentials {
        username: username.clone(),
        password: password.clone(),
    })
}

fn cache_path(root: &Path, provider: &str, feed: &str, entry: &FeedEntry, remote: &str) -> PathBuf {
    let name = entry
        .cache
        .clone()
        .or_else(|| sniff_cache_name(remote))
        .unwrap_or_else(|| feed.to_string());
    root.join(provider).join(name)
}

/// Provider identifier for a remote: its host name, lowercased.
pub fn infer_provider(remote: &str) -> Option<String> {
    if let Ok(url) = Url::parse(remote) {
        if let Some(host) = url.host_str() {
            return Some(host.to_lowercase());
        }
    }
    RE_FQDN.find(remote).map(|m| m.as_str().to_lowercase())
}

/// File name of a data file or archive at the end of the remote path.
pub fn sniff_cache_name(remote: &str) -> Option<String> {
    let last = match Url::parse(remote) {
        Ok(url) => url.path_segments()?.last()?.to_string(),
        Err(_) => {
            let path = remote.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/').next().unwrap_or_default().to_string()
        }
    };
    RE_CACHE_TYPES.is_match(&last).then_some(last)
}
