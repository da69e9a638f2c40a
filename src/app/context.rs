use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::app::error::{FetchError, Result};
use crate::config::Config;
use crate::domain::Rule;
use crate::fetcher::parallel::ParallelFetcher;
use crate::fetcher::Fetcher;
use crate::resolve::{resolve, Resolved};

pub struct AppContext {
    pub config: Config,
    pub cache_root: PathBuf,
    pub parallel_fetcher: ParallelFetcher,
    /// Shared by every fetcher built here; cancelling it aborts retry delays.
    pub cancel: CancellationToken,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let cache_root = config
            .cache_root()
            .map_err(|e| FetchError::Config(e.to_string()))?;
        Ok(Self::with_cache_root(config, cache_root))
    }

    pub fn with_cache_root(config: Config, cache_root: PathBuf) -> Self {
        let parallel_fetcher = ParallelFetcher::with_workers(config.fetcher.workers);

        Self {
            config,
            cache_root,
            parallel_fetcher,
            cancel: CancellationToken::new(),
        }
    }

    pub fn resolve(&self, rule: &Rule, feed: &str) -> Result<Resolved> {
        resolve(rule, feed, &self.cache_root, &self.config.fetcher)
    }

    pub fn fetcher(&self, resolved: Resolved) -> Result<Fetcher> {
        Ok(Fetcher::from_resolved(resolved, &self.config.fetcher)?
            .with_cancellation(self.cancel.clone()))
    }

    /// Resolve `feed`, or every feed of the rule when `None`.
    pub fn resolve_all(&self, rule: &Rule, feed: Option<&str>) -> Result<Vec<Resolved>> {
        match feed {
            Some(name) => Ok(vec![self.resolve(rule, name)?]),
            None => rule
                .feed_names()
                .map(|name| self.resolve(rule, name))
                .collect(),
        }
    }

    /// Build one fetcher per resolved feed, keyed by feed name.
    pub fn fetchers(&self, rule: &Rule, feed: Option<&str>) -> Result<Vec<(String, Fetcher)>> {
        self.resolve_all(rule, feed)?
            .into_iter()
            .map(|resolved| {
                let name = resolved.feed.clone();
                Ok((name, self.fetcher(resolved)?))
            })
            .collect()
    }
}
