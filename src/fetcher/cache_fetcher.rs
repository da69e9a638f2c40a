use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::app::Result;
use crate::config::{FetcherConfig, WriteMode};
use crate::domain::{CacheSlot, FetchTarget, RetryPolicy};
use crate::fetcher::freshness::{is_fresh, parse_http_date};
use crate::fetcher::retry::{get_with_retry, Attempt};
use crate::fetcher::writer::CacheWriter;
use crate::fetcher::{FetchOutcome, HttpTransport, Transport};
use crate::resolve::Resolved;

/// Keeps one cache slot in sync with one remote resource.
pub struct Fetcher {
    target: FetchTarget,
    slot: CacheSlot,
    policy: RetryPolicy,
    transport: Arc<dyn Transport + Send + Sync>,
    force_refresh: bool,
    write_mode: WriteMode,
    cancel: CancellationToken,
}

impl Fetcher {
    pub fn new(
        target: FetchTarget,
        slot: CacheSlot,
        policy: RetryPolicy,
        transport: Arc<dyn Transport + Send + Sync>,
    ) -> Self {
        Self {
            target,
            slot,
            policy,
            transport,
            force_refresh: false,
            write_mode: WriteMode::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Build a fetcher with its own HTTP session for a resolved feed.
    pub fn from_resolved(resolved: Resolved, config: &FetcherConfig) -> Result<Self> {
        let transport = HttpTransport::for_target(&resolved.target, config)?;
        Ok(
            Self::new(resolved.target, resolved.slot, config.retry_policy(), Arc::new(transport))
                .with_force_refresh(config.no_head)
                .with_write_mode(config.write_mode),
        )
    }

    /// Skip the Last-Modified comparison and always download.
    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Token that interrupts the delay between retries.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn target(&self) -> &FetchTarget {
        &self.target
    }

    pub fn slot(&self) -> &CacheSlot {
        &self.slot
    }

    /// Bring the cache slot up to date.
    ///
    /// An empty or missing cache is always downloaded. Otherwise a HEAD probe
    /// decides: a remote `Last-Modified` not newer than the cache mtime means
    /// the cache is fresh. A failed probe, a missing or unparseable header,
    /// or an unreadable mtime all fall through to a full download.
    pub async fn fetch(&self) -> Result<FetchOutcome> {
        self.slot.ensure_parent()?;

        if self.slot.size() == 0 {
            tracing::debug!("Cache size is 0, downloading {}", self.target.url);
            return self.refresh().await;
        }

        let Some(remote_ts) = self.probe().await else {
            return self.refresh().await;
        };

        let Some(cache_ts) = self.slot.modified() else {
            tracing::debug!("No mtime for {}", self.slot.path().display());
            return self.refresh().await;
        };

        if !self.force_refresh && is_fresh(remote_ts, cache_ts) {
            tracing::debug!("Cache is OK: {} <= {}", remote_ts, cache_ts);
            return Ok(FetchOutcome::Fresh);
        }

        tracing::debug!("Refreshing cache for {}", self.target.url);
        self.refresh().await
    }

    /// Remote modification time, or `None` when it cannot be trusted.
    async fn probe(&self) -> Option<DateTime<Utc>> {
        tracing::debug!("Checking HEAD for {}", self.target.url);

        let head = tokio::time::timeout(self.policy.timeout(), self.transport.head(&self.target));
        let response = match head.await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!("HEAD {} failed: {}", self.target.url, e);
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    "HEAD {} timed out after {}s",
                    self.target.url,
                    self.policy.timeout().as_secs()
                );
                return None;
            }
        };

        if !response.status.is_success() {
            tracing::debug!("HEAD {} returned {}", self.target.url, response.status);
            return None;
        }

        let Some(raw) = response.last_modified else {
            tracing::debug!("No Last-Modified header from {}", self.target.url);
            return None;
        };

        let parsed = parse_http_date(&raw);
        if parsed.is_none() {
            tracing::debug!("Unparseable Last-Modified {:?} from {}", raw, self.target.url);
        }
        parsed
    }

    /// Download the full body into the cache slot.
    async fn refresh(&self) -> Result<FetchOutcome> {
        let mut writer = CacheWriter::open(&self.slot, self.write_mode).await?;

        let attempt = get_with_retry(
            self.transport.as_ref(),
            &self.target,
            &self.policy,
            &self.cancel,
        )
        .await?;

        let response = match attempt {
            Attempt::Success(response) => response,
            Attempt::Exhausted { status, attempts } => {
                return Ok(FetchOutcome::RetriesExhausted { status, attempts });
            }
            Attempt::Permanent { status } => {
                return Ok(FetchOutcome::PermanentError { status });
            }
        };

        let bytes = writer.write_body(response.body).await?;
        writer.commit().await?;

        tracing::info!(
            "Downloaded {} bytes from {} to {}",
            bytes,
            self.target.url,
            self.slot.path().display()
        );
        Ok(FetchOutcome::Downloaded { bytes })
    }
}
