//! Periodic refresh of a rule's feeds.
//!
//! Runs in the foreground until SIGINT/SIGTERM. The signal cancels the shared
//! token, which also interrupts any retry delay in progress.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, Result};
use crate::cli::commands;
use crate::domain::Rule;

/// Watch loop configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Refresh interval in seconds (default: 3600 = 1 hour)
    pub interval_secs: u64,
    /// Whether to refresh immediately on start
    pub update_on_start: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            update_on_start: true,
        }
    }
}

impl WatchConfig {
    /// Parse interval string like "1h", "30m", "6h", "1d"
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();

        let secs = if let Some(hours) = s.strip_suffix('h') {
            hours
                .parse::<u64>()
                .map(|h| h * 3600)
                .map_err(|_| format!("Invalid hours: {}", hours))
        } else if let Some(minutes) = s.strip_suffix('m') {
            minutes
                .parse::<u64>()
                .map(|m| m * 60)
                .map_err(|_| format!("Invalid minutes: {}", minutes))
        } else if let Some(days) = s.strip_suffix('d') {
            days.parse::<u64>()
                .map(|d| d * 86400)
                .map_err(|_| format!("Invalid days: {}", days))
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map_err(|_| format!("Invalid seconds: {}", secs))
        } else {
            s.parse::<u64>()
                .map_err(|_| format!("Invalid interval: {}. Use format like '1h', '30m', '1d'", s))
        }?;

        if secs == 0 {
            return Err("Interval must be greater than zero".to_string());
        }
        Ok(secs)
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs.is_multiple_of(86400) {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs.is_multiple_of(3600) {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs.is_multiple_of(60) {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

pub struct Watcher {
    ctx: Arc<AppContext>,
    rule: Rule,
    config: WatchConfig,
}

impl Watcher {
    pub fn new(ctx: Arc<AppContext>, rule: Rule, config: WatchConfig) -> Self {
        Self { ctx, rule, config }
    }

    /// Install signal handlers and refresh until one fires.
    pub async fn run(&self) -> Result<()> {
        spawn_signal_handler(self.ctx.cancel.clone());
        self.watch().await.map(|_| ())
    }

    /// Refresh until the context's token is cancelled.
    pub async fn watch(&self) -> Result<u64> {
        let cancel = &self.ctx.cancel;
        let mut cycles = 0;

        tracing::info!(
            "Watching {} feeds (interval: {}, PID: {})",
            self.rule.feeds.len(),
            WatchConfig::format_interval(self.config.interval_secs),
            std::process::id()
        );

        if self.config.update_on_start && !cancel.is_cancelled() {
            tracing::info!("Running initial update...");
            self.run_update().await;
            cycles += 1;
        }

        let period = Duration::from_secs(self.config.interval_secs.max(1));
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // Skip the first immediate tick

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {
                    tracing::info!("Running scheduled update...");
                    self.run_update().await;
                    cycles += 1;
                }
            }
        }

        tracing::info!("Watcher shutting down after {} updates", cycles);
        Ok(cycles)
    }

    async fn run_update(&self) {
        let start = std::time::Instant::now();

        match commands::fetch_feeds(&self.ctx, &self.rule, None, false).await {
            Ok(summary) => tracing::info!(
                "Update complete: {} downloaded, {} fresh, {} failed ({:.1}s)",
                summary.downloaded,
                summary.fresh,
                summary.failed,
                start.elapsed().as_secs_f64()
            ),
            Err(e) => tracing::error!("Update failed: {}", e),
        }
    }
}

fn spawn_signal_handler(cancel: CancellationToken) {
    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    tracing::error!("Failed to set up signal handlers");
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
        cancel.cancel();
    });

    #[cfg(windows)]
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel.cancel();
    });
}
