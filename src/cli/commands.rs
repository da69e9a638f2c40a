use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::app::{AppContext, FetchError, Result};
use crate::decoder;
use crate::domain::Rule;
use crate::fetcher::FetchOutcome;
use crate::resolve::Resolved;

/// Tally of one fetch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub fresh: usize,
    pub failed: usize,
}

impl FetchSummary {
    pub fn record(&mut self, result: &Result<FetchOutcome>) {
        match result {
            Ok(FetchOutcome::Downloaded { .. }) => self.downloaded += 1,
            Ok(FetchOutcome::Fresh) => self.fresh += 1,
            Ok(_) | Err(_) => self.failed += 1,
        }
    }
}

/// Fetch `feed` of `rule`, or all of its feeds in parallel.
pub async fn fetch_feeds(
    ctx: &AppContext,
    rule: &Rule,
    feed: Option<&str>,
    decode: bool,
) -> Result<FetchSummary> {
    let fetchers = ctx.fetchers(rule, feed)?;
    if fetchers.is_empty() {
        println!("No feeds to fetch");
        return Ok(FetchSummary::default());
    }

    let paths: HashMap<String, PathBuf> = fetchers
        .iter()
        .map(|(name, f)| (name.clone(), f.slot().path().to_path_buf()))
        .collect();

    let results = ctx.parallel_fetcher.fetch_all(fetchers).await;

    let mut summary = FetchSummary::default();
    for (name, result) in &results {
        summary.record(result);
        let Some(path) = paths.get(name) else {
            continue;
        };
        match result {
            Ok(FetchOutcome::Downloaded { bytes }) => {
                println!("  {}: downloaded {} bytes to {}", name, bytes, path.display());
            }
            Ok(FetchOutcome::Fresh) => {
                println!("  {}: cache is fresh ({})", name, path.display());
            }
            Ok(FetchOutcome::RetriesExhausted { status, attempts }) => {
                eprintln!("  {}: gave up after {} attempts ({})", name, attempts, status);
            }
            Ok(FetchOutcome::PermanentError { status }) => {
                eprintln!("  {}: server answered {}", name, status);
            }
            Err(e) => {
                eprintln!("  Error fetching {}: {}", name, e);
            }
        }

        if decode && result.as_ref().is_ok_and(FetchOutcome::is_usable) {
            match decoder::decode(path) {
                Ok(decoded) if decoded != *path => {
                    println!("  {}: decoded to {}", name, decoded.display())
                }
                Ok(_) => {}
                Err(e) => eprintln!("  {}: {}", name, e),
            }
        }
    }

    println!(
        "Fetch complete: {} downloaded, {} fresh, {} failed",
        summary.downloaded, summary.fresh, summary.failed
    );
    Ok(summary)
}

/// On-disk state of one feed's cache slot.
#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub feed: String,
    pub provider: String,
    pub remote: String,
    pub path: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub sha256: Option<String>,
}

pub fn slot_status(resolved: &Resolved) -> Result<SlotStatus> {
    let slot = &resolved.slot;
    let sha256 = if slot.exists() {
        Some(file_sha256(slot.path())?)
    } else {
        None
    };

    Ok(SlotStatus {
        feed: resolved.feed.clone(),
        provider: resolved.provider.clone(),
        remote: resolved.target.url.clone(),
        path: slot.path().display().to_string(),
        size: slot.size(),
        modified: slot.modified(),
        sha256,
    })
}

pub fn show_status(ctx: &AppContext, rule: &Rule, feed: Option<&str>, json: bool) -> Result<()> {
    let statuses = ctx
        .resolve_all(rule, feed)?
        .iter()
        .map(slot_status)
        .collect::<Result<Vec<_>>>()?;

    if json {
        let out = serde_json::to_string_pretty(&statuses)
            .map_err(|e| FetchError::Other(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    if statuses.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for status in statuses {
        let modified = status
            .modified
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}/{} ({} bytes, modified {})\n  {}\n  {}",
            status.provider, status.feed, status.size, modified, status.remote, status.path
        );
        if let Some(hash) = status.sha256 {
            println!("  sha256 {}", hash);
        }
    }

    Ok(())
}

fn file_sha256(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
