use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::app::Result;
use crate::fetcher::{FetchOutcome, Fetcher};

pub const DEFAULT_WORKERS: usize = 10;

/// Runs independent fetchers concurrently, at most `workers` at a time.
pub struct ParallelFetcher {
    semaphore: Arc<Semaphore>,
}

impl Default for ParallelFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelFetcher {
    pub fn new() -> Self {
        Self::with_workers(DEFAULT_WORKERS)
    }

    pub fn with_workers(workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Fetch every feed, returning results in input order. Feeds whose task
    /// panicked are logged and left out.
    pub async fn fetch_all(
        &self,
        fetchers: Vec<(String, Fetcher)>,
    ) -> Vec<(String, Result<FetchOutcome>)> {
        let mut handles = Vec::new();

        for (feed, fetcher) in fetchers {
            let semaphore = self.semaphore.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("Semaphore closed");

                let result = fetcher.fetch().await;
                (feed, result)
            });

            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CacheSlot, FetchTarget, RetryPolicy};
    use crate::fetcher::testing::ScriptedTransport;
    use reqwest::StatusCode;
    use std::time::Duration;

    fn fetcher(dir: &std::path::Path, name: &str, transport: ScriptedTransport) -> Fetcher {
        Fetcher::new(
            FetchTarget::new(format!("https://example.com/{name}")),
            CacheSlot::new(dir.join(name)),
            RetryPolicy::new(1, Duration::ZERO, Duration::from_secs(5)),
            Arc::new(transport),
        )
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let fetchers = vec![
            ("a".to_string(), fetcher(dir.path(), "a", ScriptedTransport::new().get_ok(b"aaa"))),
            (
                "b".to_string(),
                fetcher(dir.path(), "b", ScriptedTransport::new().get_status(StatusCode::NOT_FOUND)),
            ),
            ("c".to_string(), fetcher(dir.path(), "c", ScriptedTransport::new().get_error("boom"))),
        ];

        let results = ParallelFetcher::with_workers(2).fetch_all(fetchers).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "a");
        assert_eq!(
            results[0].1.as_ref().unwrap(),
            &FetchOutcome::Downloaded { bytes: 3 }
        );
        assert_eq!(results[1].0, "b");
        assert!(matches!(
            results[1].1.as_ref().unwrap(),
            FetchOutcome::PermanentError { .. }
        ));
        assert_eq!(results[2].0, "c");
        assert!(results[2].1.is_err());
        assert_eq!(std::fs::read(dir.path().join("a")).unwrap(), b"aaa");
    }

    #[tokio::test]
    async fn test_zero_workers_still_progresses() {
        let dir = tempfile::tempdir().unwrap();
        let fetchers = vec![(
            "only".to_string(),
            fetcher(dir.path(), "only", ScriptedTransport::new().get_ok(b"x")),
        )];

        let results = ParallelFetcher::with_workers(0).fetch_all(fetchers).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_ok());
    }
}
