use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::app::{FetchError, Result};
use crate::domain::{FetchTarget, RetryPolicy};
use crate::fetcher::{RemoteResponse, Transport};

/// Statuses worth asking again for: rate limiting and gateway/server trouble.
pub const TRANSIENT_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

pub fn is_transient(status: StatusCode) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

/// Final state of a GET retry sequence.
pub enum Attempt {
    Success(RemoteResponse),
    Exhausted { status: StatusCode, attempts: u32 },
    Permanent { status: StatusCode },
}

/// Issue GETs until a 200, a non-retryable status, or the attempt budget
/// runs out, sleeping a fixed delay between attempts.
///
/// Network errors are returned as-is and not retried, and so is a GET that
/// outlives the policy timeout. The delay is cut short with
/// [`FetchError::Cancelled`] when `cancel` fires.
pub async fn get_with_retry(
    transport: &(dyn Transport + Send + Sync),
    target: &FetchTarget,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Attempt> {
    let mut attempt = 1;

    loop {
        let response = tokio::time::timeout(policy.timeout(), transport.get(target))
            .await
            .map_err(|_| FetchError::Timeout {
                url: target.url.clone(),
                secs: policy.timeout().as_secs(),
            })??;
        let status = response.status;

        if status == StatusCode::OK {
            return Ok(Attempt::Success(response));
        }

        if !is_transient(status) {
            tracing::warn!("{} returned {}, not retrying", target.url, status);
            return Ok(Attempt::Permanent { status });
        }

        if attempt >= policy.max_attempts() {
            tracing::warn!(
                "{} still returned {} after {} attempts, giving up",
                target.url,
                status,
                attempt
            );
            return Ok(Attempt::Exhausted {
                status,
                attempts: attempt,
            });
        }

        let delay = policy.retry_delay();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::info!("Rate limit exceeded, retrying in {}s", delay.as_secs());
        } else {
            tracing::warn!("{} found, retrying in {}s", status, delay.as_secs());
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::ScriptedTransport;
    use std::time::Duration;
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_secs(30), Duration::from_secs(120))
    }

    #[test]
    fn test_transient_statuses() {
        for code in [429, 500, 502, 503, 504] {
            assert!(is_transient(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [200, 304, 400, 401, 403, 404, 501, 505] {
            assert!(!is_transient(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_does_not_sleep() {
        let transport = ScriptedTransport::new().get_ok(b"body");
        let target = FetchTarget::new("https://example.com/x");
        let start = Instant::now();

        let attempt = get_with_retry(&transport, &target, &policy(3), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(attempt, Attempt::Success(_)));
        assert_eq!(transport.get_calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_success() {
        let transport = ScriptedTransport::new()
            .get_status(StatusCode::TOO_MANY_REQUESTS)
            .get_ok(b"body");
        let target = FetchTarget::new("https://example.com/x");
        let start = Instant::now();

        let attempt = get_with_retry(&transport, &target, &policy(3), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(attempt, Attempt::Success(_)));
        assert_eq!(transport.get_calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_counts_first_attempt() {
        let transport = ScriptedTransport::new()
            .get_status(StatusCode::BAD_GATEWAY)
            .get_status(StatusCode::SERVICE_UNAVAILABLE)
            .get_status(StatusCode::GATEWAY_TIMEOUT);
        let target = FetchTarget::new("https://example.com/x");
        let start = Instant::now();

        let attempt = get_with_retry(&transport, &target, &policy(3), &CancellationToken::new())
            .await
            .unwrap();

        match attempt {
            Attempt::Exhausted { status, attempts } => {
                assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
                assert_eq!(attempts, 3);
            }
            _ => panic!("expected exhaustion"),
        }
        assert_eq!(transport.get_calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_status_is_not_retried() {
        let transport = ScriptedTransport::new().get_status(StatusCode::NOT_FOUND);
        let target = FetchTarget::new("https://example.com/x");

        let attempt = get_with_retry(&transport, &target, &policy(3), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(
            attempt,
            Attempt::Permanent { status } if status == StatusCode::NOT_FOUND
        ));
        assert_eq!(transport.get_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_surfaces() {
        let transport = ScriptedTransport::new().get_error("connection reset");
        let target = FetchTarget::new("https://example.com/x");

        let result =
            get_with_retry(&transport, &target, &policy(3), &CancellationToken::new()).await;

        assert!(matches!(result, Err(FetchError::Other(msg)) if msg == "connection reset"));
        assert_eq!(transport.get_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_get_times_out() {
        let transport = ScriptedTransport::new().get_hang();
        let target = FetchTarget::new("https://example.com/x");
        let policy = RetryPolicy::new(3, Duration::from_secs(30), Duration::from_secs(5));
        let start = Instant::now();

        let result = get_with_retry(&transport, &target, &policy, &CancellationToken::new()).await;

        assert!(matches!(result, Err(FetchError::Timeout { secs: 5, .. })));
        assert_eq!(transport.get_calls(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_delay() {
        let transport = ScriptedTransport::new()
            .get_status(StatusCode::SERVICE_UNAVAILABLE)
            .get_ok(b"never");
        let target = FetchTarget::new("https://example.com/x");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = get_with_retry(&transport, &target, &policy(3), &cancel).await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_eq!(transport.get_calls(), 1);
    }
}
