pub mod cache_fetcher;
pub mod freshness;
pub mod http_transport;
pub mod parallel;
pub mod retry;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::StatusCode;

use crate::app::Result;
use crate::domain::FetchTarget;

pub use cache_fetcher::Fetcher;
pub use http_transport::HttpTransport;

/// Streaming response body.
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// Answer to a metadata-only request.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: StatusCode,
    /// Raw `Last-Modified` header value, if the server sent one
    pub last_modified: Option<String>,
}

/// Answer to a full GET, body not yet consumed.
pub struct RemoteResponse {
    pub status: StatusCode,
    pub body: BodyStream,
}

/// What a call to [`Fetcher::fetch`] did to the cache slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The cache slot now holds the full remote body
    Downloaded { bytes: u64 },
    /// The remote is not newer than the cache; nothing was transferred
    Fresh,
    /// Every attempt got a transient status (429 or 5xx)
    RetriesExhausted { status: StatusCode, attempts: u32 },
    /// The server answered with a non-retryable status
    PermanentError { status: StatusCode },
}

impl FetchOutcome {
    /// Whether the cache slot holds content usable by a decoder.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Downloaded { .. } | Self::Fresh)
    }
}

#[async_trait]
pub trait Transport {
    async fn head(&self, target: &FetchTarget) -> Result<ProbeResponse>;

    async fn get(&self, target: &FetchTarget) -> Result<RemoteResponse>;
}
