use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LAST_MODIFIED};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder};

use crate::app::{FetchError, Result};
use crate::config::FetcherConfig;
use crate::domain::FetchTarget;
use crate::fetcher::{ProbeResponse, RemoteResponse, Transport};

/// reqwest-backed transport. One instance is one HTTP session: connections
/// are reused across the probe, the download and every retry.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, accept: &str, verify_ssl: bool) -> Result<Self> {
        let client = client_builder(user_agent, accept, verify_ssl)?.build()?;
        Ok(Self { client })
    }

    pub fn for_target(target: &FetchTarget, config: &FetcherConfig) -> Result<Self> {
        Self::new(&config.user_agent, &config.accept, target.verify_ssl)
    }

    fn request(&self, method: Method, target: &FetchTarget) -> RequestBuilder {
        let request = self
            .client
            .request(method, &target.url)
            .timeout(target.timeout);

        match &target.credentials {
            Some(creds) => request.basic_auth(&creds.username, creds.password.as_deref()),
            None => request,
        }
    }
}

fn client_builder(user_agent: &str, accept: &str, verify_ssl: bool) -> Result<ClientBuilder> {
    let mut headers = HeaderMap::new();
    let accept = HeaderValue::from_str(accept)
        .map_err(|e| FetchError::Config(format!("invalid accept header {:?}: {}", accept, e)))?;
    headers.insert(ACCEPT, accept);

    Ok(Client::builder()
        .gzip(true)
        .brotli(true)
        .user_agent(user_agent)
        .default_headers(headers)
        .danger_accept_invalid_certs(!verify_ssl))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn head(&self, target: &FetchTarget) -> Result<ProbeResponse> {
        let response = self.request(Method::HEAD, target).send().await?;

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(ProbeResponse {
            status: response.status(),
            last_modified,
        })
    }

    async fn get(&self, target: &FetchTarget) -> Result<RemoteResponse> {
        let response = self.request(Method::GET, target).send().await?;
        let status = response.status();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(FetchError::from))
            .boxed();

        Ok(RemoteResponse { status, body })
    }
}
