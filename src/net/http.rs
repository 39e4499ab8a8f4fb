//! HTTP transport backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;

use super::{Networking, TransportError};

/// Fetches images over HTTP(S), accepting only 2xx responses.
#[derive(Clone, Debug)]
pub struct HttpNetworking {
    client: reqwest::Client,
}

impl HttpNetworking {
    /// Builds a client with the given per-request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.into())
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client, e.g. one shared with the rest of an application.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransportError::Status(status.as_u16()),
            None => TransportError::Request(err.to_string()),
        }
    }
}

#[async_trait]
impl Networking for HttpNetworking {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "{url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::debug!("GET {url} returned {status}");
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
