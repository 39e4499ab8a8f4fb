//! Byte transport for image sources.

#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(feature = "http")]
pub use http::HttpNetworking;

/// A network-layer failure, passed through to callers untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("unexpected status code {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),
}

/// Fetches the bytes behind a locator.
///
/// Dropping the returned future must abandon the request; the fetcher
/// relies on this to cancel in-flight downloads.
#[async_trait]
pub trait Networking: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}
