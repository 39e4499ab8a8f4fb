//! Crate-level error for setup and configuration.
//!
//! Fetch outcomes use [`FetchError`](crate::FetchError); this type covers
//! the fallible steps around it.

use thiserror::Error;

use crate::cache::CacheError;
use crate::net::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("configuration could not be parsed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
