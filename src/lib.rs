//! # imgfetch
//!
//! Client-side image acquisition with request deduplication.
//!
//! Describe an image with an [`ImageRequest`] (source URL plus size, aspect,
//! corner and scale settings) and ask an [`ImageFetcher`] for it. The
//! fetcher returns a previously cached, already-processed result when it
//! has one, and otherwise downloads, decodes and processes the image,
//! writing the result back to the cache.
//!
//! ## Features
//!
//! - **One pipeline per request**: concurrent callers asking for the same
//!   image share a single [`FetchTask`], and so a single download
//! - **Self-healing cache**: an unreadable cache entry silently falls back to
//!   the network
//! - **Shared-fate cancellation**: cancelling a request stops its pipeline
//!   for every caller waiting on it
//! - **Replaceable collaborators**: cache, transport and image processing sit
//!   behind the [`Cache`], [`Networking`] and [`ImageProcessing`] traits
//! - **HTTP transport** via reqwest, behind the default `http` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgfetch::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = ImageFetcher::from_config(&FetcherConfig::default()).await?;
//!
//! let request = ImageRequest::new("https://example.com/photo.jpg")
//!     .size(100.0, 100.0)
//!     .constrain(true)
//!     .corner_radius(8.0);
//!
//! match fetcher.load(request).await? {
//!     ImageSource::Cached(image) => println!("from cache: {}x{}", image.width(), image.height()),
//!     ImageSource::Downloaded(image) => println!("downloaded: {}x{}", image.width(), image.height()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cache`]: the [`Cache`] trait and the file-backed [`DiskCache`]
//! - [`net`]: the [`Networking`] trait and, with `http`, `HttpNetworking`
//! - [`processing`]: the [`ImageProcessing`] trait and the bounded [`ImageProcessor`]
//! - [`config`]: [`FetcherConfig`] for assembling the production stack
//! - [`prelude`]: commonly used types (import with `use imgfetch::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Collaborators & Configuration
// ============================================================================

pub mod cache;
pub mod config;
pub mod error;
pub mod net;
pub mod processing;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use crate::core::error::{FetchError, FetchResult};
pub use crate::core::fetcher::ImageFetcher;
pub use crate::core::registry::TaskRegistry;
pub use crate::core::request::{ImageRequest, Priority, Size, derive_key};
pub use crate::core::source::{Image, ImageSource};
pub use crate::core::task::FetchTask;

pub use cache::{Cache, CacheError, DiskCache};
pub use config::FetcherConfig;
pub use error::Error;
pub use net::{Networking, TransportError};
pub use processing::{ImageProcessing, ImageProcessor};

#[cfg(feature = "http")]
pub use net::HttpNetworking;

// ============================================================================
// Prelude
// ============================================================================

/// Everything needed to build a fetcher and request images.
///
/// # Example
/// ```rust
/// use imgfetch::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        Cache, DiskCache, FetchError, FetchTask, FetcherConfig, Image, ImageFetcher,
        ImageProcessing, ImageProcessor, ImageRequest, ImageSource, Networking, Priority,
    };

    #[cfg(feature = "http")]
    pub use super::HttpNetworking;
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
