//! Settings for assembling a production [`ImageFetcher`](crate::ImageFetcher).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::processing::processor::DEFAULT_MAX_CONCURRENT;

/// Configuration for the disk cache, HTTP transport and image processor.
///
/// Every field has a default, so a partial JSON document is enough:
/// ```rust
/// use imgfetch::config::FetcherConfig;
///
/// let config = FetcherConfig::from_json_str(r#"{ "request_timeout_secs": 10 }"#).unwrap();
/// assert_eq!(config.request_timeout_secs, 10);
/// assert_eq!(config.max_concurrent_processing, Some(2));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Directory holding cached images (default: `<temp dir>/imgfetch`)
    pub cache_dir: PathBuf,
    /// Decode/resize operations allowed at once; `None` means unbounded (default: 2)
    pub max_concurrent_processing: Option<usize>,
    /// Per-request network timeout in seconds (default: 30)
    pub request_timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("imgfetch"),
            max_concurrent_processing: Some(DEFAULT_MAX_CONCURRENT),
            request_timeout_secs: 30,
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}

impl FetcherConfig {
    /// Parses a JSON document and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FetcherConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_processing == Some(0) {
            return Err(Error::Config(
                "max_concurrent_processing must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_max_concurrent_processing(mut self, limit: Option<usize>) -> Self {
        if let Some(limit) = limit {
            assert!(limit > 0, "Max concurrency must be greater than 0");
        }
        self.max_concurrent_processing = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        assert!(!timeout.is_zero(), "Request timeout cannot be zero");
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
