use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::{ImageProcessing, geometry};
use crate::core::error::FetchError;
use crate::core::request::ImageRequest;
use crate::core::source::Image;

/// Default number of decode/resize operations allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Decodes and edits images on tokio's blocking pool.
///
/// At most `max_concurrent` operations hold a worker at a time; the rest
/// wait for a permit. [`cancel_all`](ImageProcessor::cancel_all) fails
/// every waiting and running operation with [`FetchError::Cancelled`].
pub struct ImageProcessor {
    permits: Option<Arc<Semaphore>>,
    generation: Mutex<CancellationToken>,
}

impl ImageProcessor {
    /// Creates a processor. `None` removes the concurrency bound.
    pub fn new(max_concurrent: Option<usize>) -> Self {
        if let Some(limit) = max_concurrent {
            assert!(limit > 0, "Max concurrency must be greater than 0");
        }
        Self {
            permits: max_concurrent.map(|limit| Arc::new(Semaphore::new(limit))),
            generation: Mutex::new(CancellationToken::new()),
        }
    }

    /// Cancels all queued and executing operations.
    ///
    /// Operations started afterwards run normally.
    pub fn cancel_all(&self) {
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        generation.cancel();
        *generation = CancellationToken::new();
    }

    /// Operations currently able to start without waiting.
    pub fn available_permits(&self) -> Option<usize> {
        self.permits.as_ref().map(|permits| permits.available_permits())
    }

    fn current_generation(&self) -> CancellationToken {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn run<F>(&self, work: F) -> Result<Image, FetchError>
    where
        F: FnOnce() -> Result<image::DynamicImage, FetchError> + Send + 'static,
    {
        let cancelled = self.current_generation();

        let execute = async {
            let permit = match &self.permits {
                Some(permits) => Some(
                    Arc::clone(permits)
                        .acquire_owned()
                        .await
                        .map_err(|_| FetchError::Cancelled)?,
                ),
                None => None,
            };
            if cancelled.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            // The permit travels with the blocking job so the bound holds
            // even when the caller stops waiting.
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                work()
            })
            .await
            .map_err(|e| {
                log::error!("image processing job failed to complete: {e}");
                FetchError::NoResult
            })?
        };

        tokio::select! {
            biased;
            _ = cancelled.cancelled() => Err(FetchError::Cancelled),
            result = execute => result.map(Arc::new),
        }
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_CONCURRENT))
    }
}

#[async_trait]
impl ImageProcessing for ImageProcessor {
    async fn decompress(&self, data: Vec<u8>) -> Result<Image, FetchError> {
        self.run(move || Ok(image::load_from_memory(&data)?)).await
    }

    async fn process(&self, data: Vec<u8>, request: &ImageRequest) -> Result<Image, FetchError> {
        let request = request.clone();
        self.run(move || {
            let decoded = image::load_from_memory(&data)?;
            geometry::edit(decoded, &request)
        })
        .await
    }
}
