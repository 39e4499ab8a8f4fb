//! The fetch orchestrator.
//!
//! [`ImageFetcher`] guarantees that at most one pipeline runs per request
//! key. A pipeline reads the cache, decompresses a hit (falling back to the
//! network if the entry is unreadable), otherwise downloads and processes
//! the image and writes it back to the cache. Callers resolving a key that
//! is already pending receive a clone of the pending [`FetchTask`].

use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::{FetchError, FetchResult};
use super::registry::TaskRegistry;
use super::request::ImageRequest;
use super::source::{Image, ImageSource};
use super::task::FetchTask;
use crate::cache::{Cache, CacheError};
use crate::net::Networking;
use crate::processing::{ImageProcessing, encode_png};

/// Resolves image requests through a cache, the network and an image
/// processor, sharing one pipeline between all callers of the same request.
///
/// Cheap to clone; clones share the same registry and collaborators.
///
/// All methods that start work spawn onto the ambient tokio runtime and
/// panic if called outside one.
#[derive(Clone)]
pub struct ImageFetcher {
    cache: Arc<dyn Cache>,
    networking: Arc<dyn Networking>,
    processor: Arc<dyn ImageProcessing>,
    registry: Arc<TaskRegistry>,
}

impl ImageFetcher {
    pub fn new(
        cache: Arc<dyn Cache>,
        networking: Arc<dyn Networking>,
        processor: Arc<dyn ImageProcessing>,
    ) -> Self {
        Self {
            cache,
            networking,
            processor,
            registry: Arc::new(TaskRegistry::new()),
        }
    }

    /// Builds a fetcher on a [`DiskCache`](crate::cache::DiskCache),
    /// [`HttpNetworking`](crate::net::HttpNetworking) and
    /// [`ImageProcessor`](crate::processing::ImageProcessor) configured from
    /// `config`.
    #[cfg(feature = "http")]
    pub async fn from_config(config: &crate::config::FetcherConfig) -> Result<Self, crate::Error> {
        let cache = crate::cache::DiskCache::open(config.cache_dir.clone()).await?;
        let networking = crate::net::HttpNetworking::new(config.request_timeout(), &config.user_agent)?;
        let processor = crate::processing::ImageProcessor::new(config.max_concurrent_processing);
        Ok(Self::new(Arc::new(cache), Arc::new(networking), Arc::new(processor)))
    }

    /// Returns the task producing the image for `request`.
    ///
    /// If a task for the same key is pending it is returned as is, and no
    /// new cache read or download starts. Otherwise a new task is
    /// registered and started.
    pub fn resolve(&self, request: impl Into<ImageRequest>) -> FetchTask {
        let request = request.into();
        let key = request.key();

        let mut launch = None;
        let (task, created) = self.registry.get_or_insert_with(&key, || {
            let (task, pending) = self.prepare(key.clone(), request.clone());
            launch = Some(pending);
            task
        });

        // Started only once the registry lock is released: a runtime that is
        // shutting down drops the pipeline inside `spawn`, and its drop guard
        // needs the lock.
        if let Some(launch) = launch {
            launch.start();
        }

        if created {
            log::debug!("started image task {} for {}", task.id(), request.url);
        } else {
            log::debug!("joined pending image task {} for {}", task.id(), request.url);
        }
        task
    }

    /// Resolves `request` and waits for the image.
    pub async fn load(&self, request: impl Into<ImageRequest>) -> FetchResult {
        self.resolve(request).await
    }

    /// Cancels the pending task for `request`, if there is one.
    ///
    /// The task is unregistered before this returns, so a following
    /// [`resolve`](ImageFetcher::resolve) starts fresh work. Every caller
    /// waiting on the cancelled task receives [`FetchError::Cancelled`].
    pub fn cancel(&self, request: impl Into<ImageRequest>) {
        let key = request.into().key();
        if let Some(task) = self.registry.remove(&key) {
            log::debug!("cancelling image task {} for {}", task.id(), task.request().url);
            task.cancel();
        }
    }

    /// The pending task for `request`, if any.
    pub fn peek(&self, request: impl Into<ImageRequest>) -> Option<FetchTask> {
        self.registry.get(&request.into().key())
    }

    /// Number of pending tasks.
    pub fn active_count(&self) -> usize {
        self.registry.count()
    }

    /// Reads `request` from the cache only.
    ///
    /// Returns `None` on a miss or an unreadable entry. Never touches the
    /// network and never registers a task.
    pub async fn load_cached(&self, request: impl Into<ImageRequest>) -> Option<Image> {
        let key = request.into().key();
        let data = self.cache.read(&key).await.ok()?;
        match self.processor.decompress(data).await {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("unreadable cache entry {key}: {e}");
                None
            }
        }
    }

    /// Stores `image` in the cache under the key of `request`.
    pub async fn store(&self, image: &Image, request: impl Into<ImageRequest>) -> Result<(), CacheError> {
        let key = request.into().key();
        let image = Arc::clone(image);
        let data = tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(|e| CacheError::Encode(e.to_string()))?
            .map_err(|e| CacheError::Encode(e.to_string()))?;
        self.cache.write(&data, &key).await
    }

    /// Removes the cached image for `request`.
    pub async fn delete(&self, request: impl Into<ImageRequest>) -> Result<(), CacheError> {
        self.cache.delete(&request.into().key()).await
    }

    /// Removes every cached image.
    pub async fn delete_cache(&self) -> Result<(), CacheError> {
        self.cache.delete_all().await
    }

    /// Builds the task for `key` and the pipeline behind it, without
    /// starting anything. Called with the registry locked.
    fn prepare(&self, key: String, request: ImageRequest) -> (FetchTask, Launch) {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        let (handle_tx, handle_rx) = oneshot::channel::<JoinHandle<FetchResult>>();

        let launch = Launch {
            pipeline: Pipeline {
                cache: Arc::clone(&self.cache),
                networking: Arc::clone(&self.networking),
                processor: Arc::clone(&self.processor),
                key: key.clone(),
                request: request.clone(),
                token: token.clone(),
            },
            deregister: Deregister {
                registry: Arc::clone(&self.registry),
                key: key.clone(),
                id,
            },
            handle_tx,
        };

        let result = async move {
            let handle = handle_rx.await.map_err(|_| {
                log::error!("image task {id} was never started");
                FetchError::NoResult
            })?;
            match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(FetchError::Cancelled),
                Err(e) => {
                    log::error!("image task {id} ended without a result: {e}");
                    Err(FetchError::NoResult)
                }
            }
        }
        .boxed();

        (FetchTask::new(key, request, token, id, result), launch)
    }
}

/// A registered pipeline that has not been spawned yet.
///
/// Dropping it unstarted unregisters the task, and waiters get
/// [`FetchError::NoResult`].
struct Launch {
    pipeline: Pipeline,
    deregister: Deregister,
    handle_tx: oneshot::Sender<JoinHandle<FetchResult>>,
}

impl Launch {
    /// Spawns the pipeline. Must not be called with the registry locked.
    fn start(self) {
        let Launch {
            pipeline,
            deregister,
            handle_tx,
        } = self;

        let handle = tokio::spawn(async move {
            let _deregister = deregister;
            pipeline.run().await
        });
        let _ = handle_tx.send(handle);
    }
}

/// Unregisters a task when its pipeline ends, however it ends.
struct Deregister {
    registry: Arc<TaskRegistry>,
    key: String,
    id: Uuid,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        self.registry.remove_task(&self.key, self.id);
    }
}

/// Everything one task needs, moved onto the runtime.
struct Pipeline {
    cache: Arc<dyn Cache>,
    networking: Arc<dyn Networking>,
    processor: Arc<dyn ImageProcessing>,
    key: String,
    request: ImageRequest,
    token: CancellationToken,
}

impl Pipeline {
    async fn run(self) -> FetchResult {
        let token = self.token.clone();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::debug!("image task for {} cancelled", self.request.url);
                Err(FetchError::Cancelled)
            }
            result = self.execute() => result,
        }
    }

    async fn execute(&self) -> FetchResult {
        if let Some(image) = self.from_cache().await? {
            return Ok(ImageSource::Cached(image));
        }
        self.download().await.map(ImageSource::Downloaded)
    }

    /// A cache entry that is missing or cannot be decoded is a miss.
    async fn from_cache(&self) -> Result<Option<Image>, FetchError> {
        let data = match self.cache.read(&self.key).await {
            Ok(data) => data,
            Err(e) => {
                log::debug!("cache miss for {}: {e}", self.request.url);
                return Ok(None);
            }
        };
        self.checkpoint()?;

        match self.processor.decompress(data).await {
            Ok(image) => Ok(Some(image)),
            Err(FetchError::Cancelled) => Err(FetchError::Cancelled),
            Err(e) => {
                log::warn!(
                    "discarding unreadable cache entry for {}: {e}",
                    self.request.url
                );
                Ok(None)
            }
        }
    }

    async fn download(&self) -> Result<Image, FetchError> {
        self.checkpoint()?;
        let data = self.networking.fetch(&self.request.url).await?;
        self.checkpoint()?;
        let image = self.processor.process(data, &self.request).await?;
        self.checkpoint()?;
        self.write_back(Arc::clone(&image));
        Ok(image)
    }

    fn checkpoint(&self) -> Result<(), FetchError> {
        if self.token.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Persists a downloaded image in the background. Failures are logged
    /// and never reach the caller, who already has the image.
    fn write_back(&self, image: Image) {
        let cache = Arc::clone(&self.cache);
        let key = self.key.clone();
        let url = self.request.url.clone();

        tokio::spawn(async move {
            let data = match tokio::task::spawn_blocking(move || encode_png(&image)).await {
                Ok(Ok(data)) => data,
                Ok(Err(e)) => {
                    log::warn!("could not encode {url} for the cache: {e}");
                    return;
                }
                Err(e) => {
                    log::warn!("cache encoding for {url} did not finish: {e}");
                    return;
                }
            };
            if let Err(e) = cache.write(&data, &key).await {
                log::warn!("could not cache {url}: {e}");
            }
        });
    }
}
