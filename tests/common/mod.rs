//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use imgfetch::processing::encode_png;
use imgfetch::{
    Cache, CacheError, FetchError, Image, ImageFetcher, ImageProcessing, ImageProcessor,
    ImageRequest, Networking, TransportError,
};

/// PNG bytes of an opaque `width` x `height` image.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    encode_png(&DynamicImage::ImageRgba8(image)).unwrap()
}

/// In-memory cache recording every call.
#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub written_keys: Mutex<Vec<String>>,
    pub deleted_keys: Mutex<Vec<String>>,
    pub delete_all_calls: AtomicUsize,
}

impl MockCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, key: &str, data: Vec<u8>) {
        self.entries.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Polls until at least `count` writes landed. Write-back is
    /// fire-and-forget, so tests have to wait for it.
    pub async fn wait_for_writes(&self, count: usize) {
        wait_until(&format!("{count} cache writes"), || self.writes() >= count).await;
    }
}

#[async_trait]
impl Cache for MockCache {
    async fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn write(&self, data: &[u8], key: &str) -> Result<(), CacheError> {
        self.entries.lock().unwrap().insert(key.to_string(), data.to_vec());
        self.written_keys.lock().unwrap().push(key.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().unwrap().remove(key);
        self.deleted_keys.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), CacheError> {
        self.entries.lock().unwrap().clear();
        self.delete_all_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A cache that never has an entry and rejects every write.
#[derive(Default)]
pub struct FailingWritesCache {
    pub write_attempts: AtomicUsize,
}

impl FailingWritesCache {
    pub fn attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Cache for FailingWritesCache {
    async fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        Err(CacheError::NotFound(key.to_string()))
    }

    async fn write(&self, _data: &[u8], _key: &str) -> Result<(), CacheError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only cache",
        )))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Polls until `condition` holds, for up to a second.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Polls until a file exists at `path`. Cache writes land in the
/// background, so tests have to wait for them.
pub async fn wait_for_path(path: &Path) {
    wait_until(&format!("{}", path.display()), || path.exists()).await;
}

/// Network serving fixed bytes (or a fixed error) after a delay.
pub struct MockNetworking {
    response: Result<Vec<u8>, TransportError>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
}

impl MockNetworking {
    pub fn serving(data: Vec<u8>) -> Self {
        Self {
            response: Ok(data),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            response: Err(error),
            ..Self::serving(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Networking for MockNetworking {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.clone()
    }
}

/// Real processing with call counters.
#[derive(Default)]
pub struct CountingProcessor {
    inner: ImageProcessor,
    pub decompress_calls: AtomicUsize,
    pub process_calls: AtomicUsize,
}

#[async_trait]
impl ImageProcessing for CountingProcessor {
    async fn decompress(&self, data: Vec<u8>) -> Result<Image, FetchError> {
        self.decompress_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decompress(data).await
    }

    async fn process(&self, data: Vec<u8>, request: &ImageRequest) -> Result<Image, FetchError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.process(data, request).await
    }
}

/// Real processing, except that decoding cached bytes reports cancellation.
#[derive(Default)]
pub struct CancelledDecompress {
    inner: ImageProcessor,
}

#[async_trait]
impl ImageProcessing for CancelledDecompress {
    async fn decompress(&self, _data: Vec<u8>) -> Result<Image, FetchError> {
        Err(FetchError::Cancelled)
    }

    async fn process(&self, data: Vec<u8>, request: &ImageRequest) -> Result<Image, FetchError> {
        self.inner.process(data, request).await
    }
}

/// A fetcher wired to the given doubles.
pub struct Harness {
    pub fetcher: ImageFetcher,
    pub cache: Arc<MockCache>,
    pub network: Arc<MockNetworking>,
    pub processor: Arc<CountingProcessor>,
}

impl Harness {
    pub fn new(network: MockNetworking) -> Self {
        let cache = MockCache::new();
        let network = Arc::new(network);
        let processor = Arc::new(CountingProcessor::default());
        let fetcher = ImageFetcher::new(cache.clone(), network.clone(), processor.clone());
        Self {
            fetcher,
            cache,
            network,
            processor,
        }
    }

    pub fn serving_png(width: u32, height: u32) -> Self {
        Self::new(MockNetworking::serving(png(width, height)))
    }
}
