//! Fetches one image several times to show deduplication and caching.
//!
//! This demo shows:
//! - Building a fetcher from a `FetcherConfig`
//! - Several callers sharing one pending task
//! - A second request being served from the disk cache
//! - Cancelling a pending request
//!
//! Run with `cargo run --example fetch_image -- <url>`.

use std::time::{Duration, Instant};

use image::GenericImageView;
use imgfetch::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://www.rust-lang.org/logos/rust-logo-512x512.png".to_string());

    let config = FetcherConfig::default()
        .with_cache_dir(std::env::temp_dir().join("imgfetch-demo"))
        .with_request_timeout(Duration::from_secs(15));
    let fetcher = ImageFetcher::from_config(&config).await?;
    fetcher.delete_cache().await?;

    let request = ImageRequest::new(url.as_str())
        .size(128.0, 128.0)
        .constrain(true)
        .corner_radius(16.0);

    // --- Several callers, one download ---
    println!("=== Three concurrent callers ===");
    let started = Instant::now();
    let tasks: Vec<FetchTask> = (0..3).map(|_| fetcher.resolve(request.clone())).collect();
    println!("pending tasks: {}", fetcher.active_count());
    for (i, result) in futures::future::join_all(tasks).await.into_iter().enumerate() {
        let source = result?;
        let (w, h) = source.image().dimensions();
        println!("  caller {i}: {w}x{h}, downloaded = {}", source.is_downloaded());
    }
    println!("took {:?}", started.elapsed());

    // Write-back runs in the background.
    tokio::time::sleep(Duration::from_millis(200)).await;

    // --- Served from the cache ---
    println!("\n=== Same request again ===");
    let started = Instant::now();
    let source = fetcher.load(request.clone()).await?;
    println!("cached = {} in {:?}", source.is_cached(), started.elapsed());

    // --- Cancellation ---
    println!("\n=== Cancel before completion ===");
    let other = ImageRequest::new(url.as_str()).size(64.0, 64.0);
    let task = fetcher.resolve(other.clone());
    fetcher.cancel(other);
    match task.await {
        Err(e) if e.was_cancelled() => println!("cancelled as requested"),
        Err(e) => println!("failed: {e}"),
        Ok(_) => println!("finished before the cancel landed"),
    }

    println!("\n=== Done ===");
    Ok(())
}
