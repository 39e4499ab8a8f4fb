//! The unit of work registered for one pending key.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::FetchResult;
use super::request::ImageRequest;

/// A handle to one in-flight image pipeline.
///
/// Every caller that resolves the same request while it is pending gets a
/// clone of the same `FetchTask`; awaiting any clone yields the one shared
/// result.
///
/// Cancellation is shared-fate: [`cancel`](FetchTask::cancel) stops the
/// pipeline itself, so every clone observes
/// [`FetchError::Cancelled`](crate::FetchError::Cancelled).
#[derive(Clone)]
pub struct FetchTask {
    id: Uuid,
    key: String,
    request: ImageRequest,
    token: CancellationToken,
    result: Shared<BoxFuture<'static, FetchResult>>,
}

impl FetchTask {
    pub(crate) fn new(
        key: String,
        request: ImageRequest,
        token: CancellationToken,
        id: Uuid,
        result: BoxFuture<'static, FetchResult>,
    ) -> Self {
        Self {
            id,
            key,
            request,
            token,
            result: result.shared(),
        }
    }

    /// Unique per task; a later task for the same key gets a new id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn request(&self) -> &ImageRequest {
        &self.request
    }

    /// Signals the pipeline to stop at its next checkpoint.
    ///
    /// The registry entry is dropped once the pipeline observes the signal.
    /// Use [`ImageFetcher::cancel`](crate::ImageFetcher::cancel) to drop it
    /// immediately.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The result if the pipeline has already finished.
    pub fn peek_result(&self) -> Option<FetchResult> {
        self.result.peek().cloned()
    }
}

impl Future for FetchTask {
    type Output = FetchResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.result).poll(cx)
    }
}

impl fmt::Debug for FetchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTask")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("url", &self.request.url)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl PartialEq for FetchTask {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FetchTask {}
