use thiserror::Error;

use crate::net::TransportError;

/// The outcome type shared by every waiter of a [`FetchTask`](crate::FetchTask).
pub type FetchResult = Result<crate::ImageSource, FetchError>;

/// An error that ends an image fetch.
///
/// Cloneable because one failure is handed to every caller sharing the
/// same pending task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("image fetch was cancelled")]
    Cancelled,

    #[error("image data could not be decoded: {0}")]
    CannotDecode(String),

    #[error("image task finished without producing a result")]
    NoResult,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FetchError {
    /// Whether the fetch ended because it was cancelled.
    pub fn was_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<image::ImageError> for FetchError {
    fn from(err: image::ImageError) -> Self {
        FetchError::CannotDecode(err.to_string())
    }
}
