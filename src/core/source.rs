use std::sync::Arc;

/// A decoded bitmap, shared between every caller of the same task.
pub type Image = Arc<image::DynamicImage>;

/// Where a produced image came from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Decompressed from bytes previously persisted in the cache.
    Cached(Image),
    /// Fetched from the network and processed for this request.
    Downloaded(Image),
}

impl ImageSource {
    pub fn image(&self) -> &Image {
        match self {
            ImageSource::Cached(image) | ImageSource::Downloaded(image) => image,
        }
    }

    pub fn into_image(self) -> Image {
        match self {
            ImageSource::Cached(image) | ImageSource::Downloaded(image) => image,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ImageSource::Cached(_))
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self, ImageSource::Downloaded(_))
    }
}
