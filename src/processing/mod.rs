//! Decoding and geometric processing of fetched image bytes.

pub mod geometry;
pub mod processor;

use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};

use crate::core::error::FetchError;
use crate::core::request::ImageRequest;
use crate::core::source::Image;

pub use processor::ImageProcessor;

/// Turns bytes into bitmaps.
#[async_trait]
pub trait ImageProcessing: Send + Sync {
    /// Decodes bytes exactly as stored, without any geometric change.
    async fn decompress(&self, data: Vec<u8>) -> Result<Image, FetchError>;

    /// Decodes bytes and applies the request's size, aspect, corner and
    /// scale settings.
    async fn process(&self, data: Vec<u8>, request: &ImageRequest) -> Result<Image, FetchError>;
}

/// Encodes an image as PNG, the format written back to the cache.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_encode_png_decodes_back() {
        let image = DynamicImage::new_rgba8(7, 5);
        let bytes = encode_png(&image).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (7, 5));
    }
}
