//! Resize, aspect-fit and corner rounding.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};

use crate::core::error::FetchError;
use crate::core::request::{ImageRequest, Size};

/// Largest edge, in pixels, a processed image may have.
pub const MAX_DIMENSION: u32 = 16_384;

/// Largest size with the aspect ratio of `original` that fits inside `max`.
///
/// Never upscales.
pub fn fit_within(max: Size, original: (u32, u32)) -> Size {
    let (width, height) = (original.0 as f32, original.1 as f32);
    if width <= 0.0 || height <= 0.0 {
        return max;
    }
    let ratio = (max.width / width).min(max.height / height).min(1.0);
    Size::new(width * ratio, height * ratio)
}

/// Applies `request` to a decoded image.
///
/// Images with neither a target size nor a corner radius pass through
/// untouched. Without a target size the original dimensions are the target.
/// The target (after aspect fitting) and the corner radius are both
/// multiplied by the scale.
pub fn edit(image: DynamicImage, request: &ImageRequest) -> Result<DynamicImage, FetchError> {
    if request.size.is_none() && request.corner_radius <= 0.0 {
        return Ok(image);
    }

    let original = image.dimensions();
    let size = request
        .size
        .unwrap_or_else(|| Size::new(original.0 as f32, original.1 as f32));
    let target = if request.constrain {
        fit_within(size, original)
    } else {
        size
    };
    let (width, height) = (
        to_pixels(target.width * request.scale)?,
        to_pixels(target.height * request.scale)?,
    );

    let resized = if (width, height) == original {
        image
    } else {
        image.resize_exact(width, height, FilterType::Triangle)
    };

    if request.corner_radius > 0.0 {
        let rounded = round_corners(resized.into_rgba8(), request.corner_radius * request.scale);
        Ok(DynamicImage::ImageRgba8(rounded))
    } else {
        Ok(resized)
    }
}

fn to_pixels(points: f32) -> Result<u32, FetchError> {
    if !points.is_finite() || points > MAX_DIMENSION as f32 {
        return Err(FetchError::CannotDecode(format!(
            "target dimension {points} is outside 1..={MAX_DIMENSION}"
        )));
    }
    Ok((points.round() as u32).max(1))
}

/// Clears the alpha of every pixel outside a rounded rectangle.
///
/// The radius is clamped to half the shorter edge.
pub fn round_corners(mut image: RgbaImage, radius: f32) -> RgbaImage {
    let (width, height) = (image.width() as f32, image.height() as f32);
    let radius = radius.min(width / 2.0).min(height / 2.0);
    if radius <= 0.0 {
        return image;
    }

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let cx = x as f32 + 0.5;
        let cy = y as f32 + 0.5;
        let dx = corner_offset(cx, width, radius);
        let dy = corner_offset(cy, height, radius);
        if dx > 0.0 && dy > 0.0 && dx * dx + dy * dy > radius * radius {
            pixel[3] = 0;
        }
    }
    image
}

/// Distance past the inner edge of a corner arc along one axis, or 0.
fn corner_offset(position: f32, extent: f32, radius: f32) -> f32 {
    if position < radius {
        radius - position
    } else if position > extent - radius {
        position - (extent - radius)
    } else {
        0.0
    }
}
