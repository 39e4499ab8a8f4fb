//! Image requests and the identity keys derived from them.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

/// A target size in points. Multiplied by the request scale to get pixels.
#[derive(Debug, Clone, Copy)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl PartialEq for Size {
    fn eq(&self, other: &Self) -> bool {
        bits(self.width) == bits(other.width) && bits(self.height) == bits(other.height)
    }
}

impl Eq for Size {}

impl Hash for Size {
    fn hash<H: Hasher>(&self, state: &mut H) {
        bits(self.width).hash(state);
        bits(self.height).hash(state);
    }
}

/// Scheduling hint. Not part of a request's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// The set of parameters describing one rendered image.
///
/// Two requests with the same field values always derive the same
/// [`key`](ImageRequest::key), so they share one pipeline and one cache entry.
///
/// # Example
/// ```rust
/// use imgfetch::ImageRequest;
///
/// let request = ImageRequest::new("https://example.com/a.png")
///     .size(100.0, 100.0)
///     .constrain(true)
///     .corner_radius(8.0);
/// assert_eq!(request.key().len(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub(crate) url: String,
    pub(crate) size: Option<Size>,
    pub(crate) constrain: bool,
    pub(crate) corner_radius: f32,
    pub(crate) scale: f32,
    pub(crate) priority: Option<Priority>,
}

impl ImageRequest {
    /// A request for the image at `url`, unmodified, at scale 1.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size: None,
            constrain: false,
            corner_radius: 0.0,
            scale: 1.0,
            priority: None,
        }
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        assert!(
            width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0,
            "Size must have positive, finite dimensions"
        );
        self.size = Some(Size::new(width, height));
        self
    }

    /// Fit inside [`size`](ImageRequest::size) keeping the original aspect ratio.
    pub fn constrain(mut self, constrain: bool) -> Self {
        self.constrain = constrain;
        self
    }

    pub fn corner_radius(mut self, radius: f32) -> Self {
        assert!(
            radius.is_finite() && radius >= 0.0,
            "Corner radius must be a non-negative number"
        );
        self.corner_radius = radius;
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        assert!(
            scale.is_finite() && scale > 0.0,
            "Scale must be a positive number"
        );
        self.scale = scale;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target_size(&self) -> Option<Size> {
        self.size
    }

    pub fn is_constrained(&self) -> bool {
        self.constrain
    }

    pub fn radius(&self) -> f32 {
        self.corner_radius
    }

    pub fn display_scale(&self) -> f32 {
        self.scale
    }

    pub fn priority_hint(&self) -> Option<Priority> {
        self.priority
    }

    /// The identity key of this request. See [`derive_key`].
    pub fn key(&self) -> String {
        derive_key(self)
    }
}

impl PartialEq for ImageRequest {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.size == other.size
            && self.constrain == other.constrain
            && bits(self.corner_radius) == bits(other.corner_radius)
            && bits(self.scale) == bits(other.scale)
            && self.priority == other.priority
    }
}

impl Eq for ImageRequest {}

impl Hash for ImageRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
        self.size.hash(state);
        self.constrain.hash(state);
        bits(self.corner_radius).hash(state);
        bits(self.scale).hash(state);
        self.priority.hash(state);
    }
}

impl From<&str> for ImageRequest {
    fn from(url: &str) -> Self {
        ImageRequest::new(url)
    }
}

impl From<String> for ImageRequest {
    fn from(url: String) -> Self {
        ImageRequest::new(url)
    }
}

impl From<&ImageRequest> for ImageRequest {
    fn from(request: &ImageRequest) -> Self {
        request.clone()
    }
}

/// Derives the identity key of a request.
///
/// The key is the hex SHA-256 of a canonical rendering of every field that
/// changes the produced bitmap. The priority hint is left out. The result is
/// stable across runs and is used as the persistent cache key.
pub fn derive_key(request: &ImageRequest) -> String {
    let mut canonical = String::with_capacity(request.url.len() + 96);
    // Writing into a String cannot fail.
    let _ = writeln!(canonical, "url={}", request.url);
    match request.size {
        Some(size) => {
            let _ = writeln!(
                canonical,
                "size={:?}x{:?}",
                normalized(size.width),
                normalized(size.height)
            );
        }
        None => canonical.push_str("size=none\n"),
    }
    let _ = writeln!(canonical, "constrain={}", request.constrain);
    let _ = writeln!(canonical, "corner_radius={:?}", normalized(request.corner_radius));
    let _ = write!(canonical, "scale={:?}", normalized(request.scale));

    hex::encode(Sha256::digest(canonical.as_bytes()))
}

fn normalized(value: f32) -> f32 {
    // Folds -0.0 into 0.0.
    value + 0.0
}

fn bits(value: f32) -> u32 {
    normalized(value).to_bits()
}
