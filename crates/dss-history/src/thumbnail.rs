//! Thumbnail pipeline: decode, shrink to a maximum width, re-encode as JPEG.
//!
//! Image work is CPU-bound, so the async entry point runs it on the blocking pool.

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;

use crate::error::ThumbnailError;

pub const DEFAULT_MAX_WIDTH: u32 = 150;
pub const DEFAULT_QUALITY: u8 = 70;

/// Thumbnail size and compression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailOptions {
    pub max_width: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
        }
    }
}

/// An encoded JPEG thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl Thumbnail {
    /// Encode as a `data:image/jpeg;base64,` URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.jpeg)
        )
    }
}

/// Target dimensions: scaled uniformly to `max_width`, never enlarged.
pub fn thumbnail_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    let max_width = max_width.max(1);
    if width <= max_width {
        return (width, height);
    }
    let scale = f64::from(max_width) / f64::from(width);
    let scaled_height = (f64::from(height) * scale).round().max(1.0) as u32;
    (max_width, scaled_height)
}

/// Decode `bytes` (any enabled format) and produce a JPEG thumbnail.
pub fn render_thumbnail(
    bytes: &[u8],
    options: ThumbnailOptions,
) -> Result<Thumbnail, ThumbnailError> {
    let img = image::load_from_memory(bytes).map_err(ThumbnailError::Decode)?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ThumbnailError::Empty);
    }

    let (target_width, target_height) = thumbnail_size(width, height, options.max_width);
    let resized = if (target_width, target_height) == (width, height) {
        img
    } else {
        img.resize_exact(target_width, target_height, FilterType::Triangle)
    };

    // JPEG has no alpha channel
    let rgb = resized.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, options.quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(ThumbnailError::Encode)?;

    tracing::debug!(
        "Thumbnail {}x{} -> {}x{}, {} -> {} bytes",
        width,
        height,
        target_width,
        target_height,
        bytes.len(),
        jpeg.len()
    );

    Ok(Thumbnail {
        width: target_width,
        height: target_height,
        jpeg,
    })
}

/// Async wrapper around [`render_thumbnail`]; completes once the image has been re-encoded.
pub async fn create_thumbnail(
    image: Vec<u8>,
    options: ThumbnailOptions,
) -> Result<Thumbnail, ThumbnailError> {
    tokio::task::spawn_blocking(move || render_thumbnail(&image, options)).await?
}
