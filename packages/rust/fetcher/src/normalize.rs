//! Image normalization: flatten alpha, cap the longer side, re-encode as JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use watchshots_shared::{CollectConfig, Result, WatchshotsError};

/// Size and encoding policy applied to every downloaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePolicy {
    /// Longer side is downscaled to exactly this when exceeded.
    pub max_side: u32,
    /// Images with both sides below this (after downscaling) are rejected.
    pub min_side: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            max_side: 1280,
            min_side: 640,
            jpeg_quality: 95,
        }
    }
}

impl From<&CollectConfig> for ImagePolicy {
    fn from(config: &CollectConfig) -> Self {
        Self {
            max_side: config.max_side,
            min_side: config.min_side,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

/// A normalized, JPEG-encoded image ready to be written.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Encoded JPEG bytes.
    pub jpeg: Vec<u8>,
    /// Final width in pixels.
    pub width: u32,
    /// Final height in pixels.
    pub height: u32,
}

/// Composite images with an alpha channel onto opaque white; convert everything else to RGB8.
pub fn flatten_alpha(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let px = rgba.get_pixel(x, y);
        let alpha = u32::from(px[3]);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(px[0]), blend(px[1]), blend(px[2])])
    })
}

/// Dimensions after capping the longer side at `max_side`, preserving aspect ratio.
///
/// The longer side lands on exactly `max_side`; the shorter side is rounded
/// and never drops below 1.
pub fn target_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    if width <= max_side && height <= max_side {
        return (width, height);
    }

    let scale = |short: u32, long: u32| -> u32 {
        let scaled = (u64::from(short) * u64::from(max_side) + u64::from(long) / 2) / u64::from(long);
        scaled.max(1) as u32
    };

    if width >= height {
        (max_side, scale(height, width))
    } else {
        (scale(width, height), max_side)
    }
}

/// Decode `bytes`, normalize per `policy`, and encode as JPEG.
///
/// `url` is only used for error context.
pub fn normalize(bytes: &[u8], url: &str, policy: &ImagePolicy) -> Result<NormalizedImage> {
    let decoded = image::load_from_memory(bytes).map_err(|e| WatchshotsError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let mut rgb = flatten_alpha(&decoded);

    let (width, height) = target_dimensions(rgb.width(), rgb.height(), policy.max_side);
    if (width, height) != rgb.dimensions() {
        rgb = image::imageops::resize(&rgb, width, height, FilterType::Lanczos3);
    }

    if width < policy.min_side && height < policy.min_side {
        return Err(WatchshotsError::SizeRejected {
            url: url.to_string(),
            width,
            height,
        });
    }

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, policy.jpeg_quality);
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(encoder)
        .map_err(|e| WatchshotsError::Encode {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    Ok(NormalizedImage {
        jpeg,
        width,
        height,
    })
}
