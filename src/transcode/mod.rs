//! Image transcoding: decode, resize, re-encode.
//!
//! The [`Transcoder`] trait is the seam between the cache coordinator and
//! the pixel pipeline. The coordinator only cares that a transcode either
//! produces encoded bytes or fails; tests substitute counting or blocking
//! implementations to exercise the concurrency machinery without touching
//! real pixels.
//!
//! [`ImageTranscoder`] is the production implementation, built on the
//! `image` crate. Pixel work is CPU-bound and file reads are blocking, so
//! it runs on the blocking thread pool via `spawn_blocking`.
//!
//! # Aspect ratio
//!
//! The target geometry is a bounding box, not an exact output size:
//! `scale = min(target_w / source_w, target_h / source_h)` is applied
//! uniformly to both axes, so the output fits within the requested box.
//! That is exactly the contract of `DynamicImage::resize`.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageReader};

use crate::error::TranscodeError;
use crate::format::ImageFormat;

// =============================================================================
// Quality Configuration
// =============================================================================

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Default PNG quality range lower bound.
pub const DEFAULT_PNG_QUALITY_MIN: u8 = 65;

/// Default PNG quality range upper bound.
pub const DEFAULT_PNG_QUALITY_MAX: u8 = 80;

/// Minimum allowed quality value.
pub const MIN_QUALITY: u8 = 1;

/// Maximum allowed quality value.
pub const MAX_QUALITY: u8 = 100;

/// Check whether a quality value is within the allowed range.
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_QUALITY..=MAX_QUALITY).contains(&quality)
}

/// Clamp a quality value into the allowed range.
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_QUALITY, MAX_QUALITY)
}

/// Per-format encoding quality settings.
///
/// JPEG takes a single value; PNG takes a min/max range (the range is
/// mapped onto the PNG encoder's compression level, see [`ImageTranscoder`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityConfig {
    /// JPEG quality (1-100)
    pub jpeg: u8,

    /// PNG quality range lower bound (1-100)
    pub png_min: u8,

    /// PNG quality range upper bound (1-100, >= png_min)
    pub png_max: u8,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            jpeg: DEFAULT_JPEG_QUALITY,
            png_min: DEFAULT_PNG_QUALITY_MIN,
            png_max: DEFAULT_PNG_QUALITY_MAX,
        }
    }
}

// =============================================================================
// Transcoder Trait
// =============================================================================

/// One unit of transcoding work.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    /// Absolute path of the source image
    pub source: PathBuf,

    /// Target bounding-box width in pixels
    pub target_width: u32,

    /// Target bounding-box height in pixels
    pub target_height: u32,

    /// Output format; `Unknown` is encoded as JPEG
    pub format: ImageFormat,

    /// Encoding quality settings
    pub quality: QualityConfig,
}

/// Result of a successful transcode.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    /// Encoded image bytes
    pub data: Bytes,

    /// Format actually written (never `Unknown`)
    pub format: ImageFormat,

    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,
}

/// Capability that decodes, resizes, and re-encodes a source image.
#[async_trait]
pub trait Transcoder: Send + Sync + 'static {
    /// Produce encoded output for the job, or fail without side effects.
    async fn transcode(&self, job: TranscodeJob) -> Result<TranscodeOutput, TranscodeError>;
}

// =============================================================================
// ImageTranscoder
// =============================================================================

/// Production transcoder backed by the `image` crate.
///
/// Decoding guesses the real format from content (the extension is only a
/// hint), resizing uses Lanczos3, and encoding dispatches on the resolved
/// output format.
#[derive(Debug, Clone, Default)]
pub struct ImageTranscoder {
    // Stateless; the struct leaves room for encoder settings later
}

impl ImageTranscoder {
    /// Create a new transcoder.
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl Transcoder for ImageTranscoder {
    async fn transcode(&self, job: TranscodeJob) -> Result<TranscodeOutput, TranscodeError> {
        tokio::task::spawn_blocking(move || transcode_blocking(job))
            .await
            .map_err(|e| TranscodeError::Io(format!("transcode task failed: {e}")))?
    }
}

/// Synchronous pipeline body; runs on the blocking pool.
fn transcode_blocking(job: TranscodeJob) -> Result<TranscodeOutput, TranscodeError> {
    let reader = ImageReader::open(&job.source)
        .map_err(|e| TranscodeError::Io(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| TranscodeError::Io(e.to_string()))?;

    let img = reader
        .decode()
        .map_err(|e| TranscodeError::Decode(e.to_string()))?;

    // resize() preserves aspect ratio: the output fits within the box
    let resized = img.resize(job.target_width, job.target_height, FilterType::Lanczos3);
    let (width, height) = (resized.width(), resized.height());

    let format = if job.format.is_unknown() {
        ImageFormat::Jpeg
    } else {
        job.format
    };

    let data = encode(&resized, format, &job.quality)?;

    Ok(TranscodeOutput {
        data: Bytes::from(data),
        format,
        width,
        height,
    })
}

/// Encode resized pixels in the target format.
fn encode(
    img: &DynamicImage,
    format: ImageFormat,
    quality: &QualityConfig,
) -> Result<Vec<u8>, TranscodeError> {
    let mut buf = Vec::new();

    match format {
        ImageFormat::Jpeg | ImageFormat::Unknown => {
            // JPEG has no alpha channel; flatten to RGB before encoding
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, clamp_quality(quality.jpeg));
            encoder
                .encode_image(&rgb)
                .map_err(|e| TranscodeError::Encode(e.to_string()))?;
        }
        ImageFormat::Png => {
            // The quantizer-style min/max range maps onto the encoder's
            // compression level: a low ceiling asks for the smallest output.
            let compression = if quality.png_max < DEFAULT_PNG_QUALITY_MAX {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            let encoder = PngEncoder::new_with_quality(&mut buf, compression, PngFilterType::Adaptive);
            img.write_with_encoder(encoder)
                .map_err(|e| TranscodeError::Encode(e.to_string()))?;
        }
        ImageFormat::Gif => {
            let rgba = img.to_rgba8();
            let (w, h) = (rgba.width(), rgba.height());
            let mut encoder = GifEncoder::new(&mut buf);
            encoder
                .encode(rgba.as_raw(), w, h, ExtendedColorType::Rgba8)
                .map_err(|e| TranscodeError::Encode(e.to_string()))?;
        }
        ImageFormat::WebP => {
            // The image crate's WebP encoder is lossless; quality does not apply
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::WebP)
                .map_err(|e| TranscodeError::Encode(e.to_string()))?;
        }
    }

    Ok(buf)
}

// =============================================================================
// Tests
// =============================================================================
