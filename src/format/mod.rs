//! Image format classification.
//!
//! Formats are identified in two stages:
//!
//! 1. **Extension hint** at parse time: the request filename's extension maps
//!    to a format via a fixed, case-insensitive table. Unrecognized extensions
//!    map to [`ImageFormat::Unknown`].
//! 2. **Content sniffing** ([`sniff`]) when the hint is `Unknown`: the first
//!    few bytes of the file are classified by magic bytes, without decoding
//!    any pixels.

pub mod sniff;

pub use sniff::{sniff_bytes, sniff_path, SNIFF_PREFIX_LEN};

// =============================================================================
// ImageFormat
// =============================================================================

/// Supported output image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// JPEG (jpg/jpeg extensions)
    Jpeg,

    /// PNG
    Png,

    /// GIF
    Gif,

    /// WebP
    WebP,

    /// Extension did not identify the format; resolved later by sniffing
    Unknown,
}

impl ImageFormat {
    /// Map a filename extension (without the dot) to a format.
    ///
    /// Matching is case-insensitive. Anything outside the fixed table maps
    /// to [`ImageFormat::Unknown`].
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "gif" => ImageFormat::Gif,
            "webp" => ImageFormat::WebP,
            _ => ImageFormat::Unknown,
        }
    }

    /// HTTP Content-Type for the format.
    ///
    /// `Unknown` falls back to JPEG, matching the transcoder's default
    /// when sniffing is inconclusive.
    pub const fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg | ImageFormat::Unknown => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Short human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::Gif => "GIF",
            ImageFormat::WebP => "WebP",
            ImageFormat::Unknown => "unknown",
        }
    }

    /// Whether the format still needs content sniffing.
    pub const fn is_unknown(&self) -> bool {
        matches!(self, ImageFormat::Unknown)
    }
}

// =============================================================================
// Tests
// =============================================================================
