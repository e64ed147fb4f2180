//! Magic-byte content sniffing.
//!
//! Classifies a file into one of the supported formats by inspecting a short
//! prefix of its bytes. This deliberately avoids decoding any pixel data:
//! the signatures below are enough to distinguish the four supported formats,
//! and anything else is reported as inconclusive (`None`) so the caller can
//! apply its JPEG default.
//!
//! # Signatures
//!
//! | Format | Prefix |
//! |--------|--------|
//! | JPEG   | `FF D8 FF` |
//! | PNG    | `89 50 4E 47 0D 0A 1A 0A` |
//! | GIF    | `GIF87a` or `GIF89a` |
//! | WebP   | `RIFF` at offset 0 and `WEBP` at offset 8 |

use std::io;
use std::path::Path;

use super::ImageFormat;

/// Number of prefix bytes needed to classify any supported format.
///
/// The longest check is WebP, which reads through offset 11.
pub const SNIFF_PREFIX_LEN: usize = 16;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const GIF87_MAGIC: &[u8] = b"GIF87a";
const GIF89_MAGIC: &[u8] = b"GIF89a";
const RIFF_MAGIC: &[u8] = b"RIFF";
const WEBP_MAGIC: &[u8] = b"WEBP";

/// Classify a byte prefix into a format.
///
/// Returns `None` when the bytes match no known signature (including when
/// the prefix is too short to decide).
pub fn sniff_bytes(prefix: &[u8]) -> Option<ImageFormat> {
    if prefix.starts_with(JPEG_MAGIC) {
        return Some(ImageFormat::Jpeg);
    }
    if prefix.starts_with(PNG_MAGIC) {
        return Some(ImageFormat::Png);
    }
    if prefix.starts_with(GIF87_MAGIC) || prefix.starts_with(GIF89_MAGIC) {
        return Some(ImageFormat::Gif);
    }
    if prefix.len() >= 12 && prefix.starts_with(RIFF_MAGIC) && &prefix[8..12] == WEBP_MAGIC {
        return Some(ImageFormat::WebP);
    }
    None
}

/// Read a short prefix of the file at `path` and classify it.
///
/// Returns `Ok(None)` when the file exists but matches no known signature.
/// I/O errors (including a missing file) are propagated to the caller.
pub async fn sniff_path(path: &Path) -> io::Result<Option<ImageFormat>> {
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path).await?;
    let mut prefix = [0u8; SNIFF_PREFIX_LEN];
    let mut filled = 0;

    // Short files are fine; classify whatever we got.
    while filled < prefix.len() {
        let n = file.read(&mut prefix[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    Ok(sniff_bytes(&prefix[..filled]))
}

// =============================================================================
// Tests
// =============================================================================
