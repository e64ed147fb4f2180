//! Request path parsing.
//!
//! Turns a raw request path into a canonical [`ResizeRequest`].
//!
//! # Grammar
//!
//! ```text
//! /<width>x<height>/<source path ending in filename.ext>
//! ```
//!
//! The first segment of the form `<digits>x<digits>` marks the target
//! geometry; everything after it is the source path, which may contain
//! subdirectories and must end in a filename with an extension. Leading
//! segments before the dimension segment are ignored, so the parser works
//! unchanged when the service is mounted under a URL prefix.
//!
//! # Traversal hardening
//!
//! The source path is concatenated into filesystem paths under the source
//! and cache roots, so it is validated here, before anything else sees it:
//! `..` and `.` segments, empty segments, and backslashes are all rejected.
//! The path is always interpreted relative to the configured source root.

use std::path::{Path, PathBuf};

use crate::error::ParseError;
use crate::format::ImageFormat;

// =============================================================================
// ResizeRequest
// =============================================================================

/// A canonical, validated resize request.
///
/// Immutable once parsed; exists only for the duration of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    /// Source path relative to the source root, slash-separated,
    /// subdirectories preserved (e.g. `photos/dog.jpg`)
    pub source_path: String,

    /// Target width in pixels (> 0)
    pub width: u32,

    /// Target height in pixels (> 0)
    pub height: u32,

    /// Format implied by the filename extension; `Unknown` means the
    /// coordinator will sniff the source content
    pub format_hint: ImageFormat,
}

impl ResizeRequest {
    /// Absolute path of the source image under `source_root`.
    pub fn source_file(&self, source_root: &Path) -> PathBuf {
        source_root.join(&self.source_path)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a raw request path into a [`ResizeRequest`].
///
/// # Errors
///
/// Returns a [`ParseError`] when the path has no dimension segment, the
/// dimensions are zero or overflow `u32`, the source path is empty or has
/// no extension, or a segment fails traversal validation. No error variant
/// causes anything to be created on disk.
pub fn parse_path(raw: &str) -> Result<ResizeRequest, ParseError> {
    // Backslashes never appear in well-formed requests and could smuggle
    // separators past the per-segment checks on some platforms.
    if raw.contains('\\') {
        return Err(ParseError::TraversalRejected {
            segment: "\\".to_string(),
        });
    }

    let segments: Vec<&str> = raw.split('/').collect();

    // Locate the dimension segment. A segment that has the <digits>x<digits>
    // shape is *the* dimension segment: values that fail to parse (zero,
    // overflow) reject the request rather than being skipped.
    let mut dims: Option<(usize, u32, u32)> = None;
    for (i, segment) in segments.iter().enumerate() {
        if has_dimension_shape(segment) {
            let (width, height) = parse_dimensions(segment)?;
            dims = Some((i, width, height));
            break;
        }
    }

    let (dim_index, width, height) = dims.ok_or_else(|| ParseError::MissingDimensions {
        path: raw.to_string(),
    })?;

    let source_segments = &segments[dim_index + 1..];
    if source_segments.is_empty() || source_segments.iter().all(|s| s.is_empty()) {
        return Err(ParseError::MissingSource {
            path: raw.to_string(),
        });
    }

    for segment in source_segments {
        validate_segment(segment)?;
    }

    // Last segment is the filename; it must carry an extension.
    let filename = source_segments[source_segments.len() - 1];
    let extension = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
        _ => {
            return Err(ParseError::MissingExtension {
                filename: filename.to_string(),
            })
        }
    };

    Ok(ResizeRequest {
        source_path: source_segments.join("/"),
        width,
        height,
        format_hint: ImageFormat::from_extension(extension),
    })
}

/// Whether a segment looks like `<digits>x<digits>` (both sides non-empty).
fn has_dimension_shape(segment: &str) -> bool {
    match segment.split_once('x') {
        Some((w, h)) => {
            !w.is_empty()
                && !h.is_empty()
                && w.bytes().all(|b| b.is_ascii_digit())
                && h.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Parse a dimension segment, rejecting zero and overflowing values.
fn parse_dimensions(segment: &str) -> Result<(u32, u32), ParseError> {
    let invalid = || ParseError::InvalidDimensions {
        value: segment.to_string(),
    };

    let (w, h) = segment.split_once('x').ok_or_else(invalid)?;
    let width: u32 = w.parse().map_err(|_| invalid())?;
    let height: u32 = h.parse().map_err(|_| invalid())?;

    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok((width, height))
}

/// Reject segments that could escape the source root or alias other paths.
fn validate_segment(segment: &str) -> Result<(), ParseError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(ParseError::TraversalRejected {
            segment: segment.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
