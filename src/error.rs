use thiserror::Error;

/// Errors produced while parsing a raw request path.
///
/// Every variant maps to a client error (HTTP 400): the request never
/// reaches the cache or the transcoder, and nothing is created on disk.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// No `<width>x<height>` segment found in the path
    #[error("no dimension segment (<width>x<height>) in path: {path}")]
    MissingDimensions { path: String },

    /// Dimension segment present but a value is zero or does not fit in u32
    #[error("invalid dimensions '{value}': width and height must be positive integers")]
    InvalidDimensions { value: String },

    /// Nothing follows the dimension segment
    #[error("no source path after dimension segment in: {path}")]
    MissingSource { path: String },

    /// The source filename has no extension
    #[error("source filename has no extension: {filename}")]
    MissingExtension { filename: String },

    /// A path segment was rejected by traversal hardening
    #[error("rejected path segment '{segment}': source paths must stay under the source root")]
    TraversalRejected { segment: String },
}

/// Errors from the pixel pipeline (decode, resize, encode).
#[derive(Debug, Clone, Error)]
pub enum TranscodeError {
    /// I/O error reading the source image
    #[error("I/O error: {0}")]
    Io(String),

    /// The source bytes could not be decoded as an image
    #[error("decode error: {0}")]
    Decode(String),

    /// The resized pixels could not be encoded in the target format
    #[error("encode error: {0}")]
    Encode(String),
}

/// Errors from a full request-to-cache-entry resolution.
///
/// Each variant carries enough context (request path, cache path, underlying
/// cause) to diagnose a failure without reproducing it. The coordinator
/// performs no implicit retries; every failure path leaves the filesystem
/// as if the attempt never happened, so a later request can retry cleanly.
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// Malformed request path (maps to HTTP 400)
    InvalidRequest(ParseError),

    /// Source image does not exist under the source root (maps to HTTP 404)
    SourceNotFound { source: String },

    /// Cache directory or file operation failed (maps to HTTP 500)
    StorageUnavailable { path: String, reason: String },

    /// The transcoder failed for any reason other than a missing source
    /// (maps to HTTP 500)
    TranscodeFailed {
        source: String,
        cause: TranscodeError,
    },
}

// Manual impls instead of `derive(Error)`: thiserror treats any field named
// `source` as the error's source() and requires it to implement `Error`,
// but here `source` is the request's source image path (a `String`).
impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::InvalidRequest(err) => write!(f, "invalid request: {err}"),
            ResolveError::SourceNotFound { source } => {
                write!(f, "source image not found: {source}")
            }
            ResolveError::StorageUnavailable { path, reason } => {
                write!(f, "cache storage unavailable at {path}: {reason}")
            }
            ResolveError::TranscodeFailed { source, cause } => {
                write!(f, "transcode failed for {source}: {cause}")
            }
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::InvalidRequest(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for ResolveError {
    fn from(err: ParseError) -> Self {
        ResolveError::InvalidRequest(err)
    }
}
