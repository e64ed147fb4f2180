//! Configuration management for imgserve.
//!
//! Configuration comes from command-line arguments via clap, with every
//! option also settable through an `IMGSERVE_`-prefixed environment
//! variable, and sensible defaults for everything except the directories
//! you almost certainly want to pick yourself.
//!
//! # Environment Variables
//!
//! - `IMGSERVE_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMGSERVE_PORT` - Server port (default: 3000)
//! - `IMGSERVE_SOURCE_DIR` - Source image directory (default: /var/www/images)
//! - `IMGSERVE_CACHE_DIR` - Cache directory (default: /var/cache/imgserve)
//! - `IMGSERVE_JPEG_QUALITY` - JPEG quality (default: 85)
//! - `IMGSERVE_PNG_QUALITY_MIN` - PNG quality range lower bound (default: 65)
//! - `IMGSERVE_PNG_QUALITY_MAX` - PNG quality range upper bound (default: 80)
//! - `IMGSERVE_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 86400)
//! - `IMGSERVE_CHECK_SOURCE_MTIME` - Regenerate when source is newer (default: true)
//! - `IMGSERVE_ENABLE_LOCKING` - Per-key generation locking (default: true)

use clap::Parser;
use std::path::PathBuf;

use crate::transcode::{
    is_valid_quality, QualityConfig, DEFAULT_JPEG_QUALITY, DEFAULT_PNG_QUALITY_MAX,
    DEFAULT_PNG_QUALITY_MIN,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default source image directory.
pub const DEFAULT_SOURCE_DIR: &str = "/var/www/images";

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/imgserve";

/// Default HTTP cache max-age in seconds (1 day).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 86_400;

// =============================================================================
// CLI Arguments
// =============================================================================

/// imgserve - On-demand image resizing server with a filesystem cache.
///
/// Resizes and re-encodes images from a source directory on request and
/// caches the renditions on disk, so repeated requests for the same size
/// are served straight from the cache.
#[derive(Parser, Debug, Clone)]
#[command(name = "imgserve")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMGSERVE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMGSERVE_PORT")]
    pub port: u16,

    // =========================================================================
    // Directory Configuration
    // =========================================================================
    /// Directory containing source images.
    #[arg(long, default_value = DEFAULT_SOURCE_DIR, env = "IMGSERVE_SOURCE_DIR")]
    pub source_dir: PathBuf,

    /// Directory for storing resized images.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "IMGSERVE_CACHE_DIR")]
    pub cache_dir: PathBuf,

    // =========================================================================
    // Quality Configuration
    // =========================================================================
    /// JPEG compression quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "IMGSERVE_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// PNG quality range lower bound (1-100).
    #[arg(long, default_value_t = DEFAULT_PNG_QUALITY_MIN, env = "IMGSERVE_PNG_QUALITY_MIN")]
    pub png_quality_min: u8,

    /// PNG quality range upper bound (1-100, must be >= the lower bound).
    #[arg(long, default_value_t = DEFAULT_PNG_QUALITY_MAX, env = "IMGSERVE_PNG_QUALITY_MAX")]
    pub png_quality_max: u8,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "IMGSERVE_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Regenerate a cached rendition when the source file is newer.
    #[arg(long, default_value_t = true, env = "IMGSERVE_CHECK_SOURCE_MTIME",
          action = clap::ArgAction::Set)]
    pub check_source_mtime: bool,

    /// Serialize generation per cache key.
    ///
    /// Disabling removes the single-flight guarantee (concurrent identical
    /// requests may each transcode); published files stay atomic either way.
    #[arg(long, default_value_t = true, env = "IMGSERVE_ENABLE_LOCKING",
          action = clap::ArgAction::Set)]
    pub enable_locking: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "IMGSERVE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.source_dir.as_os_str().is_empty() {
            return Err("source_dir is required. Set --source-dir or IMGSERVE_SOURCE_DIR".to_string());
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err("cache_dir is required. Set --cache-dir or IMGSERVE_CACHE_DIR".to_string());
        }
        if self.source_dir == self.cache_dir {
            return Err("source_dir and cache_dir must be different directories".to_string());
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }
        if !is_valid_quality(self.png_quality_min) || !is_valid_quality(self.png_quality_max) {
            return Err("png quality bounds must be between 1 and 100".to_string());
        }
        if self.png_quality_min > self.png_quality_max {
            return Err("png_quality_min must be <= png_quality_max".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Quality settings for the transcoder.
    pub fn quality(&self) -> QualityConfig {
        QualityConfig {
            jpeg: self.jpeg_quality,
            png_min: self.png_quality_min,
            png_max: self.png_quality_max,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
