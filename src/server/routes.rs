//! Router configuration for imgserve.
//!
//! # Route Structure
//!
//! ```text
//! /health                          - Health check
//! /{width}x{height}/{source path}  - Resized rendition (catch-all)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use imgserve::cache::CacheCoordinator;
//! use imgserve::server::{create_router, RouterConfig};
//! use imgserve::transcode::ImageTranscoder;
//!
//! let coordinator = CacheCoordinator::new("/srv/images", "/srv/cache", ImageTranscoder::new());
//! let router = create_router(coordinator, RouterConfig::default());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::CacheCoordinator;
use crate::transcode::Transcoder;

use super::handlers::{health_handler, resize_handler, AppState};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 86_400,
            enable_tracing: true,
        }
    }
}

impl RouterConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = enable;
        self
    }
}

// =============================================================================
// Router Construction
// =============================================================================

/// Build the application router around a coordinator.
pub fn create_router<T: Transcoder>(
    coordinator: CacheCoordinator<T>,
    config: RouterConfig,
) -> Router {
    let state = AppState::new(coordinator, config.cache_max_age);

    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/{*path}", get(resize_handler::<T>))
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// CORS layer for GET-only image serving.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers([CONTENT_TYPE]);

    match &config.cors_origins {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            layer.allow_origin(parsed)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
