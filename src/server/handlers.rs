//! HTTP request handlers for the resize API.
//!
//! # Endpoints
//!
//! - `GET /{width}x{height}/{source path}` - Serve a resized rendition
//! - `GET /health` - Health check endpoint
//!
//! The handler layer owns everything the resolution core does not: opening
//! the published cache file, mapping the resolved format to a content type,
//! and emitting `Cache-Control`/`Expires` headers from the configured
//! max-age.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

use crate::cache::{CacheCoordinator, Resolution};
use crate::error::ResolveError;
use crate::transcode::Transcoder;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to handlers via Axum's State extractor.
pub struct AppState<T: Transcoder> {
    /// The resolution core
    pub coordinator: Arc<CacheCoordinator<T>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,
}

impl<T: Transcoder> AppState<T> {
    /// Create a new application state.
    pub fn new(coordinator: CacheCoordinator<T>, cache_max_age: u32) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            cache_max_age,
        }
    }
}

impl<T: Transcoder> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: status.as_u16(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Resize endpoint: resolve the request to a cache entry and serve it.
pub async fn resize_handler<T: Transcoder>(
    State(state): State<AppState<T>>,
    Path(path): Path<String>,
) -> Response {
    let raw = format!("/{path}");
    debug!(path = %raw, "resize request");

    match state.coordinator.resolve(&raw).await {
        Ok(resolution) => serve_entry(&state, resolution).await,
        Err(err) => error_response(&raw, &err),
    }
}

/// Read the published cache file and build the image response.
async fn serve_entry<T: Transcoder>(state: &AppState<T>, resolution: Resolution) -> Response {
    let data = match tokio::fs::read(&resolution.cache_path).await {
        Ok(data) => data,
        Err(e) => {
            error!(
                cache_path = %resolution.cache_path.display(),
                error = %e,
                "failed to read published cache entry"
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "storage_unavailable",
                    format!("failed to read cache entry: {e}"),
                    StatusCode::INTERNAL_SERVER_ERROR,
                )),
            )
                .into_response();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(resolution.format.content_type()),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("max-age={}", state.cache_max_age)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&expires_header(state.cache_max_age)) {
        headers.insert(header::EXPIRES, value);
    }

    (StatusCode::OK, headers, data).into_response()
}

/// RFC 1123 date string for the Expires header.
fn expires_header(max_age: u32) -> String {
    let expires = chrono::Utc::now() + chrono::Duration::seconds(i64::from(max_age));
    expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Map a resolution failure to its HTTP representation.
fn error_response(raw_path: &str, err: &ResolveError) -> Response {
    let (status, kind) = match err {
        ResolveError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        ResolveError::SourceNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        ResolveError::StorageUnavailable { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "storage_unavailable")
        }
        ResolveError::TranscodeFailed { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "transcode_failed")
        }
    };

    if status.is_server_error() {
        error!(path = %raw_path, error = %err, "resolution failed");
    } else {
        debug!(path = %raw_path, error = %err, "request rejected");
    }

    (status, Json(ErrorResponse::new(kind, err.to_string(), status))).into_response()
}

// =============================================================================
// Tests
// =============================================================================
