//! HTTP server layer for imgserve.
//!
//! Thin serving layer over the resolution core: handlers translate HTTP
//! requests into resolutions and resolutions into file responses with
//! cache headers; routes wire the handlers into an axum `Router` with
//! CORS and request tracing.

pub mod handlers;
pub mod routes;

pub use handlers::{health_handler, resize_handler, AppState, ErrorResponse, HealthResponse};
pub use routes::{create_router, RouterConfig};
