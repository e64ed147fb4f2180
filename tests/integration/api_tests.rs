//! HTTP API integration tests.
//!
//! Tests verify:
//! - Rendition retrieval with content type and cache headers
//! - Error responses (malformed geometry, missing source) as JSON
//! - Health check endpoint

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use imgserve::server::{create_router, RouterConfig};

use super::test_utils::{
    coordinator, decoded_dimensions, is_valid_jpeg, router, test_env, write_image_source,
};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// =============================================================================
// Rendition Retrieval
// =============================================================================

#[tokio::test]
async fn test_resize_success() {
    let env = test_env();
    write_image_source(&env, "photos/dog.jpg", 400, 300, [180, 90, 40]);
    let app = router(&env);

    let response = app.oneshot(get("/200x100/photos/dog.jpg")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "max-age=86400"
    );
    let expires = response.headers().get("expires").unwrap().to_str().unwrap();
    assert!(expires.ends_with(" GMT"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&body), "response should be a valid JPEG");

    let (w, h) = decoded_dimensions(&body);
    assert_eq!(h, 100);
    assert!((132..=134).contains(&w), "unexpected width {w}");
}

#[tokio::test]
async fn test_png_content_type() {
    let env = test_env();
    write_image_source(&env, "logo.png", 64, 64, [255, 255, 255]);
    let app = router(&env);

    let response = app.oneshot(get("/32x32/logo.png")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
}

#[tokio::test]
async fn test_custom_cache_max_age() {
    let env = test_env();
    write_image_source(&env, "dog.jpg", 64, 64, [0, 0, 0]);
    let app = create_router(
        coordinator(&env),
        RouterConfig::new().with_cache_max_age(600).with_tracing(false),
    );

    let response = app.oneshot(get("/32x32/dog.jpg")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "max-age=600"
    );
}

#[tokio::test]
async fn test_repeated_request_served_from_cache() {
    let env = test_env();
    write_image_source(&env, "dog.jpg", 64, 64, [20, 40, 60]);
    let app = router(&env);

    let first = app
        .clone()
        .oneshot(get("/32x32/dog.jpg"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let bytes_first = first.into_body().collect().await.unwrap().to_bytes();

    let second = app.oneshot(get("/32x32/dog.jpg")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let bytes_second = second.into_body().collect().await.unwrap().to_bytes();

    assert_eq!(bytes_first, bytes_second);
}

// =============================================================================
// Error Responses
// =============================================================================

#[tokio::test]
async fn test_malformed_geometry_returns_400() {
    let env = test_env();
    let app = router(&env);

    for uri in ["/abcxdef/foo.jpg", "/100x/foo.jpg", "/0x100/foo.jpg"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "invalid_request");
        assert_eq!(json["status"], 400);
    }
}

#[tokio::test]
async fn test_missing_source_returns_404() {
    let env = test_env();
    let app = router(&env);

    let response = app.oneshot(get("/100x100/photos/ghost.jpg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_traversal_returns_400() {
    let env = test_env();
    write_image_source(&env, "dog.jpg", 64, 64, [0, 0, 0]);
    let app = router(&env);

    let response = app.oneshot(get("/100x100/../dog.jpg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Health Check
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let env = test_env();
    let app = router(&env);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}
