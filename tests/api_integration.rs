//! API Integration Tests
//!
//! Drives the HTTP API with in-process requests through
//! `tower::ServiceExt::oneshot`; no network I/O.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use simple_storage::{
    catalog::codec::format_timestamp,
    routes::routes::{App, app},
    services::storage_service::{StorageService, modified_time},
};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

/// Creates a router backed by a fresh storage root in a temporary directory.
async fn create_test_app() -> (App, PathBuf, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path().join("data");
    let service = StorageService::open(&root)
        .await
        .expect("Failed to open storage root");
    (app(service), root, temp_dir)
}

async fn send(app: &App, method: &str, uri: &str, body: Body) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn put_object(app: &App, uri: &str, content_type: &str, body: &'static [u8]) -> StatusCode {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status()
}

// ============================================================================
// Bucket Operations Tests
// ============================================================================

#[tokio::test]
async fn test_create_bucket() {
    let (app, _root, _temp) = create_test_app().await;

    let (status, body) = send(&app, "PUT", "/photos", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<Name>photos</Name>"));
    assert!(body.contains("<Status>Active</Status>"));
}

#[tokio::test]
async fn test_create_bucket_invalid_names() {
    let (app, _root, _temp) = create_test_app().await;

    for uri in ["/ab", "/My-Bucket", "/my..bucket", "/my--bucket", "/192.168.0.1"] {
        let (status, body) = send(&app, "PUT", uri, Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body.contains("<Error><Message>"));
    }
}

#[tokio::test]
async fn test_create_duplicate_bucket_conflicts() {
    let (app, root, _temp) = create_test_app().await;
    send(&app, "PUT", "/photos", Body::empty()).await;
    let catalog_before = std::fs::read(root.join("buckets.csv")).unwrap();

    let (status, _) = send(&app, "PUT", "/photos", Body::empty()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(std::fs::read(root.join("buckets.csv")).unwrap(), catalog_before);
}

#[tokio::test]
async fn test_list_buckets_empty_root() {
    let (app, _root, _temp) = create_test_app().await;

    let (status, body) = send(&app, "GET", "/", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<ListAllMyBucketsResult>"));
    assert!(!body.contains("<Bucket>"));
}

#[tokio::test]
async fn test_delete_missing_bucket() {
    let (app, _root, _temp) = create_test_app().await;
    let (status, _) = send(&app, "DELETE", "/photos", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_bucket_catalog_is_rejected() {
    let (app, root, _temp) = create_test_app().await;
    let (status, _) = send(&app, "DELETE", "/buckets.csv", Body::empty()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(root.join("buckets.csv").is_file());
}

// ============================================================================
// Object Operations Tests
// ============================================================================

#[tokio::test]
async fn test_put_object_into_missing_bucket() {
    let (app, _root, _temp) = create_test_app().await;
    let status = put_object(&app, "/photos/a.jpg", "image/jpeg", b"data").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_object_metadata_uses_stored_content_type() {
    let (app, _root, _temp) = create_test_app().await;
    send(&app, "PUT", "/docs", Body::empty()).await;
    put_object(&app, "/docs/readme", "text/markdown", b"# hi").await;

    // No Content-Type on the read request.
    let (status, body) = send(&app, "GET", "/docs/readme", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<ContentType>text/markdown</ContentType>"));
    assert!(body.contains("<Size>4</Size>"));
}

#[tokio::test]
async fn test_head_object_headers() {
    let (app, _root, _temp) = create_test_app().await;
    send(&app, "PUT", "/docs", Body::empty()).await;
    put_object(&app, "/docs/readme", "text/markdown", b"# hi").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("HEAD")
                .uri("/docs/readme")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/markdown");
    assert_eq!(headers[header::CONTENT_LENGTH], "4");
    assert!(headers.contains_key(header::LAST_MODIFIED));
}

#[tokio::test]
async fn test_delete_object() {
    let (app, root, _temp) = create_test_app().await;
    send(&app, "PUT", "/docs", Body::empty()).await;
    put_object(&app, "/docs/readme", "text/plain", b"x").await;

    let (status, body) = send(&app, "DELETE", "/docs/readme", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Object successfully deleted"));
    assert!(!root.join("docs/readme").exists());

    let (status, _) = send(&app, "GET", "/docs/readme", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", "/docs/readme", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_object_catalog_is_rejected() {
    let (app, root, _temp) = create_test_app().await;
    send(&app, "PUT", "/docs", Body::empty()).await;

    let (status, _) = send(&app, "DELETE", "/docs/objects.csv", Body::empty()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(root.join("docs/objects.csv").is_file());
}

#[tokio::test]
async fn test_list_objects_with_prefix() {
    let (app, _root, _temp) = create_test_app().await;
    send(&app, "PUT", "/docs", Body::empty()).await;
    put_object(&app, "/docs/a-1", "text/plain", b"x").await;
    put_object(&app, "/docs/b-1", "text/plain", b"x").await;

    let (status, body) = send(&app, "GET", "/docs?prefix=a-", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<KeyCount>1</KeyCount>"));
    assert!(body.contains("<Key>a-1</Key>"));
    assert!(!body.contains("<Key>b-1</Key>"));
}

// ============================================================================
// Routing Tests
// ============================================================================

#[tokio::test]
async fn test_unsupported_method() {
    let (app, _root, _temp) = create_test_app().await;

    let (status, body) = send(&app, "POST", "/photos", Body::empty()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body.contains("Unsupported method"));

    let (status, _) = send(&app, "PUT", "/", Body::empty()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_trailing_slash_addresses_the_bucket() {
    let (app, root, _temp) = create_test_app().await;

    let (status, body) = send(&app, "PUT", "/photos/", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<Name>photos</Name>"));
    assert!(root.join("photos").is_dir());

    let (status, body) = send(&app, "GET", "/photos/", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<ListBucketResult>"));

    let (status, _) = send(&app, "DELETE", "/photos/", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_path() {
    let (app, _root, _temp) = create_test_app().await;
    let (status, body) = send(&app, "GET", "/a/b/c", Body::empty()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid path"));
}

#[tokio::test]
async fn test_health_probes() {
    let (app, _root, _temp) = create_test_app().await;

    let (status, body) = send(&app, "GET", "/_healthz", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"ok\""));

    let (status, _) = send(&app, "GET", "/_readyz", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn test_bucket_lifecycle_end_to_end() {
    let (app, root, _temp) = create_test_app().await;

    let (status, _) = send(&app, "PUT", "/photos", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/", Body::empty()).await;
    assert_eq!(body.matches("<Bucket>").count(), 1);
    assert!(body.contains("<Status>Active</Status>"));

    let bytes: &'static [u8] = b"\xff\xd8\xff\xe0 not really a jpeg";
    let status = put_object(&app, "/photos/a.jpg", "image/jpeg", bytes).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/photos/a.jpg", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let mtime = modified_time(&std::fs::metadata(root.join("photos/a.jpg")).unwrap()).unwrap();
    assert!(body.contains(&format!("<Size>{}</Size>", bytes.len())));
    assert!(body.contains(&format!(
        "<LastModified>{}</LastModified>",
        format_timestamp(&mtime)
    )));

    let (status, _) = send(&app, "DELETE", "/photos", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/", Body::empty()).await;
    assert_eq!(body.matches("<Bucket>").count(), 1);
    assert!(body.contains("<Status>Inactive</Status>"));
    assert!(!root.join("photos").exists());

    let status = put_object(&app, "/photos/b.jpg", "image/jpeg", b"x").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
