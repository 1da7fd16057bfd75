//! Defines routes for all bucket and object operations.
//!
//! ## Structure
//! - **Service-level endpoints**
//!   - `GET    /` -> list buckets
//!   - `GET    /_healthz`, `GET /_readyz` -> health probes
//!
//! - **Bucket-level endpoints**
//!   - `GET    /{bucket}` -> list objects (supports prefix)
//!   - `PUT    /{bucket}` -> create bucket
//!   - `DELETE /{bucket}` -> delete bucket (soft-deletes its catalog row)
//!
//! - **Object-level endpoints**
//!   - `PUT    /{bucket}/{key}` -> upload object
//!   - `GET    /{bucket}/{key}` -> object metadata document
//!   - `HEAD   /{bucket}/{key}` -> object metadata as headers
//!   - `DELETE /{bucket}/{key}` -> delete object
//!
//! Keys are a single path segment. A trailing slash is trimmed before
//! routing, so `/{bucket}/` addresses the bucket. Any other path shape is a
//! 400, and an unsupported verb on a known path is a 405.

use crate::{
    errors::AppError,
    handlers::{
        bucket_handlers::{create_bucket, delete_bucket, list_buckets, list_objects},
        health_handlers::{healthz, readyz},
        object_handlers::{delete_object, get_object, head_object, put_object},
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    routing::{get, put},
};
use tower_http::normalize_path::NormalizePath;

/// The served application: the router with state applied, behind path
/// normalization.
pub type App = NormalizePath<Router>;

/// Wire `service` into the router and trim trailing slashes ahead of routing.
pub fn app(service: StorageService) -> App {
    NormalizePath::trim_trailing_slash(routes().with_state(service))
}

/// Build and return the router for all storage routes.
///
/// The router carries shared state (`StorageService`) to all handlers.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // health endpoints (outside the bucket namespace)
        .route("/_healthz", get(healthz))
        .route("/_readyz", get(readyz))
        .route("/", get(list_buckets))
        // Object-level routes
        .route(
            "/{bucket}/{key}",
            put(put_object)
                .get(get_object)
                .head(head_object)
                .delete(delete_object),
        )
        // Bucket-level routes
        .route(
            "/{bucket}",
            get(list_objects).put(create_bucket).delete(delete_bucket),
        )
        .fallback(invalid_path)
        .method_not_allowed_fallback(unsupported_method)
}

async fn invalid_path() -> AppError {
    AppError::bad_request("Invalid path")
}

async fn unsupported_method() -> AppError {
    AppError::method_not_allowed("Unsupported method")
}
