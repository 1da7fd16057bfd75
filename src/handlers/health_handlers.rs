//! Health & readiness handlers.
//!
//! - GET /_healthz  -> simple liveness ("ok")
//! - GET /_readyz   -> readiness that checks the Bucket Catalog and disk I/O
//!
//! The leading underscore keeps these paths out of the bucket namespace.

use crate::services::storage_service::StorageService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /_healthz`
///
/// Very small liveness probe. Always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /_readyz`
///
/// Readiness probe that:
/// 1. Reads the Bucket Catalog.
/// 2. Performs a best-effort write/read/delete against the storage root.
///
/// HTTP 200 when all checks pass, HTTP 503 when any check fails.
pub async fn readyz(State(service): State<StorageService>) -> impl IntoResponse {
    let catalog_check = match service.list_buckets().await {
        Ok(_) => (true, None::<String>),
        Err(e) => {
            tracing::warn!("readiness: bucket catalog unreadable: {}", e);
            (false, Some("bucket catalog unreadable".to_string()))
        }
    };

    let tmp_path = service
        .base_path
        .join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => match fs::read(&tmp_path).await {
            Ok(bytes) if bytes == b"readyz" => match fs::remove_file(&tmp_path).await {
                Ok(_) => (true, None::<String>),
                Err(e) => (true, Some(format!("could not remove tmp file: {}", e.kind()))),
            },
            Ok(_) => {
                let _ = fs::remove_file(&tmp_path).await;
                (false, Some("file content mismatch".to_string()))
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path).await;
                (false, Some(format!("could not read tmp file: {}", e.kind())))
            }
        },
        Err(e) => (false, Some(format!("could not write tmp file: {}", e.kind()))),
    };

    let overall_ok = catalog_check.0 && disk_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "catalog",
        CheckStatus {
            ok: catalog_check.0,
            error: catalog_check.1,
        },
    );
    checks.insert(
        "disk",
        CheckStatus {
            ok: disk_check.0,
            error: disk_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok { "ok" } else { "error" }.into(),
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
