//! HTTP handlers for object operations.
//! Streams object bodies to disk to avoid buffering in memory and delegates
//! metadata concerns to `StorageService`.

use crate::{
    errors::AppError,
    handlers::xml::{MessageDocument, ObjectDocument, xml_response},
    models::object::ObjectRecord,
    services::storage_service::StorageService,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use futures::StreamExt;
use std::io;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// PUT `/{bucket}/{key}`: upload an object, replacing any previous body.
pub async fn put_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let stream = body.into_data_stream().map(|chunk| chunk.map_err(io::Error::other));

    let record = service
        .put_object(&bucket, &key, content_type, stream)
        .await?;
    xml_response(StatusCode::OK, &ObjectDocument::from(&record))
}

/// GET `/{bucket}/{key}`: object metadata as an XML document.
pub async fn get_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let record = service.get_object_metadata(&bucket, &key).await?;
    xml_response(StatusCode::OK, &ObjectDocument::from(&record))
}

/// HEAD `/{bucket}/{key}`: same metadata as GET, carried in headers only.
pub async fn head_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let record = service.get_object_metadata(&bucket, &key).await?;
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &record);
    Ok(response)
}

/// DELETE `/{bucket}/{key}`: remove object metadata and body.
pub async fn delete_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    service.delete_object(&bucket, &key).await?;
    xml_response(
        StatusCode::OK,
        &MessageDocument::new("Object successfully deleted"),
    )
}

fn set_object_headers(headers: &mut HeaderMap, meta: &ObjectRecord) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size));

    let http_date = meta
        .modified_at
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&http_date) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
