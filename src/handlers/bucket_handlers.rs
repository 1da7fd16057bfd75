//! HTTP handlers for bucket-level operations: list, create, delete buckets
//! and list the objects of a bucket.

use crate::{
    errors::AppError,
    handlers::xml::{
        BucketDocument, ListBucketsDocument, ListObjectsDocument, MessageDocument,
        ObjectDocument, xml_response,
    },
    services::storage_service::StorageService,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;

/// Query params accepted when listing a bucket.
#[derive(Debug, Deserialize)]
pub struct ListObjectsQuery {
    pub prefix: Option<String>,
}

/// GET `/`: every bucket in the catalog, deleted ones included.
pub async fn list_buckets(State(service): State<StorageService>) -> Result<Response, AppError> {
    let buckets = service.list_buckets().await?;
    xml_response(StatusCode::OK, &ListBucketsDocument::new(&buckets))
}

/// PUT `/{bucket}`: create bucket.
pub async fn create_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Response, AppError> {
    let record = service.create_bucket(&bucket).await?;
    xml_response(StatusCode::OK, &BucketDocument::from(&record))
}

/// DELETE `/{bucket}`: delete bucket and its objects.
pub async fn delete_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Response, AppError> {
    service.delete_bucket(&bucket).await?;
    xml_response(
        StatusCode::OK,
        &MessageDocument::new("Bucket successfully deleted"),
    )
}

/// GET `/{bucket}`: list objects, supports ?prefix=
pub async fn list_objects(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
    Query(q): Query<ListObjectsQuery>,
) -> Result<Response, AppError> {
    let objects = service.list_objects(&bucket, q.prefix.as_deref()).await?;
    let doc = ListObjectsDocument {
        name: bucket,
        prefix: q.prefix,
        key_count: objects.len(),
        contents: objects.iter().map(ObjectDocument::from).collect(),
    };
    xml_response(StatusCode::OK, &doc)
}
