//! XML documents returned by the API, serialized with quick-xml.

use crate::{
    catalog::codec::format_timestamp,
    errors::AppError,
    models::{bucket::BucketRecord, object::ObjectRecord},
};
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Serialize)]
#[serde(rename = "Bucket")]
pub struct BucketDocument {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CreationTime")]
    pub creation_time: String,
    #[serde(rename = "LastModifiedTime")]
    pub last_modified_time: String,
    #[serde(rename = "Status")]
    pub status: &'static str,
}

impl From<&BucketRecord> for BucketDocument {
    fn from(record: &BucketRecord) -> Self {
        Self {
            name: record.name.clone(),
            creation_time: format_timestamp(&record.created_at),
            last_modified_time: format_timestamp(&record.modified_at),
            status: record.status.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "ListAllMyBucketsResult")]
pub struct ListBucketsDocument {
    #[serde(rename = "Buckets")]
    pub buckets: BucketList,
}

#[derive(Debug, Serialize)]
pub struct BucketList {
    #[serde(rename = "Bucket")]
    pub bucket: Vec<BucketDocument>,
}

impl ListBucketsDocument {
    pub fn new(records: &[BucketRecord]) -> Self {
        Self {
            buckets: BucketList {
                bucket: records.iter().map(BucketDocument::from).collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "Object")]
pub struct ObjectDocument {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "ContentType")]
    pub content_type: String,
    #[serde(rename = "LastModified")]
    pub last_modified: String,
}

impl From<&ObjectRecord> for ObjectDocument {
    fn from(record: &ObjectRecord) -> Self {
        Self {
            key: record.key.clone(),
            size: record.size,
            content_type: record.content_type.clone(),
            last_modified: format_timestamp(&record.modified_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "ListBucketResult")]
pub struct ListObjectsDocument {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Prefix", skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(rename = "KeyCount")]
    pub key_count: usize,
    #[serde(rename = "Contents")]
    pub contents: Vec<ObjectDocument>,
}

/// Plain acknowledgement, e.g. after a delete.
#[derive(Debug, Serialize)]
#[serde(rename = "Response")]
pub struct MessageDocument {
    #[serde(rename = "Message")]
    pub message: String,
}

impl MessageDocument {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "Error")]
pub struct ErrorDocument {
    #[serde(rename = "Message")]
    pub message: String,
}

/// Serialize `doc` with the XML declaration prepended.
pub fn render<T: Serialize>(doc: &T) -> Result<String, AppError> {
    let body = quick_xml::se::to_string(doc).map_err(|err| {
        error!("failed to serialize XML response: {}", err);
        AppError::internal("Error generating XML")
    })?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

pub fn xml_response<T: Serialize>(status: StatusCode, doc: &T) -> Result<Response, AppError> {
    let body = render(doc)?;
    Ok(with_xml_content_type(status, body))
}

pub(crate) fn with_xml_content_type(status: StatusCode, body: String) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml"),
    );
    response
}
