use crate::{
    catalog::CatalogError,
    handlers::xml::{ErrorDocument, XML_DECLARATION, with_xml_content_type},
    services::storage_service::StorageError,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

const INTERNAL_MESSAGE: &str = "We encountered an internal error. Please try again.";

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn method_not_allowed(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let doc = ErrorDocument {
            message: self.message,
        };
        let body = match quick_xml::se::to_string(&doc) {
            Ok(xml) => format!("{XML_DECLARATION}{xml}"),
            Err(_) => format!("{XML_DECLARATION}<Error><Message>{INTERNAL_MESSAGE}</Message></Error>"),
        };
        with_xml_content_type(self.status, body)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidBucketName { .. }
            | StorageError::InvalidObjectKey { .. }
            | StorageError::ReservedName(_) => AppError::bad_request(err.to_string()),
            StorageError::BucketNotFound(_) | StorageError::ObjectNotFound { .. } => {
                AppError::not_found(err.to_string())
            }
            StorageError::BucketAlreadyExists(_) => AppError::conflict(err.to_string()),
            StorageError::Catalog(CatalogError::Missing { .. }) => {
                tracing::warn!("catalog missing: {}", err);
                AppError::not_found("The requested catalog does not exist")
            }
            StorageError::Catalog(_) | StorageError::Blob(_) => {
                // The detail may contain filesystem paths; keep it in the log.
                tracing::error!("storage failure: {}", err);
                AppError::internal(INTERNAL_MESSAGE)
            }
        }
    }
}
