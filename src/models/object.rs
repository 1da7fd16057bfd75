//! Represents an object row of a bucket's Object Catalog.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata for one stored object. The body itself lives in the blob store.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Object key, unique within its bucket.
    pub key: String,

    /// Size of the stored body in bytes.
    pub size: u64,

    /// MIME type supplied when the object was written.
    pub content_type: String,

    /// Modification time of the body file after the last write.
    pub modified_at: DateTime<Utc>,
}
