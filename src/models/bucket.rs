//! Represents a bucket row of the Bucket Catalog.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Whether a bucket still exists or was deleted.
///
/// Deleted buckets keep their catalog row; only the flag changes.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketStatus {
    Active,
    Inactive,
}

impl BucketStatus {
    /// The plain-text flag stored in the catalog.
    pub fn as_flag(self) -> &'static str {
        match self {
            BucketStatus::Active => "true",
            BucketStatus::Inactive => "false",
        }
    }

    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "true" => Some(BucketStatus::Active),
            "false" => Some(BucketStatus::Inactive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BucketStatus::Active => "Active",
            BucketStatus::Inactive => "Inactive",
        }
    }
}

/// A bucket known to the catalog, active or not.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BucketRecord {
    /// Bucket name, also the directory name under the storage root.
    pub name: String,

    /// Modification time of the bucket directory right after creation.
    pub created_at: DateTime<Utc>,

    /// Last status change.
    pub modified_at: DateTime<Utc>,

    pub status: BucketStatus,
}
