//! The Bucket Catalog: one CSV file at the storage root listing every bucket
//! ever created.
//!
//! Row layout: `encode(name), encode(created_at), encode(modified_at), status`
//! where `status` is the plain flag `true` or `false`. Rows are never removed;
//! deleting a bucket flips its flag.

use super::{
    CatalogError, CatalogLock, CatalogLocks, CatalogResult, append_rows,
    codec::{self, decode_timestamp, encode_timestamp},
    read_rows, rewrite_rows,
};
use crate::models::bucket::{BucketRecord, BucketStatus};
use chrono::{DateTime, Utc};
use csv::StringRecord;
use std::path::{Path, PathBuf};

const NAME: usize = 0;
const CREATED: usize = 1;
const MODIFIED: usize = 2;
const STATUS: usize = 3;

/// Handle to the Bucket Catalog file.
#[derive(Clone)]
pub struct BucketCatalog {
    path: PathBuf,
    locks: CatalogLocks,
}

/// Exclusive access to the Bucket Catalog. All row operations live here.
pub struct BucketCatalogGuard<'a> {
    path: &'a Path,
    _lock: CatalogLock,
}

impl BucketCatalog {
    pub fn new(path: impl Into<PathBuf>, locks: CatalogLocks) -> Self {
        Self {
            path: path.into(),
            locks,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn lock(&self) -> BucketCatalogGuard<'_> {
        BucketCatalogGuard {
            path: &self.path,
            _lock: self.locks.acquire(&self.path).await,
        }
    }
}

impl BucketCatalogGuard<'_> {
    /// Append a fresh active row. No duplicate check happens here.
    pub async fn append_bucket(
        &mut self,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> CatalogResult<BucketRecord> {
        let record = active_record(name, created_at);
        append_rows(self.path, &[to_row(&record)]).await?;
        Ok(record)
    }

    /// Every row in file order, inactive buckets included.
    pub async fn list_buckets(&self) -> CatalogResult<Vec<BucketRecord>> {
        read_rows(self.path)
            .await?
            .iter()
            .enumerate()
            .map(|(index, row)| from_row(self.path, index, row))
            .collect()
    }

    /// Flag every row named `name` as inactive. Returns how many rows changed;
    /// zero rows is not an error.
    pub async fn mark_inactive(
        &mut self,
        name: &str,
        modified_at: DateTime<Utc>,
    ) -> CatalogResult<usize> {
        let mut rows = read_rows(self.path).await?;
        let encoded_modified = encode_timestamp(&modified_at);

        let mut changed = 0;
        for (index, row) in rows.iter_mut().enumerate() {
            if decode_name(self.path, index, row)? != name {
                continue;
            }
            let updated = StringRecord::from(vec![
                &row[NAME],
                &row[CREATED],
                encoded_modified.as_str(),
                BucketStatus::Inactive.as_flag(),
            ]);
            *row = updated;
            changed += 1;
        }

        if changed > 0 {
            rewrite_rows(self.path, &rows).await?;
        }
        Ok(changed)
    }

    /// Record a newly created bucket directory.
    ///
    /// When rows for `name` already exist (a reused name) they collapse into a
    /// single active row at the position of the first one. Otherwise the row
    /// is appended.
    pub async fn register_bucket(
        &mut self,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> CatalogResult<BucketRecord> {
        let rows = match read_rows(self.path).await {
            Ok(rows) => rows,
            Err(CatalogError::Missing { .. }) => Vec::new(),
            Err(err) => return Err(err),
        };

        let record = active_record(name, created_at);
        let mut replaced = false;
        let mut kept = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            if decode_name(self.path, index, &row)? != name {
                kept.push(row);
            } else if !replaced {
                kept.push(to_row(&record));
                replaced = true;
            }
        }

        if replaced {
            rewrite_rows(self.path, &kept).await?;
            Ok(record)
        } else {
            self.append_bucket(name, created_at).await
        }
    }
}

fn active_record(name: &str, created_at: DateTime<Utc>) -> BucketRecord {
    BucketRecord {
        name: name.to_string(),
        created_at,
        modified_at: created_at,
        status: BucketStatus::Active,
    }
}

fn to_row(record: &BucketRecord) -> StringRecord {
    StringRecord::from(vec![
        codec::encode(&record.name),
        encode_timestamp(&record.created_at),
        encode_timestamp(&record.modified_at),
        record.status.as_flag().to_string(),
    ])
}

fn decode_name(path: &Path, index: usize, row: &StringRecord) -> CatalogResult<String> {
    codec::decode(&row[NAME])
        .map_err(|err| CatalogError::malformed(path, index, format!("bucket name: {err}")))
}

fn from_row(path: &Path, index: usize, row: &StringRecord) -> CatalogResult<BucketRecord> {
    let timestamp = |column: usize, label: &str| {
        decode_timestamp(&row[column])
            .map_err(|err| CatalogError::malformed(path, index, format!("{label}: {err}")))
    };

    let status = BucketStatus::from_flag(&row[STATUS]).ok_or_else(|| {
        CatalogError::malformed(path, index, format!("unknown status `{}`", &row[STATUS]))
    })?;

    Ok(BucketRecord {
        name: decode_name(path, index, row)?,
        created_at: timestamp(CREATED, "creation time")?,
        modified_at: timestamp(MODIFIED, "modification time")?,
        status,
    })
}
