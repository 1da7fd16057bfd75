//! The Object Catalog: one CSV file per bucket listing the objects it holds.
//!
//! Row layout: `encode(key), size, content_type, encode(modified_at)`. Size
//! and content type are stored as plain text.

use super::{
    CatalogError, CatalogLock, CatalogLocks, CatalogResult,
    codec::{self, decode_timestamp, encode_timestamp},
    read_rows, rewrite_rows,
};
use crate::models::object::ObjectRecord;
use csv::StringRecord;
use std::path::{Path, PathBuf};

const KEY: usize = 0;
const SIZE: usize = 1;
const CONTENT_TYPE: usize = 2;
const MODIFIED: usize = 3;

/// Handle to one bucket's Object Catalog file.
#[derive(Clone)]
pub struct ObjectCatalog {
    path: PathBuf,
    locks: CatalogLocks,
}

/// Exclusive access to an Object Catalog.
pub struct ObjectCatalogGuard<'a> {
    path: &'a Path,
    _lock: CatalogLock,
}

impl ObjectCatalog {
    pub fn new(path: impl Into<PathBuf>, locks: CatalogLocks) -> Self {
        Self {
            path: path.into(),
            locks,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn lock(&self) -> ObjectCatalogGuard<'_> {
        ObjectCatalogGuard {
            path: &self.path,
            _lock: self.locks.acquire(&self.path).await,
        }
    }
}

impl ObjectCatalogGuard<'_> {
    /// Insert `record`, or replace the row holding the same key.
    ///
    /// Rows are matched on the encoded key. The first match is replaced in
    /// place and any later duplicates are dropped, leaving one row per key.
    pub async fn upsert_object(&mut self, record: &ObjectRecord) -> CatalogResult<()> {
        let rows = read_rows(self.path).await?;
        let encoded_key = codec::encode(&record.key);

        let mut found = false;
        let mut updated = Vec::with_capacity(rows.len() + 1);
        for row in rows {
            if row[KEY] != encoded_key {
                updated.push(row);
            } else if !found {
                updated.push(to_row(record));
                found = true;
            }
        }
        if !found {
            updated.push(to_row(record));
        }

        rewrite_rows(self.path, &updated).await
    }

    /// Remove every row for `key`. Returns whether anything was removed; when
    /// nothing matches the file is left byte-for-byte as it was.
    pub async fn delete_object(&mut self, key: &str) -> CatalogResult<bool> {
        let rows = read_rows(self.path).await?;
        let before = rows.len();

        let mut kept = Vec::with_capacity(before);
        for (index, row) in rows.into_iter().enumerate() {
            if decode_key(self.path, index, &row)? != key {
                kept.push(row);
            }
        }

        if kept.len() == before {
            return Ok(false);
        }
        rewrite_rows(self.path, &kept).await?;
        Ok(true)
    }

    /// First row whose key is `key`, if any.
    pub async fn get_object(&self, key: &str) -> CatalogResult<Option<ObjectRecord>> {
        for (index, row) in read_rows(self.path).await?.iter().enumerate() {
            if decode_key(self.path, index, row)? == key {
                return from_row(self.path, index, row).map(Some);
            }
        }
        Ok(None)
    }

    pub async fn list_objects(&self) -> CatalogResult<Vec<ObjectRecord>> {
        read_rows(self.path)
            .await?
            .iter()
            .enumerate()
            .map(|(index, row)| from_row(self.path, index, row))
            .collect()
    }
}

fn to_row(record: &ObjectRecord) -> StringRecord {
    StringRecord::from(vec![
        codec::encode(&record.key),
        record.size.to_string(),
        record.content_type.clone(),
        encode_timestamp(&record.modified_at),
    ])
}

fn decode_key(path: &Path, index: usize, row: &StringRecord) -> CatalogResult<String> {
    codec::decode(&row[KEY])
        .map_err(|err| CatalogError::malformed(path, index, format!("object key: {err}")))
}

fn from_row(path: &Path, index: usize, row: &StringRecord) -> CatalogResult<ObjectRecord> {
    let size = row[SIZE].parse::<u64>().map_err(|err| {
        CatalogError::malformed(path, index, format!("size `{}`: {err}", &row[SIZE]))
    })?;
    let modified_at = decode_timestamp(&row[MODIFIED]).map_err(|err| {
        CatalogError::malformed(path, index, format!("modification time: {err}"))
    })?;

    Ok(ObjectRecord {
        key: decode_key(path, index, row)?,
        size,
        content_type: row[CONTENT_TYPE].to_string(),
        modified_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OBJECT_CATALOG_FILE;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, minute, 0).unwrap()
    }

    fn record(key: &str, size: u64, minute: u32) -> ObjectRecord {
        ObjectRecord {
            key: key.to_string(),
            size,
            content_type: "image/jpeg".to_string(),
            modified_at: at(minute),
        }
    }

    fn catalog(dir: &TempDir) -> ObjectCatalog {
        let path = dir.path().join(OBJECT_CATALOG_FILE);
        std::fs::write(&path, "").unwrap();
        ObjectCatalog::new(path, CatalogLocks::new())
    }

    #[tokio::test]
    async fn upsert_encodes_only_key_and_time() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);

        catalog
            .lock()
            .await
            .upsert_object(&record("a.jpg", 42, 5))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(catalog.path()).unwrap();
        let ts = codec::encode("2026-10-17T09:05:00Z");
        assert_eq!(raw, format!("YS5qcGc=,42,image/jpeg,{ts}\n"));
    }

    #[tokio::test]
    async fn repeated_upserts_keep_one_row_with_the_last_write() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let mut guard = catalog.lock().await;

        guard.upsert_object(&record("other", 1, 0)).await.unwrap();
        for (size, minute) in [(10, 1), (20, 2), (30, 3)] {
            guard.upsert_object(&record("a.jpg", size, minute)).await.unwrap();
        }

        let all = guard.list_objects().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key, "other");
        assert_eq!(
            guard.get_object("a.jpg").await.unwrap(),
            Some(record("a.jpg", 30, 3))
        );
    }

    #[tokio::test]
    async fn upsert_collapses_existing_duplicates() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let row = to_row(&record("dup", 1, 1));
        rewrite_rows(catalog.path(), &[row.clone(), row]).await.unwrap();

        let mut guard = catalog.lock().await;
        guard.upsert_object(&record("dup", 2, 2)).await.unwrap();

        assert_eq!(guard.list_objects().await.unwrap(), vec![record("dup", 2, 2)]);
    }

    #[tokio::test]
    async fn deleting_an_absent_key_leaves_the_file_identical() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let mut guard = catalog.lock().await;
        guard.upsert_object(&record("a.jpg", 1, 1)).await.unwrap();
        let before = std::fs::read(catalog.path()).unwrap();

        assert!(!guard.delete_object("missing").await.unwrap());
        assert_eq!(std::fs::read(catalog.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let mut guard = catalog.lock().await;
        guard.upsert_object(&record("a.jpg", 1, 1)).await.unwrap();
        guard.upsert_object(&record("b.jpg", 2, 2)).await.unwrap();

        assert!(guard.delete_object("a.jpg").await.unwrap());
        assert_eq!(guard.get_object("a.jpg").await.unwrap(), None);
        assert_eq!(guard.list_objects().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unparsable_size_is_reported() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let ts = codec::encode("2026-10-17T09:05:00Z");
        std::fs::write(catalog.path(), format!("YS5qcGc=,big,text/plain,{ts}\n")).unwrap();

        let err = catalog.lock().await.get_object("a.jpg").await.unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { row: 1, .. }));
    }
}
