//! src/services/storage_service.rs
//!
//! StorageService: bucket and object lifecycle operations. Metadata lives in
//! flat CSV catalogs (see `crate::catalog`); object bodies live on disk at
//! `base_path/{bucket}/{key}`. Each operation pairs a blob-store action with a
//! catalog update while holding the lock of the catalog it touches.

use crate::{
    catalog::{
        BUCKET_CATALOG_FILE, BucketCatalog, CatalogError, CatalogLocks, OBJECT_CATALOG_FILE,
        ObjectCatalog, ensure_catalog_file,
    },
    models::{bucket::BucketRecord, object::ObjectRecord},
    services::validation::{validate_bucket_name, validate_object_key},
};
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use futures::Stream;
use std::{
    fs::Metadata,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: &'static str },
    #[error("object key `{key}` invalid: {reason}")]
    InvalidObjectKey { key: String, reason: &'static str },
    #[error("`{0}` is reserved for catalog metadata")]
    ReservedName(String),
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("blob store failure: {0}")]
    Blob(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// StorageService provides the bucket and object operations:
/// - Create / list / delete buckets (Bucket Catalog + bucket directories)
/// - Put / get metadata / list / delete objects (Object Catalog + body files)
///
/// Cloning is cheap; clones share the same catalog locks.
#[derive(Clone)]
pub struct StorageService {
    /// Root directory holding the Bucket Catalog and one directory per bucket.
    pub base_path: PathBuf,

    buckets: BucketCatalog,
    locks: CatalogLocks,
}

impl StorageService {
    /// Open the storage root, creating it and an empty Bucket Catalog when
    /// they do not exist yet.
    pub async fn open(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;

        let locks = CatalogLocks::new();
        let buckets = BucketCatalog::new(base_path.join(BUCKET_CATALOG_FILE), locks.clone());
        ensure_catalog_file(buckets.path()).await?;

        Ok(Self {
            base_path,
            buckets,
            locks,
        })
    }

    fn bucket_root(&self, bucket: &str) -> PathBuf {
        self.base_path.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.bucket_root(bucket).join(key)
    }

    fn object_catalog(&self, bucket: &str) -> ObjectCatalog {
        ObjectCatalog::new(
            self.bucket_root(bucket).join(OBJECT_CATALOG_FILE),
            self.locks.clone(),
        )
    }

    /// Reject the catalog file name and anything the naming rules forbid.
    /// Such names can never be a bucket directory.
    fn ensure_bucket_name_safe(&self, name: &str) -> StorageResult<()> {
        if name == BUCKET_CATALOG_FILE {
            return Err(StorageError::ReservedName(name.to_string()));
        }
        validate_bucket_name(name).map_err(|reason| StorageError::InvalidBucketName {
            name: name.to_string(),
            reason,
        })
    }

    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        if key == OBJECT_CATALOG_FILE {
            return Err(StorageError::ReservedName(key.to_string()));
        }
        validate_object_key(key).map_err(|reason| StorageError::InvalidObjectKey {
            key: key.to_string(),
            reason,
        })
    }

    /// Stat the bucket directory; a missing directory means no such bucket.
    async fn ensure_bucket_exists(&self, bucket: &str) -> StorageResult<Metadata> {
        match fs::metadata(self.bucket_root(bucket)).await {
            Ok(meta) if meta.is_dir() => Ok(meta),
            Ok(_) => Err(StorageError::BucketNotFound(bucket.to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::BucketNotFound(bucket.to_string()))
            }
            Err(err) => Err(StorageError::Blob(err)),
        }
    }

    async fn ensure_object_exists(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        let path = self.object_path(bucket, key);
        let not_found = || StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(not_found()),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(err) => Err(StorageError::Blob(err)),
        }
    }

    /// Create a bucket directory with an empty Object Catalog and record it.
    ///
    /// The catalog row carries the directory's own modification time.
    /// Returns BucketAlreadyExists when the directory is already there, in
    /// which case the catalog is not touched.
    pub async fn create_bucket(&self, name: &str) -> StorageResult<BucketRecord> {
        self.ensure_bucket_name_safe(name)?;
        let mut buckets = self.buckets.lock().await;

        let bucket_root = self.bucket_root(name);
        match fs::create_dir(&bucket_root).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::BucketAlreadyExists(name.to_string()));
            }
            Err(err) => return Err(StorageError::Blob(err)),
        }
        File::create(bucket_root.join(OBJECT_CATALOG_FILE)).await?;

        let created_at = modified_time(&fs::metadata(&bucket_root).await?)?;
        let record = buckets.register_bucket(name, created_at).await?;
        info!(bucket = name, "created bucket");
        Ok(record)
    }

    /// Every bucket in the catalog, including deleted ones.
    pub async fn list_buckets(&self) -> StorageResult<Vec<BucketRecord>> {
        Ok(self.buckets.lock().await.list_buckets().await?)
    }

    /// Delete a bucket and everything in it.
    ///
    /// Two phases without rollback: the catalog row is marked inactive first,
    /// then the directory tree is removed. If the removal fails the row stays
    /// inactive while files remain on disk.
    pub async fn delete_bucket(&self, name: &str) -> StorageResult<()> {
        self.ensure_bucket_name_safe(name)?;
        let mut buckets = self.buckets.lock().await;
        let objects = self.object_catalog(name);
        let _objects_guard = objects.lock().await;

        let meta = self.ensure_bucket_exists(name).await?;
        let modified_at = modified_time(&meta)?;

        let marked = buckets.mark_inactive(name, modified_at).await?;
        if marked == 0 {
            warn!(bucket = name, "bucket directory has no catalog row");
        }

        let bucket_root = self.bucket_root(name);
        if let Err(err) = fs::remove_dir_all(&bucket_root).await {
            warn!(
                bucket = name,
                error = %err,
                "bucket marked inactive but its directory could not be removed"
            );
            return Err(StorageError::Blob(err));
        }

        info!(bucket = name, "deleted bucket");
        Ok(())
    }

    /// Write an object body and record its metadata.
    ///
    /// The body is streamed to a temporary file in the bucket directory and
    /// renamed over `{bucket}/{key}`, replacing any previous body. Size and
    /// modification time come from the written file.
    pub async fn put_object<S>(
        &self,
        bucket: &str,
        key: &str,
        content_type: String,
        body: S,
    ) -> StorageResult<ObjectRecord>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        self.ensure_bucket_name_safe(bucket)?;
        self.ensure_key_safe(key)?;
        let objects = self.object_catalog(bucket);
        let mut catalog = objects.lock().await;
        self.ensure_bucket_exists(bucket).await?;

        let file_path = self.object_path(bucket, key);
        let tmp_path = self
            .bucket_root(bucket)
            .join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(err) = write_blob(&tmp_path, body).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Blob(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Blob(err));
            }
        }

        let meta = fs::metadata(&file_path).await?;
        let record = ObjectRecord {
            key: key.to_string(),
            size: meta.len(),
            content_type,
            modified_at: modified_time(&meta)?,
        };
        debug!(bucket, key, size = record.size, "stored object body");

        catalog.upsert_object(&record).await?;
        Ok(record)
    }

    /// Metadata of an object whose body exists in the bucket.
    pub async fn get_object_metadata(&self, bucket: &str, key: &str) -> StorageResult<ObjectRecord> {
        self.ensure_bucket_name_safe(bucket)?;
        self.ensure_key_safe(key)?;
        let objects = self.object_catalog(bucket);
        let catalog = objects.lock().await;
        self.ensure_bucket_exists(bucket).await?;
        self.ensure_object_exists(bucket, key).await?;

        match catalog.get_object(key).await? {
            Some(record) => Ok(record),
            None => {
                warn!(bucket, key, "object body exists without a catalog row");
                Err(StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
        }
    }

    /// Objects of a bucket in catalog order, optionally limited to a key prefix.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> StorageResult<Vec<ObjectRecord>> {
        self.ensure_bucket_name_safe(bucket)?;
        let objects = self.object_catalog(bucket);
        let catalog = objects.lock().await;
        self.ensure_bucket_exists(bucket).await?;

        let mut records = catalog.list_objects().await?;
        if let Some(prefix) = prefix {
            records.retain(|record| record.key.starts_with(prefix));
        }
        Ok(records)
    }

    /// Remove an object's catalog row, then its body.
    ///
    /// No rollback: if the body cannot be removed after the row is gone, the
    /// file is orphaned until overwritten or removed by hand.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.ensure_bucket_name_safe(bucket)?;
        self.ensure_key_safe(key)?;
        let objects = self.object_catalog(bucket);
        let mut catalog = objects.lock().await;
        self.ensure_bucket_exists(bucket).await?;
        let file_path = self.ensure_object_exists(bucket, key).await?;

        if !catalog.delete_object(key).await? {
            warn!(bucket, key, "deleting object body without a catalog row");
        }

        if let Err(err) = fs::remove_file(&file_path).await {
            warn!(
                bucket,
                key,
                error = %err,
                "catalog row removed but object body could not be deleted"
            );
            return Err(StorageError::Blob(err));
        }
        debug!(bucket, key, "deleted object");
        Ok(())
    }
}

/// Stream `body` into a new file at `path` and sync it.
async fn write_blob<S>(path: &Path, body: S) -> io::Result<u64>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut file = File::create(path).await?;
    let reader = StreamReader::new(body);
    tokio::pin!(reader);
    let written = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// Modification time of a file or directory, truncated to whole seconds as
/// stored in the catalogs.
pub fn modified_time(meta: &Metadata) -> io::Result<DateTime<Utc>> {
    Ok(DateTime::<Utc>::from(meta.modified()?).trunc_subsecs(0))
}
