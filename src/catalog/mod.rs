//! Flat-file metadata catalogs.
//!
//! Two kinds of catalog exist: one Bucket Catalog at the storage root and one
//! Object Catalog inside every bucket directory. Both are header-less CSV files
//! of four-field rows, scanned linearly on every access and rewritten whole on
//! every mutation.
//!
//! Every catalog file is guarded by its own async mutex from [`CatalogLocks`].
//! Row operations live on guard types, so a read-modify-write cycle can only
//! run while that file's lock is held. Rewrites go through a temporary sibling
//! file and a rename, so readers never observe a truncated catalog.

pub mod bucket_catalog;
pub mod codec;
pub mod object_catalog;

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use thiserror::Error;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
    sync::{Mutex as AsyncMutex, OwnedMutexGuard},
};
use tracing::debug;
use uuid::Uuid;

pub use bucket_catalog::BucketCatalog;
pub use object_catalog::ObjectCatalog;

/// File name of the Bucket Catalog at the storage root.
pub const BUCKET_CATALOG_FILE: &str = "buckets.csv";

/// File name of the Object Catalog inside each bucket directory.
pub const OBJECT_CATALOG_FILE: &str = "objects.csv";

/// Every catalog row has exactly this many fields.
pub(crate) const ROW_ARITY: usize = 4;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog {} does not exist", path.display())]
    Missing { path: PathBuf },
    #[error("failed to read catalog {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write catalog {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed row {row} in catalog {}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        row: usize,
        reason: String,
    },
    #[error("csv error in catalog {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub(crate) fn malformed(path: &Path, index: usize, reason: impl ToString) -> Self {
        CatalogError::Malformed {
            path: path.to_path_buf(),
            row: index + 1,
            reason: reason.to_string(),
        }
    }
}

type LockMap = HashMap<PathBuf, Arc<AsyncMutex<()>>>;

/// Registry of per-file locks shared by every catalog handle of one service.
///
/// Entries only live while some task holds or waits on them; the last
/// [`CatalogLock`] released for a path removes it from the map.
#[derive(Clone, Default)]
pub struct CatalogLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl CatalogLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the catalog stored at `path`.
    pub async fn acquire(&self, path: &Path) -> CatalogLock {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(path.to_path_buf()).or_default().clone()
        };
        CatalogLock {
            guard: Some(lock.lock_owned().await),
            path: path.to_path_buf(),
            registry: Arc::clone(&self.inner),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_paths(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive hold on one catalog file.
pub struct CatalogLock {
    guard: Option<OwnedMutexGuard<()>>,
    path: PathBuf,
    registry: Arc<Mutex<LockMap>>,
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        // The map lock is taken first so no acquire can clone the entry
        // between the release and the count check.
        let mut map = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());
        if map
            .get(&self.path)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.path);
        }
    }
}

/// Create an empty catalog file if none exists yet.
pub(crate) async fn ensure_catalog_file(path: &Path) -> CatalogResult<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map(|_| ())
        .map_err(|source| CatalogError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Read every row of a catalog, checking arity but not field contents.
pub(crate) async fn read_rows(path: &Path) -> CatalogResult<Vec<StringRecord>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(CatalogError::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(CatalogError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|source| CatalogError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if record.len() != ROW_ARITY {
            return Err(CatalogError::malformed(
                path,
                index,
                format!("expected {} fields, found {}", ROW_ARITY, record.len()),
            ));
        }
        rows.push(record);
    }
    Ok(rows)
}

fn encode_rows(path: &Path, rows: &[StringRecord]) -> CatalogResult<Vec<u8>> {
    let csv_err = |source: csv::Error| CatalogError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|err| csv_err(err.into_error().into()))
}

/// Append rows to the end of a catalog, creating the file if needed.
pub(crate) async fn append_rows(path: &Path, rows: &[StringRecord]) -> CatalogResult<()> {
    let bytes = encode_rows(path, rows)?;
    let result: io::Result<()> = async {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(&bytes).await?;
        file.sync_all().await
    }
    .await;

    result.map_err(|source| CatalogError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(catalog = %path.display(), rows = rows.len(), "appended catalog rows");
    Ok(())
}

/// Replace the whole catalog with `rows`.
///
/// The new content is written and synced to a temporary sibling, then renamed
/// over the catalog. On failure the temporary file is removed and the old
/// catalog is left as it was.
pub(crate) async fn rewrite_rows(path: &Path, rows: &[StringRecord]) -> CatalogResult<()> {
    let bytes = encode_rows(path, rows)?;
    let tmp_path = temp_sibling(path);
    let result: io::Result<()> = async {
        let mut file = File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(CatalogError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    debug!(catalog = %path.display(), rows = rows.len(), "rewrote catalog");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp-{}", name, Uuid::new_v4()))
}
