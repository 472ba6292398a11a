//! Structured object cache: timestamped JSON records keyed by string.
//!
//! On disk the store is a directory holding a schema marker and one
//! directory per partition, with one JSON file per key:
//!
//! ```text
//! <root>/schema.json          {"version": 3}
//! <root>/products/item%3A1.json   {"data": {...}, "ts": "..."}
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::StorageError;
use super::fs::{join_key, read_optional, remove_dir_if_exists, write_atomic};
use super::record::CacheRecord;

/// Current on-disk schema version. Upgrades only ever add partitions.
pub const SCHEMA_VERSION: u32 = 3;

const SCHEMA_FILE: &str = "schema.json";

/// Partition holding catalog records.
const PRODUCTS_PARTITION: &str = "products";

#[derive(Debug, Serialize, Deserialize)]
struct SchemaMarker {
    version: u32,
}

/// An opened store. Cheap to clone out of the cache via `Arc`.
#[derive(Debug)]
pub struct StoreHandle {
    partition: PathBuf,
    version: u32,
}

impl StoreHandle {
    pub fn version(&self) -> u32 {
        self.version
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        join_key(&self.partition, key)
    }
}

/// Key/value store of `CacheRecord`s with lazy, memoized opening.
///
/// Nothing touches the disk until the first operation; the opened handle is
/// reused until `close` is called, after which the next operation reopens.
pub struct ObjectCache {
    root: PathBuf,
    handle: Mutex<Option<Arc<StoreHandle>>>,
}

impl ObjectCache {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            handle: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open the store if it is not open yet and return the shared handle.
    pub async fn ensure_open(&self) -> Result<Arc<StoreHandle>, StorageError> {
        let mut guard = self.handle.lock().await;
        if let Some(handle) = guard.as_ref() {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(Self::open(&self.root).await?);
        *guard = Some(Arc::clone(&handle));
        Ok(handle)
    }

    async fn open(root: &Path) -> Result<StoreHandle, StorageError> {
        tokio::fs::create_dir_all(root).await?;

        let marker_path = root.join(SCHEMA_FILE);
        let found = match read_optional(&marker_path).await? {
            Some(bytes) => match serde_json::from_slice::<SchemaMarker>(&bytes) {
                Ok(marker) => marker.version,
                Err(e) => {
                    // Records of unknown vintage are not worth keeping
                    warn!(error = %e, "Unreadable schema marker, resetting object cache");
                    remove_dir_if_exists(&root.join(PRODUCTS_PARTITION)).await?;
                    0
                }
            },
            None => 0,
        };

        if found > SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchema {
                found,
                supported: SCHEMA_VERSION,
            });
        }

        if found < SCHEMA_VERSION {
            Self::upgrade(root, found).await?;
            let marker = serde_json::to_vec(&SchemaMarker {
                version: SCHEMA_VERSION,
            })?;
            write_atomic(&marker_path, &marker).await?;
            info!(from = found, to = SCHEMA_VERSION, "Upgraded object cache schema");
        }

        debug!(root = %root.display(), "Opened object cache");
        Ok(StoreHandle {
            partition: root.join(PRODUCTS_PARTITION),
            version: SCHEMA_VERSION,
        })
    }

    /// Forward-only migrations; each step leaves earlier partitions alone.
    async fn upgrade(root: &Path, from: u32) -> Result<(), StorageError> {
        if from < 1 {
            tokio::fs::create_dir_all(root.join(PRODUCTS_PARTITION)).await?;
        }
        Ok(())
    }

    /// Store `value` under `key`, stamped with the current time.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        self.put_record(key, &CacheRecord::new(value)).await
    }

    /// Store a complete record, overwriting any previous one.
    pub async fn put_record<T: Serialize>(
        &self,
        key: &str,
        record: &CacheRecord<T>,
    ) -> Result<(), StorageError> {
        let handle = self.ensure_open().await?;
        let contents = serde_json::to_vec(record)?;
        write_atomic(&handle.entry_path(key), &contents).await?;
        debug!(key = key, "Cache write");
        Ok(())
    }

    /// Look up `key`. A missing key is `Ok(None)`; an unreadable record is an error.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<CacheRecord<T>>, StorageError> {
        let handle = self.ensure_open().await?;
        match read_optional(&handle.entry_path(key)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Drop every record. Used to recover from corruption, so it works on the
    /// directory directly and leaves the next operation to reopen the store.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self.handle.lock().await;
        guard.take();
        let partition = self.root.join(PRODUCTS_PARTITION);
        remove_dir_if_exists(&partition).await?;
        tokio::fs::create_dir_all(&partition).await?;
        info!("Cleared object cache");
        Ok(())
    }

    /// Release the handle. The next operation reopens the store.
    pub async fn close(&self) {
        self.handle.lock().await.take();
    }

    /// Close the store and delete everything it holds, schema marker included.
    pub async fn destroy(&self) -> Result<(), StorageError> {
        let mut guard = self.handle.lock().await;
        guard.take();
        remove_dir_if_exists(&self.root).await?;
        info!(root = %self.root.display(), "Deleted object cache");
        Ok(())
    }
}
