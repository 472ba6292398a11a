use thiserror::Error;

use crate::api::ApiError;

/// Failure of the underlying storage medium (object cache or cart snapshot).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt stored data: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Stored schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
}

/// Failure to fetch or store an image. Logged by the asset cache, never returned.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to fetch asset: {0}")]
    Fetch(#[from] ApiError),

    #[error("Asset storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
