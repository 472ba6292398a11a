//! Local caching module for offline data access.
//!
//! Two independent stores live here:
//! - `ObjectCache`: timestamped JSON records (`CacheRecord`) keyed by string,
//!   with a forward-only schema version
//! - `AssetCache`: raw image bytes keyed by source URL, best-effort only
//!
//! Freshness is decided by the caller from the record's timestamp; neither
//! store expires anything on its own.

pub mod assets;
pub mod error;
mod fs;
pub mod key;
pub mod object_store;
pub mod record;

pub(crate) use fs::{read_optional, write_atomic};

pub use assets::{AssetCache, AssetFetcher, ImageSource};
pub use error::{AssetError, StorageError};
pub use key::CacheKey;
pub use object_store::{ObjectCache, StoreHandle, SCHEMA_VERSION};
pub use record::CacheRecord;
