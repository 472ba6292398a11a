//! Catalog data access: the single entry point for "get me product X".
//!
//! `Catalog` combines a `ProductSource` (the network), the `ObjectCache`
//! and the `AssetCache` under a stale-while-revalidate policy. See
//! `repository` for the exact read algorithm.

pub mod error;
pub mod events;
pub mod guard;
pub mod repository;
pub mod source;

pub use error::CatalogError;
pub use events::BackgroundEvent;
pub use guard::RequestGuard;
pub use repository::{Catalog, CatalogOptions, DEFAULT_LIST_LIMIT, DEFAULT_TTL_MINUTES};
pub use source::ProductSource;
