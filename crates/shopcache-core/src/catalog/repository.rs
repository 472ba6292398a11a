//! Cache-first data access for the product catalog.
//!
//! Every read follows the same policy, whatever the key:
//! 1. A fresh cached record is returned at once and a background
//!    revalidation is spawned.
//! 2. Otherwise the source is asked; the result is written through to the
//!    cache and its images are cached in the background.
//! 3. If the source fails, any cached record is returned regardless of age.
//!    Only when there is none does the read fail with `CatalogError::NoData`.
//!
//! A cache read error is treated as a miss and the whole object cache is
//! cleared before going to the network.

use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::cache::{AssetCache, CacheKey, ObjectCache};
use crate::models::{ImageUrls, Product, ProductId};

use super::events::{BackgroundEvent, EventSink};
use super::{CatalogError, ProductSource};

/// Records younger than this are served without waiting on the network.
pub const DEFAULT_TTL_MINUTES: i64 = 10;

/// Number of products requested for the catalog listing.
pub const DEFAULT_LIST_LIMIT: usize = 30;

#[derive(Debug, Clone, Copy)]
pub struct CatalogOptions {
    pub ttl: Duration,
    pub list_limit: usize,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// Clone is cheap; every clone shares the same source and stores.
#[derive(Clone)]
pub struct Catalog {
    source: Arc<dyn ProductSource>,
    cache: Arc<ObjectCache>,
    assets: Arc<AssetCache>,
    options: CatalogOptions,
    events: EventSink,
}

impl Catalog {
    pub fn new(
        source: Arc<dyn ProductSource>,
        cache: Arc<ObjectCache>,
        assets: Arc<AssetCache>,
        options: CatalogOptions,
    ) -> Self {
        Self {
            source,
            cache,
            assets,
            options,
            events: EventSink::default(),
        }
    }

    /// Report background outcomes on `tx` in addition to logging them.
    pub fn with_events(mut self, tx: mpsc::Sender<BackgroundEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    /// The catalog listing (`list:default`).
    pub async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        let limit = self.options.list_limit;
        self.load(CacheKey::ProductList, move |source| async move {
            source.fetch_products(limit).await
        })
        .await
    }

    /// A single product (`item:<id>`).
    pub async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.load(CacheKey::Product(id), move |source| async move {
            source.fetch_product(id).await
        })
        .await
    }

    /// Read `key` under the cache-first policy, using `fetch` for the network.
    pub async fn load<T, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, CatalogError>
    where
        T: Serialize + DeserializeOwned + ImageUrls + Send + Sync + 'static,
        F: Fn(Arc<dyn ProductSource>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let name = key.to_string();

        match self.cache.get::<T>(&name).await {
            Ok(Some(record)) if record.is_fresh(self.options.ttl) => {
                debug!(key = %name, "Cache hit (fresh)");
                self.spawn_revalidation(name, fetch);
                return Ok(record.data);
            }
            Ok(Some(_)) => debug!(key = %name, "Cache hit (stale)"),
            Ok(None) => debug!(key = %name, "Cache miss"),
            Err(e) => {
                warn!(key = %name, error = %e, "Cache read failed, clearing cache");
                if let Err(e) = self.cache.clear().await {
                    warn!(error = %e, "Failed to clear cache");
                }
            }
        }

        match fetch(Arc::clone(&self.source)).await {
            Ok(value) => {
                self.write_through(&name, &value).await;
                Ok(value)
            }
            Err(e) => {
                warn!(key = %name, error = %e, "Fetch failed, falling back to cache");
                match self.cache.get::<T>(&name).await {
                    Ok(Some(record)) => {
                        info!(key = %name, cached_at = %record.ts, "Serving stale cached data");
                        Ok(record.data)
                    }
                    Ok(None) => Err(CatalogError::NoData { key: name, source: e }),
                    Err(cache_err) => {
                        warn!(key = %name, error = %cache_err, "Cache fallback read failed");
                        Err(CatalogError::NoData { key: name, source: e })
                    }
                }
            }
        }
    }

    /// Store a freshly fetched value. A failed write is logged, never returned.
    async fn write_through<T>(&self, name: &str, value: &T)
    where
        T: Serialize + ImageUrls + Sync,
    {
        if let Err(e) = self.cache.put(name, value).await {
            warn!(key = name, error = %e, "Failed to cache fetched data");
        }
        self.spawn_asset_caching(name.to_string(), value.image_urls());
    }

    fn spawn_revalidation<T, F, Fut>(&self, name: String, fetch: F)
    where
        T: Serialize + ImageUrls + Send + Sync + 'static,
        F: Fn(Arc<dyn ProductSource>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let catalog = self.clone();

        tokio::spawn(async move {
            let outcome = match fetch(Arc::clone(&catalog.source)).await {
                Ok(value) => match catalog.cache.put(&name, &value).await {
                    Ok(()) => {
                        catalog.spawn_asset_caching(name.clone(), value.image_urls());
                        Ok(())
                    }
                    Err(e) => Err(e.to_string()),
                },
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(()) => {
                    debug!(key = %name, "Revalidated cache entry");
                    catalog.events.send(BackgroundEvent::Revalidated { key: name });
                }
                Err(error) => {
                    warn!(key = %name, error = %error, "Background revalidation failed");
                    catalog
                        .events
                        .send(BackgroundEvent::RevalidationFailed { key: name, error });
                }
            }
        });
    }

    fn spawn_asset_caching(&self, name: String, urls: Vec<String>) {
        if urls.is_empty() {
            return;
        }
        let assets = Arc::clone(&self.assets);
        let events = self.events.clone();

        tokio::spawn(async move {
            let requested = urls.len();
            let cached = assets.cache_all(&urls).await;
            debug!(key = %name, cached, requested, "Image caching finished");
            events.send(BackgroundEvent::AssetsCached {
                key: name,
                cached,
                requested,
            });
        });
    }
}
