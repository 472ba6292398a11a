//! Binary asset cache for product images.
//!
//! Image bytes are stored one file per source URL, named by the SHA-256 of
//! the URL. Every failure here is logged and swallowed: an image that cannot
//! be cached is simply loaded from its original URL.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::api::ApiError;

use super::error::AssetError;
use super::fs::{remove_dir_if_exists, write_atomic};

/// Maximum number of image downloads in flight for one batch.
const MAX_CONCURRENT_DOWNLOADS: usize = 6;

/// Source of image bytes.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}

/// Where an image should be loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Local copy of the image
    Cached(PathBuf),
    /// Not cached; load directly from the original URL
    Remote(String),
}

impl ImageSource {
    pub fn is_cached(&self) -> bool {
        matches!(self, ImageSource::Cached(_))
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Cached(path) => write!(f, "file://{}", path.display()),
            ImageSource::Remote(url) => write!(f, "{}", url),
        }
    }
}

pub struct AssetCache {
    root: PathBuf,
    fetcher: Arc<dyn AssetFetcher>,
    opened: OnceCell<()>,
}

impl AssetCache {
    pub fn new(root: PathBuf, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            root,
            fetcher,
            opened: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn ensure_open(&self) -> Result<(), AssetError> {
        self.opened
            .get_or_try_init(|| async {
                tokio::fs::create_dir_all(&self.root).await?;
                debug!(root = %self.root.display(), "Opened asset cache");
                Ok::<(), AssetError>(())
            })
            .await?;
        Ok(())
    }

    fn asset_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.root.join(hex::encode(digest))
    }

    /// Fetch and store `url`. Already-cached URLs are left alone.
    ///
    /// Returns whether the asset is cached afterwards; failures are logged.
    pub async fn cache(&self, url: &str) -> bool {
        match self.try_cache(url).await {
            Ok(fetched) => {
                if fetched {
                    debug!(url = url, "Cached image");
                }
                true
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to cache image");
                false
            }
        }
    }

    async fn try_cache(&self, url: &str) -> Result<bool, AssetError> {
        self.ensure_open().await?;
        let path = self.asset_path(url);
        if tokio::fs::try_exists(&path).await? {
            return Ok(false);
        }
        let bytes = self.fetcher.fetch_asset(url).await?;
        tokio::fs::create_dir_all(&self.root).await?;
        write_atomic(&path, &bytes).await?;
        Ok(true)
    }

    /// Cache a batch of URLs with bounded concurrency. Returns how many are cached.
    pub async fn cache_all(&self, urls: &[String]) -> usize {
        let results: Vec<bool> = stream::iter(urls.iter().cloned())
            .map(|url| async move { self.cache(&url).await })
            .buffer_unordered(MAX_CONCURRENT_DOWNLOADS)
            .collect()
            .await;
        results.into_iter().filter(|cached| *cached).count()
    }

    pub async fn is_cached(&self, url: &str) -> bool {
        tokio::fs::try_exists(self.asset_path(url))
            .await
            .unwrap_or(false)
    }

    /// Local copy of `url` if one exists, otherwise the URL itself.
    pub async fn resolve(&self, url: &str) -> ImageSource {
        if self.is_cached(url).await {
            ImageSource::Cached(self.asset_path(url))
        } else {
            ImageSource::Remote(url.to_string())
        }
    }

    /// Drop every cached asset.
    pub async fn evict_all(&self) {
        match remove_dir_if_exists(&self.root).await {
            Ok(()) => info!("Cleared image cache"),
            Err(e) => warn!(error = %e, "Failed to clear image cache"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Serves `png:<url>` for any URL not containing "broken".
    #[derive(Default)]
    struct FakeFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssetFetcher for FakeFetcher {
        async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("broken") {
                Err(ApiError::NotFound(url.to_string()))
            } else {
                Ok(format!("png:{}", url).into_bytes())
            }
        }
    }

    fn cache_in(dir: &TempDir) -> (AssetCache, Arc<FakeFetcher>) {
        let fetcher = Arc::new(FakeFetcher::default());
        let cache = AssetCache::new(dir.path().join("images"), fetcher.clone());
        (cache, fetcher)
    }

    #[tokio::test]
    async fn test_resolve_uncached_returns_original_url() {
        let dir = TempDir::new().expect("tempdir");
        let (cache, _) = cache_in(&dir);
        let url = "https://cdn.example.com/a.png";
        assert_eq!(cache.resolve(url).await, ImageSource::Remote(url.to_string()));
    }

    #[tokio::test]
    async fn test_cache_then_resolve_local_copy() {
        let dir = TempDir::new().expect("tempdir");
        let (cache, _) = cache_in(&dir);
        let url = "https://cdn.example.com/a.png";

        assert!(cache.cache(url).await);
        let source = cache.resolve(url).await;
        assert!(source.is_cached());
        if let ImageSource::Cached(path) = source {
            let bytes = std::fs::read(path).expect("read cached");
            assert_eq!(bytes, format!("png:{}", url).into_bytes());
        }
    }

    #[tokio::test]
    async fn test_recache_is_noop() {
        let dir = TempDir::new().expect("tempdir");
        let (cache, fetcher) = cache_in(&dir);
        let url = "https://cdn.example.com/a.png";

        assert!(cache.cache(url).await);
        assert!(cache.cache(url).await);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_swallowed() {
        let dir = TempDir::new().expect("tempdir");
        let (cache, _) = cache_in(&dir);
        let url = "https://cdn.example.com/broken.png";

        assert!(!cache.cache(url).await);
        assert_eq!(cache.resolve(url).await, ImageSource::Remote(url.to_string()));
    }

    #[tokio::test]
    async fn test_cache_all_counts_successes() {
        let dir = TempDir::new().expect("tempdir");
        let (cache, _) = cache_in(&dir);
        let urls = vec![
            "https://cdn.example.com/1.png".to_string(),
            "https://cdn.example.com/broken.png".to_string(),
            "https://cdn.example.com/2.png".to_string(),
        ];
        assert_eq!(cache.cache_all(&urls).await, 2);
    }

    #[tokio::test]
    async fn test_cache_all_runs_on_spawned_task() {
        let dir = TempDir::new().expect("tempdir");
        let (cache, fetcher) = cache_in(&dir);
        let cache = Arc::new(cache);
        let urls: Vec<String> = (0..10)
            .map(|i| format!("https://cdn.example.com/{}.png", i))
            .collect();

        let task_cache = cache.clone();
        let task_urls = urls.clone();
        let cached = tokio::spawn(async move { task_cache.cache_all(&task_urls).await })
            .await
            .expect("join");

        assert_eq!(cached, 10);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 10);
        for url in &urls {
            assert!(cache.is_cached(url).await);
        }
    }

    #[tokio::test]
    async fn test_evict_all_then_cache_again() {
        let dir = TempDir::new().expect("tempdir");
        let (cache, fetcher) = cache_in(&dir);
        let url = "https://cdn.example.com/a.png";

        cache.cache(url).await;
        cache.evict_all().await;
        assert!(!cache.is_cached(url).await);

        assert!(cache.cache(url).await);
        assert!(cache.is_cached(url).await);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_image_source_display() {
        let remote = ImageSource::Remote("https://cdn.example.com/a.png".to_string());
        assert_eq!(remote.to_string(), "https://cdn.example.com/a.png");
        let local = ImageSource::Cached(PathBuf::from("/tmp/abc"));
        assert_eq!(local.to_string(), "file:///tmp/abc");
    }
}
