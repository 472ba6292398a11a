//! Application root for the shop client.
//!
//! `Shop` owns every service (API client, object and asset caches, catalog,
//! session, cart) and is the boundary the view layer talks to. It is where
//! the active user is resolved: each cart action reads the session once and
//! hands an explicit user id to the cart store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::auth::{Authenticator, Session};
use crate::cache::{AssetCache, AssetFetcher, ImageSource, ObjectCache};
use crate::cart::{CartItem, CartStore, CartTotals, QuantityChange};
use crate::catalog::{BackgroundEvent, Catalog, CatalogError, ProductSource};
use crate::config::Config;
use crate::models::{AuthUser, Product, ProductId};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background event channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Object cache directory under the cache root.
const OBJECTS_DIR: &str = "objects";

/// Image cache directory under the cache root.
const IMAGES_DIR: &str = "images";

/// Remote collaborators the shop depends on.
#[derive(Clone)]
pub struct Backends {
    pub products: Arc<dyn ProductSource>,
    pub assets: Arc<dyn AssetFetcher>,
    pub auth: Arc<dyn Authenticator>,
}

impl Backends {
    /// Use one API client for everything.
    pub fn from_client(client: ApiClient) -> Self {
        let client = Arc::new(client);
        Self {
            products: client.clone(),
            assets: client.clone(),
            auth: client,
        }
    }
}

/// Where the shop keeps its files.
#[derive(Debug, Clone)]
pub struct ShopDirs {
    /// Disposable data: catalog records and images
    pub cache: PathBuf,
    /// Durable data: cart and session
    pub data: PathBuf,
}

impl ShopDirs {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            cache: config.cache_dir()?,
            data: config.data_dir()?,
        })
    }
}

pub struct Shop {
    objects: Arc<ObjectCache>,
    assets: Arc<AssetCache>,
    catalog: Catalog,
    auth: Arc<dyn Authenticator>,
    session: Session,
    cart: CartStore,
    events_rx: mpsc::Receiver<BackgroundEvent>,
}

impl Shop {
    /// Build the shop from configuration, talking to the real feed.
    pub async fn new(config: &Config) -> Result<Self> {
        let client = ApiClient::new(config.api_base_url.clone())
            .context("Failed to create API client")?;
        let dirs = ShopDirs::from_config(config)?;
        Self::with_backends(config, Backends::from_client(client), dirs).await
    }

    pub async fn with_backends(config: &Config, backends: Backends, dirs: ShopDirs) -> Result<Self> {
        let objects = Arc::new(ObjectCache::new(dirs.cache.join(OBJECTS_DIR)));
        let assets = Arc::new(AssetCache::new(dirs.cache.join(IMAGES_DIR), backends.assets));

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let catalog = Catalog::new(
            backends.products,
            Arc::clone(&objects),
            Arc::clone(&assets),
            config.catalog_options(),
        )
        .with_events(tx);

        let mut session = Session::new(dirs.data.clone());
        if let Err(e) = session.load().await {
            warn!(error = %e, "Failed to load saved session");
        }

        let cart = CartStore::open(&dirs.data)
            .await
            .context("Failed to open cart store")?;

        info!(signed_in = session.is_authenticated(), "Shop ready");
        Ok(Self {
            objects,
            assets,
            catalog,
            auth: backends.auth,
            session,
            cart,
            events_rx: rx,
        })
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub async fn login(&mut self, username: &str, password: &str) -> Result<&AuthUser> {
        let user = self
            .auth
            .login(username, password)
            .await
            .context("Login failed")?;
        info!(user_id = user.id, "Signed in");

        self.session.update(user);
        if let Err(e) = self.session.save().await {
            warn!(error = %e, "Failed to persist session");
        }
        self.session
            .user()
            .ok_or_else(|| anyhow::anyhow!("Session missing after login"))
    }

    pub async fn logout(&mut self) -> Result<()> {
        info!("Signing out");
        self.session.clear().await.context("Failed to clear session")
    }

    pub fn current_user(&self) -> Option<&AuthUser> {
        self.session.user()
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        self.catalog.products().await
    }

    pub async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.catalog.product(id).await
    }

    /// Where to load an image from: the local copy if cached, else its URL.
    pub async fn image(&self, url: &str) -> ImageSource {
        self.assets.resolve(url).await
    }

    /// Wipe catalog records and images. Cart and session are untouched.
    pub async fn clear_caches(&self) {
        if let Err(e) = self.objects.clear().await {
            warn!(error = %e, "Failed to clear object cache");
        }
        self.assets.evict_all().await;
    }

    /// Collect background events reported since the last call.
    pub fn drain_background_events(&mut self) -> Vec<BackgroundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }
        events
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add to the signed-in user's cart. Anonymous shoppers cannot add.
    pub async fn add_to_cart(&mut self, product: &Product, quantity: u32) -> Result<QuantityChange> {
        let Some(user) = self.session.user_id() else {
            debug!(product_id = product.id, "Ignoring cart add without a signed-in user");
            return Ok(QuantityChange::Unchanged);
        };
        self.cart
            .add_item(user, product, quantity)
            .await
            .context("Failed to save cart")
    }

    pub async fn remove_from_cart(&mut self, product_id: ProductId) -> Result<QuantityChange> {
        let Some(user) = self.session.user_id() else {
            return Ok(QuantityChange::Unchanged);
        };
        self.cart
            .remove_item(user, product_id)
            .await
            .context("Failed to save cart")
    }

    pub async fn set_cart_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<QuantityChange> {
        let Some(user) = self.session.user_id() else {
            return Ok(QuantityChange::Unchanged);
        };
        self.cart
            .set_quantity(user, product_id, quantity)
            .await
            .context("Failed to save cart")
    }

    pub async fn clear_cart(&mut self) -> Result<()> {
        let Some(user) = self.session.user_id() else {
            return Ok(());
        };
        self.cart.clear(user).await.context("Failed to save cart")
    }

    /// The signed-in user's cart lines; empty when nobody is signed in.
    pub fn cart_items(&self) -> Vec<&CartItem> {
        self.session
            .user_id()
            .map(|user| self.cart.items(user))
            .unwrap_or_default()
    }

    pub fn cart_totals(&self) -> CartTotals {
        self.session
            .user_id()
            .map(|user| self.cart.totals(user))
            .unwrap_or_default()
    }

    /// Release storage handles. The shop reopens them lazily if used again.
    pub async fn shutdown(&self) {
        self.objects.close().await;
        info!("Shop shut down");
    }
}
