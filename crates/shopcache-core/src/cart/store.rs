//! Per-user shopping carts with stock-bounded quantities.
//!
//! The whole store is persisted as one JSON document after every mutation
//! that changes it. Every mutation takes the user id explicitly; resolving
//! the signed-in user is the caller's job.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{read_optional, write_atomic, StorageError};
use crate::models::{Product, ProductId, UserId};

/// File holding the persisted store.
const CART_STORE_FILE: &str = "cart-store.json";

/// A line in a cart. `quantity` is always between 1 and `product.stock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.product.effective_price() * f64::from(self.quantity)
    }

    pub fn line_savings(&self) -> f64 {
        (self.product.price - self.product.effective_price()) * f64::from(self.quantity)
    }
}

/// One user's cart, ordered by product id.
pub type UserCart = BTreeMap<ProductId, CartItem>;

/// What a mutation did to a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// The line now holds `quantity`; `clamped` if stock cut the request short.
    Set { quantity: u32, clamped: bool },
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CartTotals {
    /// Number of distinct lines
    pub item_count: usize,
    /// Sum of quantities
    pub unit_count: u64,
    pub subtotal: f64,
    pub original_total: f64,
    pub savings: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CartSnapshot {
    #[serde(rename = "userCarts", default)]
    user_carts: BTreeMap<UserId, UserCart>,
}

pub struct CartStore {
    path: PathBuf,
    snapshot: CartSnapshot,
}

impl CartStore {
    /// Load the store from `dir`, starting empty if nothing was saved yet.
    ///
    /// An unreadable snapshot is logged and replaced by an empty store on the
    /// next write.
    pub async fn open(dir: &Path) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(CART_STORE_FILE);

        let snapshot = match read_optional(&path).await? {
            Some(bytes) => match serde_json::from_slice::<CartSnapshot>(&bytes) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cart snapshot unreadable, starting empty");
                    CartSnapshot::default()
                }
            },
            None => CartSnapshot::default(),
        };

        debug!(users = snapshot.user_carts.len(), "Loaded cart store");
        Ok(Self { path, snapshot })
    }

    async fn persist(&self) -> Result<(), StorageError> {
        let contents = serde_json::to_vec_pretty(&self.snapshot)?;
        write_atomic(&self.path, &contents).await?;
        Ok(())
    }

    /// Add `quantity` of `product`, merging with any existing line and
    /// clamping the total to the product's stock.
    ///
    /// The stored snapshot is replaced by `product`, so the latest stock
    /// count applies.
    pub async fn add_item(
        &mut self,
        user: UserId,
        product: &Product,
        quantity: u32,
    ) -> Result<QuantityChange, StorageError> {
        if quantity == 0 {
            return Ok(QuantityChange::Unchanged);
        }

        let current = self.quantity_of(user, product.id);
        let requested = current.saturating_add(quantity);
        let next = requested.min(product.stock);

        let change = if next == 0 {
            let removed = self
                .snapshot
                .user_carts
                .get_mut(&user)
                .and_then(|cart| cart.remove(&product.id));
            match removed {
                Some(_) => QuantityChange::Removed,
                None => return Ok(QuantityChange::Unchanged),
            }
        } else {
            self.snapshot.user_carts.entry(user).or_default().insert(
                product.id,
                CartItem {
                    product: product.clone(),
                    quantity: next,
                },
            );
            QuantityChange::Set {
                quantity: next,
                clamped: requested > next,
            }
        };

        debug!(user, product_id = product.id, ?change, "Cart add");
        self.persist().await?;
        Ok(change)
    }

    /// Delete the line for `product_id`, if any.
    pub async fn remove_item(
        &mut self,
        user: UserId,
        product_id: ProductId,
    ) -> Result<QuantityChange, StorageError> {
        let removed = self
            .snapshot
            .user_carts
            .get_mut(&user)
            .and_then(|cart| cart.remove(&product_id))
            .is_some();

        if !removed {
            return Ok(QuantityChange::Unchanged);
        }
        debug!(user, product_id, "Cart remove");
        self.persist().await?;
        Ok(QuantityChange::Removed)
    }

    /// Overwrite the quantity of an existing line, clamped to stock.
    ///
    /// Zero removes the line. Products without a line are left alone.
    pub async fn set_quantity(
        &mut self,
        user: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<QuantityChange, StorageError> {
        if quantity == 0 {
            return self.remove_item(user, product_id).await;
        }

        let Some(item) = self
            .snapshot
            .user_carts
            .get_mut(&user)
            .and_then(|cart| cart.get_mut(&product_id))
        else {
            return Ok(QuantityChange::Unchanged);
        };

        let next = quantity.min(item.product.stock);
        if next == 0 {
            return self.remove_item(user, product_id).await;
        }
        item.quantity = next;

        let change = QuantityChange::Set {
            quantity: next,
            clamped: quantity > next,
        };
        debug!(user, product_id, ?change, "Cart set quantity");
        self.persist().await?;
        Ok(change)
    }

    /// Empty the user's cart. The (now empty) partition is kept.
    pub async fn clear(&mut self, user: UserId) -> Result<(), StorageError> {
        self.snapshot.user_carts.insert(user, UserCart::new());
        debug!(user, "Cart cleared");
        self.persist().await
    }

    pub fn cart(&self, user: UserId) -> Option<&UserCart> {
        self.snapshot.user_carts.get(&user)
    }

    /// The user's lines in product id order.
    pub fn items(&self, user: UserId) -> Vec<&CartItem> {
        self.cart(user)
            .map(|cart| cart.values().collect())
            .unwrap_or_default()
    }

    pub fn quantity_of(&self, user: UserId, product_id: ProductId) -> u32 {
        self.cart(user)
            .and_then(|cart| cart.get(&product_id))
            .map(|item| item.quantity)
            .unwrap_or(0)
    }

    pub fn totals(&self, user: UserId) -> CartTotals {
        self.items(user)
            .into_iter()
            .fold(CartTotals::default(), |mut totals, item| {
                totals.item_count += 1;
                totals.unit_count += u64::from(item.quantity);
                totals.subtotal += item.line_total();
                totals.original_total += item.product.price * f64::from(item.quantity);
                totals.savings += item.line_savings();
                totals
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::sample_product;
    use tempfile::TempDir;

    const ALICE: UserId = 1;
    const BOB: UserId = 2;

    async fn store_in(dir: &TempDir) -> CartStore {
        CartStore::open(dir.path()).await.expect("open cart store")
    }

    #[tokio::test]
    async fn test_add_merges_and_clamps_to_stock() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        let product = sample_product(10, 3);

        let first = store.add_item(ALICE, &product, 2).await.expect("add");
        assert_eq!(first, QuantityChange::Set { quantity: 2, clamped: false });

        let second = store.add_item(ALICE, &product, 5).await.expect("add");
        assert_eq!(second, QuantityChange::Set { quantity: 3, clamped: true });
        assert_eq!(store.quantity_of(ALICE, 10), 3);
    }

    #[tokio::test]
    async fn test_quantity_never_exceeds_stock() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        let product = sample_product(1, 4);

        for step in [1u32, 3, 7, 2, 0, 9, 4] {
            store.add_item(ALICE, &product, step).await.expect("add");
            assert!(store.quantity_of(ALICE, 1) <= 4);
            store.set_quantity(ALICE, 1, step * 2).await.expect("set");
            assert!(store.quantity_of(ALICE, 1) <= 4);
        }
    }

    #[tokio::test]
    async fn test_out_of_stock_product_is_not_added() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;

        let change = store.add_item(ALICE, &sample_product(1, 0), 1).await.expect("add");
        assert_eq!(change, QuantityChange::Unchanged);
        assert!(store.items(ALICE).is_empty());
        // No partition is created for a rejected add, in memory or on disk
        assert!(store.cart(ALICE).is_none());
        let reopened = store_in(&dir).await;
        assert!(reopened.cart(ALICE).is_none());
    }

    #[tokio::test]
    async fn test_unit_count_does_not_overflow() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        store.add_item(ALICE, &sample_product(1, u32::MAX), u32::MAX).await.expect("add");
        store.add_item(ALICE, &sample_product(2, u32::MAX), u32::MAX).await.expect("add");

        let totals = store.totals(ALICE);
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.unit_count, 2 * u64::from(u32::MAX));
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_line() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        store.add_item(ALICE, &sample_product(1, 5), 2).await.expect("add");
        store.add_item(ALICE, &sample_product(2, 5), 1).await.expect("add");

        let change = store.set_quantity(ALICE, 1, 0).await.expect("set");
        assert_eq!(change, QuantityChange::Removed);

        let ids: Vec<ProductId> = store.items(ALICE).iter().map(|i| i.product.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_set_quantity_never_creates_lines() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;

        let change = store.set_quantity(ALICE, 1, 3).await.expect("set");
        assert_eq!(change, QuantityChange::Unchanged);
        assert!(store.cart(ALICE).is_none());
    }

    #[tokio::test]
    async fn test_set_quantity_clamps() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        store.add_item(ALICE, &sample_product(1, 5), 1).await.expect("add");

        let change = store.set_quantity(ALICE, 1, 50).await.expect("set");
        assert_eq!(change, QuantityChange::Set { quantity: 5, clamped: true });
    }

    #[tokio::test]
    async fn test_remove_missing_line_is_noop() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        assert_eq!(
            store.remove_item(ALICE, 99).await.expect("remove"),
            QuantityChange::Unchanged
        );
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        store.add_item(ALICE, &sample_product(1, 5), 2).await.expect("add");
        store.add_item(BOB, &sample_product(2, 5), 1).await.expect("add");

        store.set_quantity(ALICE, 2, 4).await.expect("set");
        store.remove_item(ALICE, 2).await.expect("remove");
        store.clear(ALICE).await.expect("clear");

        assert!(store.items(ALICE).is_empty());
        let bob: Vec<ProductId> = store.items(BOB).iter().map(|i| i.product.id).collect();
        assert_eq!(bob, vec![2]);
        assert_eq!(store.quantity_of(BOB, 2), 1);
    }

    #[tokio::test]
    async fn test_clear_keeps_empty_partition() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        store.add_item(ALICE, &sample_product(1, 5), 2).await.expect("add");

        store.clear(ALICE).await.expect("clear");
        assert_eq!(store.cart(ALICE).map(|c| c.len()), Some(0));
    }

    #[tokio::test]
    async fn test_items_are_ordered_by_product_id() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        for id in [30, 4, 12] {
            store.add_item(ALICE, &sample_product(id, 5), 1).await.expect("add");
        }
        let ids: Vec<ProductId> = store.items(ALICE).iter().map(|i| i.product.id).collect();
        assert_eq!(ids, vec![4, 12, 30]);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().expect("tempdir");
        {
            let mut store = store_in(&dir).await;
            store.add_item(ALICE, &sample_product(1, 5), 2).await.expect("add");
            store.add_item(BOB, &sample_product(2, 5), 3).await.expect("add");
        }

        let reopened = store_in(&dir).await;
        assert_eq!(reopened.quantity_of(ALICE, 1), 2);
        assert_eq!(reopened.quantity_of(BOB, 2), 3);

        let raw = std::fs::read_to_string(dir.path().join(CART_STORE_FILE)).expect("snapshot");
        assert!(raw.contains("userCarts"));
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_starts_empty() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(CART_STORE_FILE), b"{broken").expect("seed");

        let mut store = store_in(&dir).await;
        assert!(store.items(ALICE).is_empty());
        store.add_item(ALICE, &sample_product(1, 5), 1).await.expect("add");
        assert_eq!(store_in(&dir).await.quantity_of(ALICE, 1), 1);
    }

    #[tokio::test]
    async fn test_totals() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir).await;
        // sample products cost 100.0 with a 10% discount
        store.add_item(ALICE, &sample_product(1, 5), 2).await.expect("add");
        store.add_item(ALICE, &sample_product(2, 5), 1).await.expect("add");

        let totals = store.totals(ALICE);
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.unit_count, 3);
        assert!((totals.subtotal - 270.0).abs() < 1e-9);
        assert!((totals.original_total - 300.0).abs() < 1e-9);
        assert!((totals.savings - 30.0).abs() < 1e-9);

        assert_eq!(store.totals(BOB), CartTotals::default());
    }
}
