use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::{Product, ProductId};

/// Remote origin of catalog data.
///
/// Any failure, including a non-success status, is an `ApiError` and is
/// treated by the catalog as a network failure.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_products(&self, limit: usize) -> Result<Vec<Product>, ApiError>;

    async fn fetch_product(&self, id: ProductId) -> Result<Product, ApiError>;
}
