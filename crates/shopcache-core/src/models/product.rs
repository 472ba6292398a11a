use serde::{Deserialize, Serialize};

/// Identifier of a catalog product as assigned by the feed.
pub type ProductId = u64;

/// Threshold at or below which a product is shown as low stock.
const LOW_STOCK_THRESHOLD: u32 = 5;

/// Label the feed uses for products it flags as running out.
const LOW_STOCK_LABEL: &str = "Low Stock";

/// A catalog product as returned by the product feed.
///
/// Products are never mutated locally. The cache stores them wholesale and
/// replaces them wholesale on revalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub rating: f64,
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub warranty_information: String,
    #[serde(default)]
    pub shipping_information: String,
    #[serde(default)]
    pub availability_status: String,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub return_policy: String,
    #[serde(default)]
    pub meta: Option<ProductMeta>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub reviewer_name: String,
    #[serde(default)]
    pub reviewer_email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ProductMeta {
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub barcode: String,
    #[serde(default)]
    pub qr_code: String,
}

/// Wrapper for the collection endpoint (`GET /products?limit=N`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsResponse {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockStatus::InStock => write!(f, "In Stock"),
            StockStatus::LowStock => write!(f, "Low Stock"),
            StockStatus::OutOfStock => write!(f, "Out of Stock"),
        }
    }
}

impl Product {
    /// Price after applying the discount percentage.
    pub fn effective_price(&self) -> f64 {
        self.price - (self.price * self.discount_percentage / 100.0)
    }

    pub fn has_discount(&self) -> bool {
        self.discount_percentage > 0.0
    }

    pub fn stock_status(&self) -> StockStatus {
        if self.stock == 0 {
            StockStatus::OutOfStock
        } else if self.stock <= LOW_STOCK_THRESHOLD || self.availability_status == LOW_STOCK_LABEL {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Values that reference remote images worth caching alongside them.
pub trait ImageUrls {
    fn image_urls(&self) -> Vec<String>;
}

/// Thumbnail followed by the gallery, without duplicates or blanks.
impl ImageUrls for Product {
    fn image_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::with_capacity(self.images.len() + 1);
        for url in std::iter::once(&self.thumbnail).chain(self.images.iter()) {
            if !url.is_empty() && !urls.contains(url) {
                urls.push(url.clone());
            }
        }
        urls
    }
}

/// Catalog listings only render thumbnails, so only those are prefetched.
impl ImageUrls for Vec<Product> {
    fn image_urls(&self) -> Vec<String> {
        self.iter()
            .map(|p| p.thumbnail.clone())
            .filter(|url| !url.is_empty())
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_product(id: ProductId, stock: u32) -> Product {
    Product {
        id,
        title: format!("Product {}", id),
        description: String::new(),
        price: 100.0,
        discount_percentage: 10.0,
        rating: 4.5,
        stock,
        category: "beauty".to_string(),
        tags: vec!["beauty".to_string()],
        brand: Some("Essence".to_string()),
        sku: format!("SKU-{}", id),
        weight: 1.0,
        warranty_information: String::new(),
        shipping_information: String::new(),
        availability_status: "In Stock".to_string(),
        reviews: Vec::new(),
        return_policy: String::new(),
        meta: None,
        thumbnail: format!("https://cdn.example.com/{}/thumbnail.png", id),
        images: vec![format!("https://cdn.example.com/{}/1.png", id)],
    }
}
