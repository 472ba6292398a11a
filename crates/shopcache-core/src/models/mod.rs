//! Data models for catalog entities and shopper identity.
//!
//! - `Product`: a catalog entry as served by the product feed
//! - `AuthUser`: the identity returned on login, used only as a cart key

pub mod product;
pub mod user;

pub use product::{ImageUrls, Product, ProductId, ProductMeta, ProductsResponse, Review, StockStatus};
pub use user::{AuthUser, UserId};
