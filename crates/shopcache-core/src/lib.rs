//! Shopcache core - offline-first product catalog client.
//!
//! This crate holds the client-side caching and state layer of a shop app:
//!
//! - `cache`: the structured object cache and the image asset cache
//! - `catalog`: cache-first, stale-while-revalidate reads of the product feed
//! - `cart`: per-user carts bounded by product stock, persisted on change
//! - `auth`: the signed-in session
//! - `api`: the HTTP client for the product feed
//! - `app`: `Shop`, the application root wiring all of the above
//!
//! Views are expected to talk to `Shop` only.

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod models;

pub use app::{Backends, Shop, ShopDirs};
pub use config::Config;
