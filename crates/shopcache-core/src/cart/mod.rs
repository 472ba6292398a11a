//! Shopping cart state, partitioned by user.
//!
//! `CartStore` owns every user's cart and keeps each line's quantity within
//! the product's stock. State is persisted on every change.

pub mod store;

pub use store::{CartItem, CartStore, CartTotals, QuantityChange, UserCart};
