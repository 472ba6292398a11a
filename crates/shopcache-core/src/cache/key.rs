use std::fmt;

use crate::models::ProductId;

/// Key of a record in the object cache.
///
/// Keys are opaque to the store; this type only fixes how the catalog names
/// its two kinds of records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The full catalog snapshot (`list:default`)
    ProductList,
    /// A single product (`item:<id>`)
    Product(ProductId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::ProductList => write!(f, "list:default"),
            CacheKey::Product(id) => write!(f, "item:{}", id),
        }
    }
}
