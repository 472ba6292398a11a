use thiserror::Error;

use crate::api::ApiError;

/// The only failure the catalog reports to its callers.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Could not load {key}: network request failed and no cached copy is available ({source})")]
    NoData {
        key: String,
        #[source]
        source: ApiError,
    },
}

impl CatalogError {
    pub fn key(&self) -> &str {
        match self {
            CatalogError::NoData { key, .. } => key,
        }
    }
}
