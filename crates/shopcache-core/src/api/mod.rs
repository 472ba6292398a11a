//! REST API client module for the product feed.
//!
//! This module provides the `ApiClient` for fetching the catalog, single
//! products and image bytes, and for the login call. Failures are reported
//! as `ApiError`, which the catalog treats as a network failure.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
