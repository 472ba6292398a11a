//! API client for the remote product feed.
//!
//! This module provides the `ApiClient` struct for fetching the catalog,
//! single products, raw image bytes, and for logging a shopper in.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::Authenticator;
use crate::cache::AssetFetcher;
use crate::catalog::ProductSource;
use crate::models::{AuthUser, Product, ProductId, ProductsResponse};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Lifetime requested for login tokens.
const TOKEN_EXPIRY_MINUTES: u32 = 60;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_IMAGE: &str = "image/*";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    expires_in_mins: u32,
}

/// API client for the product feed.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn products_url(&self, limit: usize) -> String {
        format!("{}/products?limit={}", self.base_url, limit)
    }

    fn product_url(&self, id: ProductId) -> String {
        format!("{}/products/{}", self.base_url, id)
    }

    fn login_url(&self) -> String {
        format!("{}/auth/login", self.base_url)
    }

    /// Authenticate against the feed and return the shopper's identity
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthUser, ApiError> {
        let body = LoginRequest {
            username,
            password,
            expires_in_mins: TOKEN_EXPIRY_MINUTES,
        };

        let response = self
            .client
            .post(self.login_url())
            .header(header::ACCEPT, ACCEPT_JSON)
            .json(&body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let user: AuthUser = response.json().await?;
        debug!(user_id = user.id, "Login succeeded");
        Ok(user)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    fn get_request(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        self.client.get(url).header(header::ACCEPT, accept)
    }

    /// Send a GET, backing off and retrying while the server rate limits us.
    async fn send_get(&self, url: &str, accept: &str) -> Result<reqwest::Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.get_request(url, accept).send().await?;

            if response.status() != reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Self::check_response(response).await;
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2; // Exponential backoff
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send_get(url, ACCEPT_JSON).await?;
        Ok(response.json().await?)
    }

    // ===== Data Fetching Methods =====

    /// Fetch the first `limit` products of the catalog
    pub async fn fetch_products(&self, limit: usize) -> Result<Vec<Product>, ApiError> {
        let url = self.products_url(limit);
        let response: ProductsResponse = self.get(&url).await?;
        debug!(count = response.products.len(), "Fetched product list");
        Ok(response.products)
    }

    /// Fetch a single product by id
    pub async fn fetch_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let url = self.product_url(id);
        self.get(&url).await
    }

    /// Fetch raw bytes from an absolute URL (product images)
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.send_get(url, ACCEPT_IMAGE).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ProductSource for ApiClient {
    async fn fetch_products(&self, limit: usize) -> Result<Vec<Product>, ApiError> {
        ApiClient::fetch_products(self, limit).await
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Product, ApiError> {
        ApiClient::fetch_product(self, id).await
    }
}

#[async_trait]
impl Authenticator for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<AuthUser, ApiError> {
        ApiClient::login(self, username, password).await
    }
}

#[async_trait]
impl AssetFetcher for ApiClient {
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.fetch_bytes(url).await
    }
}
