use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::AuthUser;

/// Exchanges credentials for an identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<AuthUser, ApiError>;
}
