use serde::{Deserialize, Serialize};

/// Identifier of an authenticated shopper.
pub type UserId = u64;

/// Identity returned by `POST /auth/login`.
///
/// The cache and cart only ever read `id` from this; the rest is profile
/// data kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Newer feed versions return `accessToken`; older ones `token`.
    #[serde(alias = "accessToken")]
    pub token: String,
}

impl AuthUser {
    /// Name to greet the shopper with, falling back to the username.
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }
}
