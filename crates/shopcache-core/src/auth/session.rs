use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{read_optional, write_atomic, StorageError};
use crate::models::{AuthUser, UserId};

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user: AuthUser,
    pub signed_in_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user: AuthUser) -> Self {
        Self {
            user,
            signed_in_at: Utc::now(),
        }
    }
}

/// The signed-in shopper, persisted across restarts.
///
/// Only the user id is consumed by the cart; the token is attached to API
/// requests as-is.
pub struct Session {
    data_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            data: None,
        }
    }

    /// Load session from disk. Returns whether a session was restored.
    pub async fn load(&mut self) -> Result<bool, StorageError> {
        let Some(bytes) = read_optional(&self.session_path()).await? else {
            return Ok(false);
        };
        match serde_json::from_slice::<SessionData>(&bytes) {
            Ok(data) => {
                debug!(user_id = data.user.id, "Restored session");
                self.data = Some(data);
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Session file unreadable, ignoring it");
                Ok(false)
            }
        }
    }

    /// Save session to disk
    pub async fn save(&self) -> Result<(), StorageError> {
        if let Some(ref data) = self.data {
            tokio::fs::create_dir_all(&self.data_dir).await?;
            let contents = serde_json::to_vec_pretty(data)?;
            write_atomic(&self.session_path(), &contents).await?;
        }
        Ok(())
    }

    /// Clear session data (logout)
    pub async fn clear(&mut self) -> Result<(), StorageError> {
        self.data = None;
        match tokio::fs::remove_file(self.session_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Update session with a freshly signed-in user
    pub fn update(&mut self, user: AuthUser) {
        self.data = Some(SessionData::new(user));
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.data.as_ref().map(|d| &d.user)
    }

    /// Get the bearer token if signed in
    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.user.token.as_str())
    }

    /// The active user id, read at the moment of the call
    pub fn user_id(&self) -> Option<UserId> {
        self.data.as_ref().map(|d| d.user.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.is_some()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }
}
