//! Authentication state for the shopper.
//!
//! This module provides:
//! - `Authenticator`: the login call, implemented by `ApiClient`
//! - `Session`: the signed-in `AuthUser`, persisted to disk
//!
//! The cart never reads the session directly; the application root resolves
//! the active user id from it once per action.

pub mod login;
pub mod session;

pub use login::Authenticator;
pub use session::{Session, SessionData};
