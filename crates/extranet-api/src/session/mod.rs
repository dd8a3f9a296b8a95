//! Login sessions.
//!
//! A session maps a random id (sent to the browser in a signed cookie) to a
//! user id. Storage is behind [`SessionStore`]: in memory by default, Redis
//! when the `redis` feature is enabled and a URL is configured.

pub mod extract;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod signer;

use async_trait::async_trait;
use extranet_core::UserId;

use crate::domain::error::ServerError;

pub use extract::{AdminUser, CurrentUser, MaybeUser};
pub use memory::MemorySessionStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisSessionStore;
pub use signer::{CookieSigner, SESSION_COOKIE};

/// Session persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Opens a session for `user_id` and returns its id.
    async fn create(&self, user_id: UserId) -> Result<String, ServerError>;

    /// User behind a live session.
    async fn get(&self, session_id: &str) -> Result<Option<UserId>, ServerError>;

    /// Ends a session. Unknown ids are ignored.
    async fn destroy(&self, session_id: &str) -> Result<(), ServerError>;
}

/// Fresh, unguessable session id.
pub(crate) fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
