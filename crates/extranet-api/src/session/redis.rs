//! # Redis session store
//!
//! Shares sessions between API instances and survives restarts.
//!
//! ## Implementation
//!
//! - One string key per session: `extranet:sess:<id>` → user id
//! - `SET EX` with the session TTL; Redis drops expired sessions itself
//! - A `ConnectionManager` reconnects transparently after failures

use async_trait::async_trait;
use extranet_core::UserId;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::info;

use super::{new_session_id, SessionStore};
use crate::domain::error::ServerError;

/// Prefix of every session key
pub const KEY_PREFIX: &str = "extranet:sess:";

fn key(session_id: &str) -> String {
    format!("{KEY_PREFIX}{session_id}")
}

fn store_error(err: redis::RedisError) -> ServerError {
    ServerError::SessionStore(err.to_string())
}

/// Sessions stored in Redis
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
    ttl: Duration,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, ServerError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_secs(2));

        let client = Client::open(redis_url).map_err(store_error)?;
        let connection = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(store_error)?;

        info!("connected to redis session store");
        Ok(Self { connection, ttl })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, user_id: UserId) -> Result<String, ServerError> {
        let id = new_session_id();
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key(&id), user_id, self.ttl.as_secs().max(1))
            .await
            .map_err(store_error)?;
        Ok(id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<UserId>, ServerError> {
        let mut conn = self.connection.clone();
        conn.get::<_, Option<UserId>>(key(session_id))
            .await
            .map_err(store_error)
    }

    async fn destroy(&self, session_id: &str) -> Result<(), ServerError> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key(session_id))
            .await
            .map_err(store_error)
    }
}
