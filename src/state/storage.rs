//! State storage implementation
//!
//! Persists conversation contexts in Redis as JSON with a TTL keyed by
//! Telegram user id.

use redis::AsyncCommands;
use tracing::{debug, error, warn};

use super::context::ConversationContext;
use crate::config::settings::RedisConfig;
use crate::utils::errors::Result;

/// Redis-based conversation state storage
#[derive(Clone)]
pub struct StateStorage {
    connection_manager: redis::aio::ConnectionManager,
    config: RedisConfig,
}

impl StateStorage {
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection_manager = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            connection_manager,
            config,
        })
    }

    /// Save a conversation context, keeping the Redis TTL in line with the
    /// context's own expiry.
    pub async fn save_context(&self, context: &ConversationContext) -> Result<()> {
        let key = self.context_key(context.user_id);

        let serialized = serde_json::to_string(context).map_err(|e| {
            error!(user_id = context.user_id, error = %e, "Failed to serialize context");
            e
        })?;

        let remaining = (context.expires_at - chrono::Utc::now()).num_seconds();
        let ttl_seconds = std::cmp::max(remaining, 60) as u64;

        let mut conn = self.connection_manager.clone();
        conn.set_ex::<_, _, ()>(&key, serialized, ttl_seconds).await?;

        debug!(
            user_id = context.user_id,
            step = context.step.as_str(),
            ttl_seconds = ttl_seconds,
            "Context saved"
        );
        Ok(())
    }

    /// Load the context for a user, dropping it if already expired.
    pub async fn load_context(&self, user_id: i64) -> Result<Option<ConversationContext>> {
        let key = self.context_key(user_id);
        let mut conn = self.connection_manager.clone();

        let serialized: Option<String> = conn.get(&key).await?;
        let Some(data) = serialized else {
            return Ok(None);
        };

        let context: ConversationContext = serde_json::from_str(&data).map_err(|e| {
            error!(user_id = user_id, error = %e, "Failed to deserialize context");
            e
        })?;

        if context.is_expired() {
            warn!(user_id = user_id, "Context has expired, removing");
            self.delete_context(user_id).await?;
            return Ok(None);
        }

        Ok(Some(context))
    }

    pub async fn delete_context(&self, user_id: i64) -> Result<()> {
        let key = self.context_key(user_id);
        let mut conn = self.connection_manager.clone();

        let deleted: u32 = conn.del(&key).await?;
        if deleted > 0 {
            debug!(user_id = user_id, "Deleted context");
        }
        Ok(())
    }

    pub async fn context_exists(&self, user_id: i64) -> Result<bool> {
        let key = self.context_key(user_id);
        let mut conn = self.connection_manager.clone();

        let exists: bool = conn.exists(&key).await?;
        Ok(exists)
    }

    fn context_key(&self, user_id: i64) -> String {
        format!("{}context:{}", self.config.prefix, user_id)
    }
}

impl std::fmt::Debug for StateStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStorage")
            .field("prefix", &self.config.prefix)
            .finish_non_exhaustive()
    }
}
