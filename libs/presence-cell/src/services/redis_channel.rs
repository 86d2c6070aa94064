use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::{Config, Pool, Runtime};
use futures::StreamExt;
use redis::AsyncCommands;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::services::channel::{PresenceChannel, PresenceStream};
use crate::PresenceError;

/// Presence channel over Redis pub/sub.
///
/// Snapshot requests are published on the request channel; the presence
/// publisher answers, and announces every change, on the update channel with
/// the full specialist list as a JSON array.
pub struct RedisPresenceChannel {
    client: redis::Client,
    pool: Pool,
    request_channel: String,
    update_channel: String,
}

impl RedisPresenceChannel {
    pub fn new(config: &AppConfig) -> Result<Self, PresenceError> {
        let redis_url = config
            .redis_url
            .clone()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        let client = redis::Client::open(redis_url.as_str())?;
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| PresenceError::Transport(format!("Failed to create Redis pool: {}", e)))?;

        Ok(Self {
            client,
            pool,
            request_channel: config.presence_request_channel.clone(),
            update_channel: config.presence_update_channel.clone(),
        })
    }

    async fn get_connection(&self) -> Result<deadpool_redis::Connection, PresenceError> {
        self.pool
            .get()
            .await
            .map_err(|e| PresenceError::Transport(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl PresenceChannel for RedisPresenceChannel {
    async fn open(&self) -> Result<PresenceStream, PresenceError> {
        let mut pubsub = self.client.get_async_connection().await?.into_pubsub();
        pubsub.subscribe(&self.update_channel).await?;
        info!("Subscribed to presence channel {}", self.update_channel);

        let updates = pubsub
            .into_on_message()
            .map(|msg| msg.get_payload::<String>().map_err(PresenceError::from));

        Ok(updates.boxed())
    }

    async fn request_snapshot(&self) -> Result<(), PresenceError> {
        let mut conn = self.get_connection().await?;
        let request = json!({
            "type": "request_snapshot",
            "requested_at": Utc::now().to_rfc3339(),
        })
        .to_string();

        let receivers: i64 = conn.publish(&self.request_channel, request).await?;
        debug!(
            "Requested presence snapshot on {} ({} publishers listening)",
            self.request_channel, receivers
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
