use thiserror::Error;

#[derive(Error, Debug)]
pub enum PresenceError {
    #[error("Presence transport error: {0}")]
    Transport(String),

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Invalid presence payload: {0}")]
    InvalidPayload(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Presence feed has been shut down")]
    FeedClosed,
}
