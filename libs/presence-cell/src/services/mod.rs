pub mod channel;
pub mod feed;
pub mod filter;
pub mod redis_channel;

pub use channel::*;
pub use feed::*;
pub use filter::*;
pub use redis_channel::RedisPresenceChannel;
