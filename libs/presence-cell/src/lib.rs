//! # Presence Cell
//!
//! Tracks which specialists are online right now. A `PresenceFeed` owns the
//! connection to a presence channel (Redis pub/sub in production, an
//! in-process broadcast channel otherwise), asks for a snapshot when a
//! consumer connects and republishes every pushed update as the current
//! `PresenceState`.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                  Presence Cell                      |
//! +-----------------------------------------------------+
//! |  models.rs      |  OnlineSpecialist, snapshots      |
//! |  services/      |                                   |
//! |    channel.rs   |  PresenceChannel trait, local hub |
//! |    redis_channel.rs | Redis pub/sub channel         |
//! |    feed.rs      |  Refcounted feed lifecycle        |
//! |    filter.rs    |  Category filter, tie-break       |
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! +-----------------------------------------------------+
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::*;
pub use models::*;
pub use router::presence_routes;
pub use services::*;
