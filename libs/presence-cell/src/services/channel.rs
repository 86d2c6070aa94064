use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::{OnlineSpecialist, PresenceError, PresenceSnapshot};

/// Stream of raw "presence updated" payloads. An `Err` item or the end of the
/// stream means the transport is gone.
pub type PresenceStream = BoxStream<'static, Result<String, PresenceError>>;

/// Transport-level access to the presence channel.
#[async_trait]
pub trait PresenceChannel: Send + Sync {
    /// Subscribes to presence updates. Updates published after this returns
    /// are delivered on the stream.
    async fn open(&self) -> Result<PresenceStream, PresenceError>;

    /// Asks the presence publisher to push the current online set.
    /// Fire-and-forget: the answer arrives on the update stream.
    async fn request_snapshot(&self) -> Result<(), PresenceError>;

    async fn close(&self) -> Result<(), PresenceError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
enum LocalEvent {
    Update(String),
    Dropped,
}

struct LocalHub {
    sender: broadcast::Sender<LocalEvent>,
    roster: RwLock<PresenceSnapshot>,
    snapshot_requests: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// In-process presence channel. It keeps the current roster and answers
/// snapshot requests the way the real presence publisher does.
#[derive(Clone)]
pub struct LocalPresenceChannel {
    hub: Arc<LocalHub>,
}

impl LocalPresenceChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);

        Self {
            hub: Arc::new(LocalHub {
                sender,
                roster: RwLock::new(PresenceSnapshot::empty()),
                snapshot_requests: AtomicUsize::new(0),
                opened: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
            }),
        }
    }

    /// Starts with a roster already online; nothing is pushed until a
    /// snapshot is requested.
    pub fn with_roster(specialists: Vec<OnlineSpecialist>) -> Self {
        let channel = Self::new();
        if let Ok(mut roster) = channel.hub.roster.try_write() {
            *roster = PresenceSnapshot::new(specialists);
        }
        channel
    }

    /// Replaces the online set and pushes it to every open subscriber.
    pub async fn set_online(&self, specialists: Vec<OnlineSpecialist>) -> Result<(), PresenceError> {
        let snapshot = PresenceSnapshot::new(specialists);
        let payload = snapshot.encode()?;
        *self.hub.roster.write().await = snapshot;
        self.broadcast(LocalEvent::Update(payload));
        Ok(())
    }

    /// Pushes an arbitrary payload without touching the roster.
    pub fn publish_raw(&self, payload: &str) {
        self.broadcast(LocalEvent::Update(payload.to_string()));
    }

    /// Severs every open subscription as a transport failure would.
    pub fn simulate_disconnect(&self) {
        self.broadcast(LocalEvent::Dropped);
    }

    pub fn snapshot_requests(&self) -> usize {
        self.hub.snapshot_requests.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.hub.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.hub.closed.load(Ordering::SeqCst)
    }

    fn broadcast(&self, event: LocalEvent) {
        if let Err(e) = self.hub.sender.send(event) {
            debug!("No local presence subscribers: {}", e);
        }
    }
}

impl Default for LocalPresenceChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceChannel for LocalPresenceChannel {
    async fn open(&self) -> Result<PresenceStream, PresenceError> {
        let receiver = self.hub.sender.subscribe();
        self.hub.opened.fetch_add(1, Ordering::SeqCst);

        let updates = stream::unfold(Some(receiver), |receiver| async move {
            let mut receiver = receiver?;
            loop {
                match receiver.recv().await {
                    Ok(LocalEvent::Update(payload)) => return Some((Ok(payload), Some(receiver))),
                    Ok(LocalEvent::Dropped) => {
                        let err = PresenceError::Transport("connection dropped".to_string());
                        return Some((Err(err), None));
                    }
                    // Every update is a full replacement, so skipping is safe.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Local presence subscriber lagged by {} updates", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(updates.boxed())
    }

    async fn request_snapshot(&self) -> Result<(), PresenceError> {
        self.hub.snapshot_requests.fetch_add(1, Ordering::SeqCst);
        let payload = self.hub.roster.read().await.encode()?;
        self.broadcast(LocalEvent::Update(payload));
        Ok(())
    }

    async fn close(&self) -> Result<(), PresenceError> {
        self.hub.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
