use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::services::channel::{PresenceChannel, PresenceStream};
use crate::{FeedStatus, PresenceError, PresenceSnapshot, PresenceState};

#[derive(Default)]
struct Lifecycle {
    subscribers: usize,
    listener: Option<JoinHandle<()>>,
}

/// Owns the presence channel connection for every consumer in the process.
///
/// The channel is opened by the first `connect` and closed when the last
/// handle is returned through `disconnect`. State is published through a
/// watch channel: each update fully replaces the previous snapshot.
pub struct PresenceFeed {
    channel: Arc<dyn PresenceChannel>,
    state: watch::Sender<PresenceState>,
    lifecycle: Mutex<Lifecycle>,
}

impl PresenceFeed {
    pub fn new(channel: Arc<dyn PresenceChannel>) -> Self {
        let (state, _) = watch::channel(PresenceState::default());

        Self {
            channel,
            state,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Registers a consumer. Opens the channel if no listener is running
    /// (first consumer, or the previous transport dropped), then requests a
    /// fresh snapshot.
    #[instrument(skip(self), fields(channel = self.channel.name()))]
    pub async fn connect(&self) -> Result<PresenceHandle, PresenceError> {
        {
            let mut lifecycle = self.lifecycle.lock().await;

            let listening = lifecycle
                .listener
                .as_ref()
                .map(|listener| !listener.is_finished())
                .unwrap_or(false);

            if !listening {
                let updates = self.channel.open().await?;
                self.state.send_modify(|state| state.status = FeedStatus::Connecting);
                lifecycle.listener = Some(tokio::spawn(listen(updates, self.state.clone())));
                info!("Presence channel opened");
            }

            lifecycle.subscribers += 1;
            debug!("Presence feed now has {} subscribers", lifecycle.subscribers);
        }

        if let Err(e) = self.channel.request_snapshot().await {
            warn!("Presence snapshot request failed: {}", e);
        }

        Ok(PresenceHandle {
            receiver: self.state.subscribe(),
        })
    }

    /// Returns a handle. The last one out stops the listener, closes the
    /// channel and clears the snapshot.
    #[instrument(skip(self, handle), fields(channel = self.channel.name()))]
    pub async fn disconnect(&self, handle: PresenceHandle) -> Result<(), PresenceError> {
        drop(handle);

        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.subscribers = lifecycle.subscribers.saturating_sub(1);

        if lifecycle.subscribers > 0 {
            debug!("Presence feed still has {} subscribers", lifecycle.subscribers);
            return Ok(());
        }

        if let Some(listener) = lifecycle.listener.take() {
            listener.abort();
            // Wait out the listener so a late update cannot land after the reset.
            let _ = listener.await;
        }
        self.state.send_replace(PresenceState::default());
        info!("Last presence subscriber left, closing channel");

        self.channel.close().await
    }

    pub fn state(&self) -> PresenceState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> Arc<PresenceSnapshot> {
        Arc::clone(&self.state.borrow().snapshot)
    }

    pub async fn subscriber_count(&self) -> usize {
        self.lifecycle.lock().await.subscribers
    }

    pub fn channel_name(&self) -> &'static str {
        self.channel.name()
    }
}

async fn listen(mut updates: PresenceStream, state: watch::Sender<PresenceState>) {
    while let Some(update) = updates.next().await {
        match update {
            Ok(payload) => match PresenceSnapshot::decode(&payload) {
                Ok(snapshot) => {
                    debug!("Presence update with {} specialists online", snapshot.len());
                    state.send_modify(|current| {
                        current.snapshot = Arc::new(snapshot);
                        current.status = FeedStatus::Live;
                        current.updated_at = Some(Utc::now());
                    });
                }
                Err(e) => warn!("Ignoring presence update: {}", e),
            },
            Err(e) => {
                warn!("Presence transport error: {}", e);
                break;
            }
        }
    }

    state.send_modify(|current| current.status = FeedStatus::Disconnected);
    warn!("Presence channel disconnected, online specialists are now stale");
}

/// A consumer's view of the presence feed.
pub struct PresenceHandle {
    receiver: watch::Receiver<PresenceState>,
}

impl PresenceHandle {
    pub fn state(&self) -> PresenceState {
        self.receiver.borrow().clone()
    }

    pub fn snapshot(&self) -> Arc<PresenceSnapshot> {
        Arc::clone(&self.receiver.borrow().snapshot)
    }

    pub fn status(&self) -> FeedStatus {
        self.receiver.borrow().status
    }

    pub fn is_stale(&self) -> bool {
        self.status() == FeedStatus::Disconnected
    }

    /// Waits for the next state change and returns it.
    pub async fn changed(&mut self) -> Result<PresenceState, PresenceError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| PresenceError::FeedClosed)?;
        Ok(self.receiver.borrow_and_update().clone())
    }
}
