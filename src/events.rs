//! Change broadcast hub
//!
//! Fans out "directory changed" notifications from the file store to every
//! connected client. Delivery is best-effort: a subscriber whose queue is
//! full or whose connection is gone is dropped from the set, so a slow or
//! dead consumer can never block a publisher. There is no replay buffer; a
//! late subscriber starts with a fresh listing instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use serde::Serialize;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::RwLock;

/// Identifies one subscription for the lifetime of its connection.
pub type SubscriberId = u64;

/// A single notification pushed to clients.
///
/// Tagged so the connect acknowledgement can never be mistaken for a change
/// to the root directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Sent once, immediately after a client connects.
    Connected,
    /// The contents of `path` changed; clients re-list it if shown.
    DirChanged { path: String },
}

/// Publish/subscribe hub over bounded per-subscriber queues.
pub struct ChangeBroadcaster {
    subscribers: RwLock<HashMap<SubscriberId, Sender<ChangeEvent>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl ChangeBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            capacity,
        }
    }

    /// Registers a new subscriber and hands back its delivery channel.
    pub async fn subscribe(&self) -> (SubscriberId, Receiver<ChangeEvent>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().await.insert(id, tx);
        debug!("subscriber {} registered", id);
        (id, rx)
    }

    /// Drops a subscriber; further publishes will not reach it.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.write().await.remove(&id).is_some() {
            debug!("subscriber {} removed", id);
        }
    }

    /// Notifies every current subscriber that `path` changed.
    ///
    /// Subscribers that refuse the event (queue full or closed) are pruned
    /// from the set.
    pub async fn publish(&self, path: &str) {
        let mut stale = Vec::new();
        {
            let subscribers = self.subscribers.read().await;
            for (id, tx) in subscribers.iter() {
                let event = ChangeEvent::DirChanged {
                    path: path.to_string(),
                };
                if tx.try_send(event).is_err() {
                    stale.push(*id);
                }
            }
        }
        if !stale.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in stale {
                subscribers.remove(&id);
                warn!("dropped unresponsive subscriber {}", id);
            }
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}
