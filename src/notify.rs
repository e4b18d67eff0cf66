use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Fixed identifier under which status changes are broadcast.
pub const STATUS_EVENT: &str = "netstatus";

/// Payload of a status-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusChange {
    Offline,
    Online,
}

impl StatusChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusChange::Offline => "offline",
            StatusChange::Online => "online",
        }
    }
}

/// Opaque handle returned by [`StatusBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(StatusChange) + Send + Sync>;

/// Explicit observer registry: subscribe, unsubscribe, publish.
///
/// Publication is synchronous; every registered listener has run before
/// `publish` returns.
pub struct StatusBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
}

impl StatusBus {
    pub fn new() -> Self {
        StatusBus {
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub async fn subscribe(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().await.push((id, listener));
        id
    }

    /// Returns false if the id was not registered.
    pub async fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().await;
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub async fn publish(&self, change: StatusChange) {
        tracing::debug!("{}: {}", STATUS_EVENT, change.as_str());
        let listeners = self.listeners.lock().await;
        for (_, listener) in listeners.iter() {
            listener(change);
        }
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}
