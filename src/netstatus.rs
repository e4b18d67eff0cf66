use crate::connectivity::ConnectivitySource;
use crate::notify::{ListenerId, StatusBus, StatusChange};
use crate::storage::FlagStore;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Storage key under which the manual-offline flag is persisted.
pub const MANUAL_OFFLINE_KEY: &str = "netstatus.manualOffline";

/// Headless test engines carrying this marker in their identifying string
/// report an unreliable online flag, so their signal is ignored.
pub const HEADLESS_UA_MARKER: &str = "PhantomJS";

struct NetstatusState {
    offline: bool,
    manual_offline: bool,
}

/// Tracks the combined offline status of the application.
///
/// The application is offline when the environment reports no connectivity
/// or when it has been forced offline manually; the manual flag is persisted
/// across restarts. Subscribers are notified synchronously whenever the
/// combined status changes.
pub struct Netstatus {
    connectivity: Arc<dyn ConnectivitySource>,
    store: FlagStore,
    bus: StatusBus,
    state: Mutex<NetstatusState>,
}

impl Netstatus {
    /// Loads the persisted manual-offline flag and establishes the initial
    /// combined status. Only the literal string `"true"` counts as set.
    pub async fn new(connectivity: Arc<dyn ConnectivitySource>, store: FlagStore) -> Result<Self> {
        let service = Netstatus {
            connectivity,
            store,
            bus: StatusBus::new(),
            state: Mutex::new(NetstatusState { offline: false, manual_offline: false }),
        };

        let persisted = service.store.get(MANUAL_OFFLINE_KEY).await;
        let manual_offline = persisted.as_deref() == Some("true");
        service.update(manual_offline).await?;

        Ok(service)
    }

    /// Combined offline status, no side effects.
    pub async fn offline(&self) -> bool {
        self.state.lock().await.offline
    }

    /// Whether the environment itself reports the application offline.
    pub fn browser_offline(&self) -> bool {
        if self.connectivity.user_agent().contains(HEADLESS_UA_MARKER) {
            return false;
        }
        !self.connectivity.online()
    }

    pub async fn manual_offline(&self) -> bool {
        self.state.lock().await.manual_offline
    }

    pub async fn set_manual_offline(&self, manual_offline: bool) -> Result<()> {
        self.update(manual_offline).await
    }

    /// Recomputes the combined status from a fresh connectivity read.
    ///
    /// Called by the event pump on every online/offline event; also useful
    /// for hosts that poll connectivity out of band.
    pub async fn refresh(&self) -> Result<()> {
        let manual_offline = self.manual_offline().await;
        self.update(manual_offline).await
    }

    pub async fn subscribe(
        &self,
        listener: impl Fn(StatusChange) + Send + Sync + 'static,
    ) -> ListenerId {
        self.bus.subscribe(Box::new(listener)).await
    }

    pub async fn unsubscribe(&self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id).await
    }

    async fn update(&self, manual_offline: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        if manual_offline != state.manual_offline {
            state.manual_offline = manual_offline;
            self.store
                .set(MANUAL_OFFLINE_KEY, if manual_offline { "true" } else { "false" })
                .await?;
        }

        // Always recomputed, even on a no-op set, to pick up the latest
        // connectivity reading.
        let offline = self.browser_offline() || manual_offline;
        if offline != state.offline {
            state.offline = offline;
            drop(state);
            let change = if offline { StatusChange::Offline } else { StatusChange::Online };
            self.bus.publish(change).await;
        }
        Ok(())
    }
}
