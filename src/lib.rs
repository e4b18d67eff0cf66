//! Tracks whether the application should be treated as offline, either
//! because the environment reports no connectivity or because it was forced
//! offline manually, and gates outgoing HTTP requests on that status.

mod config;
mod connectivity;
mod events;
mod gate;
mod netstatus;
mod notify;
mod storage;

pub use config::{AppConfig, GateConfig, StorageConfig};
pub use connectivity::{ConnectivitySource, SharedConnectivity};
pub use events::{spawn_event_pump, ConnectivityEvent};
pub use gate::{
    BaseUrlResolver, GateDecision, GateError, OfflineGate, OfflineRejection, RequestConfig,
    UrlResolver, OFFLINE_STATUS,
};
pub use netstatus::{Netstatus, HEADLESS_UA_MARKER, MANUAL_OFFLINE_KEY};
pub use notify::{ListenerId, StatusBus, StatusChange, STATUS_EVENT};
pub use storage::FlagStore;

/// Installs a fmt subscriber so test runs show the crate's diagnostics.
/// Safe to call from every test; only the first call wins.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
