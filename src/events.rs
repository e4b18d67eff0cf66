use crate::connectivity::SharedConnectivity;
use crate::netstatus::Netstatus;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Connectivity transition reported by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Bridges host online/offline events into the status tracker.
///
/// One handler serves both event kinds: it records the new live flag and
/// triggers a recompute, so the status-change notification goes out as part
/// of handling the event itself. The task ends when the sender is dropped.
pub fn spawn_event_pump(
    netstatus: Arc<Netstatus>,
    connectivity: Arc<SharedConnectivity>,
    mut events: UnboundedReceiver<ConnectivityEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            connectivity.set_online(event == ConnectivityEvent::Online);
            if let Err(e) = netstatus.refresh().await {
                tracing::error!("status refresh failed: {:#?}", e);
            }
        }
        tracing::debug!("connectivity event channel closed");
    })
}
