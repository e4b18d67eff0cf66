use std::sync::atomic::{AtomicBool, Ordering};

/// Live connectivity signal plus the environment's identifying string.
///
/// The host owns the actual platform integration; the tracker only polls
/// this on demand, it never caches the answer.
pub trait ConnectivitySource: Send + Sync {
    fn online(&self) -> bool;
    fn user_agent(&self) -> String;
}

/// Flag-backed source the host flips from its own online/offline events.
pub struct SharedConnectivity {
    online: AtomicBool,
    user_agent: String,
}

impl SharedConnectivity {
    pub fn new(online: bool, user_agent: impl Into<String>) -> Self {
        SharedConnectivity {
            online: AtomicBool::new(online),
            user_agent: user_agent.into(),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }
}

impl ConnectivitySource for SharedConnectivity {
    fn online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }
}
