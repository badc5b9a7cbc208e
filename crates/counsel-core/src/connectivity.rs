//! Runtime connectivity signal.
//!
//! Two sources feed it: the runtime (platform network events, set by the
//! embedder) and the transport, which records whether the server was last
//! reachable. Sends are refused only on the runtime signal; a failure the
//! transport observed never blocks the next attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the network is believed reachable.
pub trait Connectivity: Send + Sync {
    /// Runtime signal combined with what the transport last observed.
    fn is_online(&self) -> bool;

    /// The runtime signal alone.
    fn runtime_online(&self) -> bool {
        self.is_online()
    }
}

/// Shared online/offline flag.
#[derive(Debug, Clone)]
pub struct ConnectivityFlag {
    runtime: Arc<AtomicBool>,
    reachable: Arc<AtomicBool>,
}

impl ConnectivityFlag {
    /// Creates a flag whose runtime signal is `online` and whose server is
    /// assumed reachable.
    pub fn new(online: bool) -> Self {
        Self {
            runtime: Arc::new(AtomicBool::new(online)),
            reachable: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Sets the runtime signal (platform network events).
    pub fn set_online(&self, online: bool) {
        let previous = self.runtime.swap(online, Ordering::SeqCst);
        if previous != online {
            tracing::info!("Connectivity changed: online={}", online);
        }
    }

    /// Records whether the transport could reach the server.
    pub fn mark_reachable(&self, reachable: bool) {
        let previous = self.reachable.swap(reachable, Ordering::SeqCst);
        if previous != reachable {
            tracing::info!("Server reachability changed: reachable={}", reachable);
        }
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.runtime.load(Ordering::SeqCst) && self.reachable.load(Ordering::SeqCst)
    }

    fn runtime_online(&self) -> bool {
        self.runtime.load(Ordering::SeqCst)
    }
}
