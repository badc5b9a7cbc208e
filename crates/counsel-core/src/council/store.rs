//! Injectable council store.
//!
//! The store is the single sink for event-driven mutations. Observers
//! subscribe to a `watch` channel and see every committed state. Once the
//! owning UI context is gone, `dispose` turns further dispatches into no-ops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use super::state::{CouncilAction, CouncilState};

struct StoreInner {
    state: watch::Sender<CouncilState>,
    disposed: AtomicBool,
}

/// Cheaply cloneable handle to one council state container.
#[derive(Clone)]
pub struct CouncilStore {
    inner: Arc<StoreInner>,
}

impl CouncilStore {
    /// Creates a store whose monologue keeps at most `monologue_limit` entries.
    pub fn new(monologue_limit: usize) -> Self {
        let (state, _) = watch::channel(CouncilState::new(monologue_limit));
        Self {
            inner: Arc::new(StoreInner {
                state,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Applies an action and notifies subscribers.
    ///
    /// Returns `false` without touching the state if the store was disposed.
    pub fn dispatch(&self, action: CouncilAction) -> bool {
        if self.is_disposed() {
            tracing::debug!("Dropping {:?} dispatched after dispose", action);
            return false;
        }
        self.inner.state.send_modify(|state| state.apply(action));
        true
    }

    /// Reads the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&CouncilState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> CouncilState {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<CouncilState> {
        self.inner.state.subscribe()
    }

    /// Marks the owning context as torn down.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CouncilStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouncilStore")
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
