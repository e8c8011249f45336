//! Cancellable background listeners.
//!
//! Identity-change callbacks, session binding, and history polling all run
//! as spawned tasks. Each hands back a [`Subscription`]; disposing or
//! dropping it stops the listener so no callback fires into torn-down state.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Shared flag a listener checks before delivering each result.
#[derive(Debug, Clone)]
pub struct ActiveFlag(Arc<AtomicBool>);

impl ActiveFlag {
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Disposer for a running listener.
#[derive(Debug)]
pub struct Subscription {
    active: ActiveFlag,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawns `task` on the current tokio runtime.
    ///
    /// The task receives an [`ActiveFlag`] and must check it before acting
    /// on anything it has awaited. Must be called from within a runtime.
    pub fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(ActiveFlag) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let active = ActiveFlag(Arc::new(AtomicBool::new(true)));
        let handle = tokio::spawn(task(active.clone()));
        Self {
            active,
            handle: Some(handle),
        }
    }

    /// True until disposed or until the listener finishes on its own.
    pub fn is_active(&self) -> bool {
        self.active.is_active()
            && self
                .handle
                .as_ref()
                .map(|handle| !handle.is_finished())
                .unwrap_or(false)
    }

    /// Stops the listener. No callback is delivered after this returns.
    pub fn dispose(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        self.active.0.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
