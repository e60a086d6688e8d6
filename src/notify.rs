//! Unreviewed-count notifications.
//!
//! Subscribers are kept in registration order. A broadcast snapshots the list
//! first, so a callback may unsubscribe itself (or anyone else) mid-broadcast.
//! No lock is held while callbacks run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::error;

/// Receives the current unreviewed count. Errors are logged, not propagated.
pub type CountCallback = Arc<dyn Fn(usize) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, CountCallback)>>,
}

impl HubInner {
    fn remove(&self, id: u64) -> bool {
        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }
}

#[derive(Clone, Default)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `callback` at the end of the list without invoking it.
    pub fn register(&self, callback: CountCallback) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));
        Subscription {
            hub: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Invoke every registered callback with `count`, in registration order.
    pub fn broadcast(&self, count: usize) {
        let snapshot: Vec<CountCallback> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in snapshot {
            invoke(&callback, count);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run one callback, containing both returned errors and panics.
pub(crate) fn invoke(callback: &CountCallback, count: usize) {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(count))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(?err, count, "subscriber callback failed"),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(panic = %msg, count, "subscriber callback panicked");
        }
    }
}

/// Handle returned by subscribe. Dropping it does not unsubscribe.
#[derive(Debug, Clone)]
pub struct Subscription {
    hub: Weak<HubInner>,
    id: u64,
}

impl Subscription {
    /// Remove the callback. Calling this again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.hub.upgrade().map_or(false, |hub| {
            hub.subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .any(|(sid, _)| *sid == self.id)
        })
    }
}
