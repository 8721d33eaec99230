//! Event subscription and fan-out
//!
//! Multiple listeners, each invoked individually with panic isolation:
//! one faulty listener is logged and skipped, never allowed to break
//! the emission loop for the others.

use ensemble_core::types::ClockEvent;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::error;

type Listener = Box<dyn Fn(ClockEvent) + Send + Sync>;

struct ListenerEntry {
    id: u64,
    callback: Listener,
}

/// Registry of clock event listeners.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Mutex<Vec<Arc<ListenerEntry>>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub(crate) fn subscribe(&self, callback: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock().unwrap();
        entries.push(Arc::new(ListenerEntry { id, callback }));
        id
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|entry| entry.id != id);
    }

    /// Broadcast one event to every listener.
    ///
    /// Listeners run outside the registry lock, so a listener may call
    /// back into the clock. A panicking listener is logged and the loop
    /// continues.
    pub(crate) fn emit(&self, event: ClockEvent) {
        let snapshot: Vec<Arc<ListenerEntry>> = self.entries.lock().unwrap().clone();
        for entry in snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| (entry.callback)(event)));
            if result.is_err() {
                error!(
                    listener_id = entry.id,
                    kind = ?event.kind,
                    "clock listener panicked; continuing with remaining listeners"
                );
            }
        }
    }
}

/// Handle to an active event subscription.
///
/// Dropping the handle (or calling [`Subscription::unsubscribe`])
/// removes the listener. Outliving the clock is harmless.
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub(crate) fn new(id: u64, registry: Weak<ListenerRegistry>) -> Self {
        Self { id, registry }
    }

    /// Remove the listener now instead of at drop time.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_core::types::{ClockEventKind, ClockState};
    use std::sync::atomic::AtomicUsize;

    fn test_event() -> ClockEvent {
        ClockEvent::from_state(ClockEventKind::TimeUpdate, &ClockState::new(1000.0))
    }

    #[test]
    fn emit_reaches_all_listeners() {
        let registry = Arc::new(ListenerRegistry::default());
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = hits.clone();
            registry.subscribe(Box::new(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            }));
        }
        registry.emit(test_event());
        assert_eq!(hits.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn panicking_listener_does_not_break_emission() {
        let registry = Arc::new(ListenerRegistry::default());
        let hits = Arc::new(AtomicUsize::new(0));

        registry.subscribe(Box::new(|_| panic!("bad listener")));
        let hits_clone = hits.clone();
        registry.subscribe(Box::new(move |_| {
            hits_clone.fetch_add(1, Ordering::Relaxed);
        }));

        registry.emit(test_event());
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let registry = Arc::new(ListenerRegistry::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let id = registry.subscribe(Box::new(move |_| {
            hits_clone.fetch_add(1, Ordering::Relaxed);
        }));
        let subscription = Subscription::new(id, Arc::downgrade(&registry));

        registry.emit(test_event());
        subscription.unsubscribe();
        registry.emit(test_event());

        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }
}
