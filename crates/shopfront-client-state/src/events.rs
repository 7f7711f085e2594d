use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// One storage mutation as observed by every context sharing the origin.
/// `new_value == None` signals deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Publish/subscribe channel standing in for the browser's storage event.
/// All contexts of one origin share a single bus; fan-out is synchronous and
/// in subscription order, which matches the delivery-order guarantee the
/// synchronizer documents. A publisher that also subscribed receives its own
/// events, so handlers must be idempotent.
#[derive(Default)]
pub struct StorageEventBus {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl StorageEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&StorageEvent) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners_mut().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners_mut().retain(|(existing, _)| *existing != id);
    }

    pub fn publish(&self, event: &StorageEvent) {
        // Snapshot outside the lock so a listener that triggers a nested
        // publish (a corrupt-entry purge during dispatch) cannot deadlock.
        let listeners = self
            .listeners_mut()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect::<Vec<_>>();
        for listener in listeners {
            listener(event);
        }
    }

    fn listeners_mut(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for StorageEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEventBus")
            .field("listeners", &self.listeners_mut().len())
            .finish()
    }
}
