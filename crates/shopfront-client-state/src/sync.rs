use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::domain::StateDomain;
use crate::envelope::Envelope;
use crate::events::{ListenerId, StorageEvent, StorageEventBus};
use crate::keys::KeyLayout;

type ReconcileFn = Arc<dyn Fn(Value) + Send + Sync>;

struct SyncInner {
    keys: KeyLayout,
    slots: Mutex<HashMap<StateDomain, ReconcileFn>>,
}

impl SyncInner {
    fn dispatch(&self, event: &StorageEvent) {
        let Some(domain) = self.keys.domain_for_key(&event.key) else {
            return;
        };
        // Deletions carry no payload; stores pick them up on their next
        // initialize. Only live values are reconciled.
        let Some(raw) = event.new_value.as_deref() else {
            return;
        };
        let callback = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(&domain).map(Arc::clone)
        };
        let Some(callback) = callback else {
            return;
        };
        match Envelope::decode(raw) {
            Ok(envelope) => callback(envelope.state),
            Err(error) => {
                tracing::warn!(
                    key = %event.key,
                    domain = domain.as_str(),
                    %error,
                    "dropping malformed cross-context payload"
                );
            }
        }
    }
}

/// Fans origin-wide storage mutations out to per-domain reconciliation
/// callbacks. One instance per context, registering exactly one bus listener;
/// a domain has at most one active callback and a second `subscribe` silently
/// replaces the first (last registration wins).
///
/// Delivery follows bus order. There is no global total order across contexts
/// racing simultaneously, so every reconciliation callback must be idempotent
/// and content itself with last-writer-wins.
pub struct CrossTabSync {
    inner: Arc<SyncInner>,
    bus: Arc<StorageEventBus>,
    listener: ListenerId,
}

impl CrossTabSync {
    pub fn new(bus: Arc<StorageEventBus>, keys: KeyLayout) -> Self {
        let inner = Arc::new(SyncInner {
            keys,
            slots: Mutex::new(HashMap::new()),
        });
        let listener = {
            let inner = Arc::clone(&inner);
            bus.subscribe(move |event| inner.dispatch(event))
        };
        Self {
            inner,
            bus,
            listener,
        }
    }

    pub fn subscribe(&self, domain: StateDomain, callback: impl Fn(Value) + Send + Sync + 'static) {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(domain, Arc::new(callback));
    }

    pub fn unsubscribe(&self, domain: StateDomain) {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&domain);
    }

    /// Full teardown: drops the bus listener and every domain slot. Not
    /// expected during normal operation; the synchronizer is process-lifetime.
    pub fn destroy(&self) {
        self.bus.unsubscribe(self.listener);
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for CrossTabSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossTabSync")
            .field("prefix", &self.inner.keys.prefix())
            .finish_non_exhaustive()
    }
}
