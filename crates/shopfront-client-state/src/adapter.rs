use std::sync::Arc;

use serde_json::Value;

use crate::domain::{DomainState, StateDomain};
use crate::envelope::Envelope;
use crate::events::{StorageEvent, StorageEventBus};
use crate::keys::KeyLayout;
use crate::migrate;
use crate::storage::{StorageBackend, StorageError};

/// Outcome of reading one domain's persisted envelope. `Corrupt` means the
/// stored entry was unparsable or structurally invalid; by the time the
/// caller sees it, the entry has already been evicted and a deletion event
/// published, so malformed data can never be surfaced twice.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Present(Envelope),
    Missing,
    Corrupt,
}

impl ReadOutcome {
    #[must_use]
    pub fn into_envelope(self) -> Option<Envelope> {
        match self {
            Self::Present(envelope) => Some(envelope),
            Self::Missing | Self::Corrupt => None,
        }
    }
}

/// Validating, enveloping write-through layer over the durable backend.
/// Shared by every domain store in one context; owns no state of its own.
#[derive(Debug, Clone)]
pub struct StoreAdapter {
    backend: Arc<dyn StorageBackend>,
    bus: Arc<StorageEventBus>,
    keys: KeyLayout,
}

impl StoreAdapter {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        bus: Arc<StorageEventBus>,
        keys: KeyLayout,
    ) -> Self {
        Self { backend, bus, keys }
    }

    pub fn keys(&self) -> &KeyLayout {
        &self.keys
    }

    pub fn bus(&self) -> &Arc<StorageEventBus> {
        &self.bus
    }

    /// Reads one domain's envelope. Malformed entries are purged on sight.
    pub fn read(&self, domain: StateDomain) -> ReadOutcome {
        let key = self.keys.domain_key(domain);
        let Some(raw) = self.backend.get(&key) else {
            return ReadOutcome::Missing;
        };
        match Envelope::decode(&raw) {
            Ok(envelope) => ReadOutcome::Present(envelope),
            Err(error) => {
                tracing::warn!(%key, %error, "purging corrupt persisted envelope");
                self.purge(&key);
                ReadOutcome::Corrupt
            }
        }
    }

    /// Reads, migrates, and validates one domain's typed state, folding
    /// missing and corrupt entries to the validated default. The fail-safe
    /// path every store initializer goes through.
    pub fn read_state<T: DomainState>(&self) -> T {
        let Some(envelope) = self.read(T::DOMAIN).into_envelope() else {
            return T::default();
        };
        let key = self.keys.domain_key(T::DOMAIN);
        let Some(payload) = migrate::migrate(T::DOMAIN, &envelope.version, envelope.state) else {
            tracing::warn!(
                %key,
                version = %envelope.version,
                "purging envelope with unmigratable schema version"
            );
            self.purge(&key);
            return T::default();
        };
        match serde_json::from_value::<T>(payload) {
            Ok(state) => match state.validate() {
                Ok(()) => state,
                Err(error) => {
                    tracing::warn!(%key, %error, "purging envelope that failed domain validation");
                    self.purge(&key);
                    T::default()
                }
            },
            Err(error) => {
                tracing::warn!(%key, %error, "purging envelope with undecodable state payload");
                self.purge(&key);
                T::default()
            }
        }
    }

    /// Envelope-wraps and persists one domain's state, then publishes the
    /// mutation so every context sharing the origin can react.
    pub fn write<T: DomainState>(&self, state: &T) -> Result<(), StorageError> {
        let payload = match serde_json::to_value(state) {
            Ok(payload) => payload,
            Err(error) => {
                return Err(StorageError::WriteFailed {
                    message: format!("state encode failed: {error}"),
                });
            }
        };
        self.write_payload(T::DOMAIN, payload)
    }

    /// Same as `write`, for payloads whose type is only known at runtime
    /// (backup restoration).
    pub fn write_payload(&self, domain: StateDomain, payload: Value) -> Result<(), StorageError> {
        let envelope = Envelope::wrap(payload);
        let raw = match envelope.encode() {
            Ok(raw) => raw,
            Err(error) => {
                return Err(StorageError::WriteFailed {
                    message: format!("envelope encode failed: {error}"),
                });
            }
        };
        let key = self.keys.domain_key(domain);
        self.backend.set(&key, &raw)?;
        self.bus.publish(&StorageEvent {
            key,
            new_value: Some(raw),
        });
        Ok(())
    }

    /// Deletes one domain's envelope and signals the deletion to listeners.
    pub fn remove(&self, domain: StateDomain) {
        self.purge(&self.keys.domain_key(domain));
    }

    pub fn raw_get(&self, key: &str) -> Option<String> {
        self.backend.get(key)
    }

    pub fn raw_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.backend.set(key, value)
    }

    pub fn raw_remove(&self, key: &str) {
        self.backend.remove(key);
    }

    fn purge(&self, key: &str) {
        self.backend.remove(key);
        self.bus.publish(&StorageEvent {
            key: key.to_string(),
            new_value: None,
        });
    }
}
