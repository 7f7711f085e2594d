//! Shopfront client state core.
//!
//! Owns the persisted slices of client application state (auth, cart, tenant,
//! ui) shared by the admin panel and the storefront. State is written through
//! a validating envelope layer into a pluggable durable store, and every
//! mutation is published on a storage event bus so sibling contexts of the
//! same origin converge without polling. A rotating backup history and a
//! startup repair pass cover corrupted or stale persisted state.

pub mod adapter;
pub mod app;
pub mod backup;
pub mod domain;
pub mod envelope;
pub mod events;
pub mod keys;
pub mod migrate;
pub mod storage;
pub mod stores;
pub mod sync;

pub use adapter::{ReadOutcome, StoreAdapter};
pub use app::{ClientState, ClientStateConfig};
pub use backup::{BackupManager, BackupSnapshot, MAX_BACKUPS};
pub use domain::{DomainState, StateDomain, ValidationError};
pub use envelope::{Envelope, EnvelopeError, STATE_SCHEMA_VERSION};
pub use events::{ListenerId, StorageEvent, StorageEventBus};
pub use keys::KeyLayout;
pub use storage::{FileStorage, MemoryStorage, StorageBackend, StorageError};
pub use sync::CrossTabSync;
