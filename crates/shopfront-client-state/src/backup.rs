use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::{ReadOutcome, StoreAdapter};
use crate::domain::{StateDomain, validate_payload};
use crate::envelope::STATE_SCHEMA_VERSION;
use crate::migrate;

/// Maximum snapshots retained in the rotating history.
pub const MAX_BACKUPS: usize = 5;

/// One immutable point-in-time copy of every domain's persisted payload, as
/// last successfully read at snapshot time. A domain with nothing persisted
/// snapshots as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub timestamp: i64,
    pub version: String,
    pub auth: Option<Value>,
    pub cart: Option<Value>,
    pub tenant: Option<Value>,
    pub ui: Option<Value>,
}

impl BackupSnapshot {
    pub fn payload(&self, domain: StateDomain) -> Option<&Value> {
        match domain {
            StateDomain::Auth => self.auth.as_ref(),
            StateDomain::Cart => self.cart.as_ref(),
            StateDomain::Tenant => self.tenant.as_ref(),
            StateDomain::Ui => self.ui.as_ref(),
        }
    }

    fn set_payload(&mut self, domain: StateDomain, payload: Option<Value>) {
        match domain {
            StateDomain::Auth => self.auth = payload,
            StateDomain::Cart => self.cart = payload,
            StateDomain::Tenant => self.tenant = payload,
            StateDomain::Ui => self.ui = payload,
        }
    }
}

/// Disaster-recovery layer: bounded rotating snapshots of the persisted
/// domain slices, plus a self-healing pass run at application start.
#[derive(Debug, Clone)]
pub struct BackupManager {
    adapter: Arc<StoreAdapter>,
}

impl BackupManager {
    pub fn new(adapter: Arc<StoreAdapter>) -> Self {
        Self { adapter }
    }

    /// Snapshots every domain, prepends to the history, and truncates it to
    /// the retention cap. Invoked explicitly or after critical actions.
    ///
    /// Payloads are migrated to the current schema before capture; restore
    /// re-wraps at the current version, so a snapshot must never carry a
    /// legacy-shaped payload.
    pub fn create_backup(&self) -> BackupSnapshot {
        let mut snapshot = BackupSnapshot {
            timestamp: Utc::now().timestamp_millis(),
            version: STATE_SCHEMA_VERSION.to_string(),
            auth: None,
            cart: None,
            tenant: None,
            ui: None,
        };
        for domain in StateDomain::ALL {
            let payload = self
                .adapter
                .read(domain)
                .into_envelope()
                .and_then(|envelope| migrate::migrate(domain, &envelope.version, envelope.state));
            snapshot.set_payload(domain, payload);
        }

        let mut history = self.list_backups();
        history.insert(0, snapshot.clone());
        history.truncate(MAX_BACKUPS);
        self.persist_history(&history);
        snapshot
    }

    /// Newest first. A missing or unparsable history is an empty history,
    /// never an error.
    pub fn list_backups(&self) -> Vec<BackupSnapshot> {
        let key = self.adapter.keys().backup_key();
        let Some(raw) = self.adapter.raw_get(&key) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<BackupSnapshot>>(&raw) {
            Ok(history) => history,
            Err(error) => {
                tracing::warn!(%key, %error, "backup history unreadable; treating as empty");
                Vec::new()
            }
        }
    }

    /// Overwrites each domain present in the snapshot; the adapter publishes
    /// a mutation per key, which is what brings every live store back in
    /// sync. Returns whether the restore completed without a failure.
    pub fn restore_from_backup(&self, snapshot: &BackupSnapshot) -> bool {
        let mut ok = true;
        for domain in StateDomain::ALL {
            let Some(payload) = snapshot.payload(domain) else {
                continue;
            };
            if let Err(error) = self.adapter.write_payload(domain, payload.clone()) {
                tracing::warn!(domain = domain.as_str(), %error, "backup restore write failed");
                ok = false;
            }
        }
        ok
    }

    /// Self-healing pass: purges any persisted envelope that fails its
    /// domain's validation, along with the raw scalars paired to it. Reports
    /// whether anything had to be repaired.
    pub fn validate_and_repair(&self) -> bool {
        let mut repaired = false;
        for domain in StateDomain::ALL {
            match self.adapter.read(domain) {
                ReadOutcome::Missing => {}
                ReadOutcome::Corrupt => {
                    // Already purged by the read path.
                    self.remove_paired_raw_keys(domain);
                    repaired = true;
                }
                ReadOutcome::Present(envelope) => {
                    let migrated = migrate::migrate(domain, &envelope.version, envelope.state);
                    let valid = migrated
                        .as_ref()
                        .is_some_and(|payload| validate_payload(domain, payload).is_ok());
                    if !valid {
                        tracing::warn!(
                            domain = domain.as_str(),
                            "repairing invalid persisted state"
                        );
                        self.adapter.remove(domain);
                        self.remove_paired_raw_keys(domain);
                        repaired = true;
                    }
                }
            }
        }
        repaired
    }

    fn remove_paired_raw_keys(&self, domain: StateDomain) {
        match domain {
            StateDomain::Auth => self.adapter.raw_remove(&self.adapter.keys().token_key()),
            StateDomain::Tenant => self
                .adapter
                .raw_remove(&self.adapter.keys().tenant_id_key()),
            StateDomain::Cart | StateDomain::Ui => {}
        }
    }

    fn persist_history(&self, history: &[BackupSnapshot]) {
        let key = self.adapter.keys().backup_key();
        let encoded = match serde_json::to_string(history) {
            Ok(encoded) => encoded,
            Err(error) => {
                tracing::warn!(%key, %error, "backup history encode failed");
                return;
            }
        };
        if let Err(error) = self.adapter.raw_set(&key, &encoded) {
            tracing::warn!(%key, %error, "backup history persist failed");
        }
    }
}
