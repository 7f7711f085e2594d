use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::StoreAdapter;
use crate::domain::{DomainState, StateDomain, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<UserRecord>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

impl DomainState for AuthState {
    const DOMAIN: StateDomain = StateDomain::Auth;

    // Shape only. An authenticated flag without user/token is repaired by
    // `initialize`, not rejected here, so sessions persisted by older builds
    // stay readable.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Credential state. The bearer token is additionally persisted raw (outside
/// the envelope) so the outbound-request layer can read it synchronously
/// before this store rehydrates.
#[derive(Debug)]
pub struct AuthStore {
    adapter: Arc<StoreAdapter>,
    state: Mutex<AuthState>,
    loading: AtomicBool,
}

impl AuthStore {
    pub fn new(adapter: Arc<StoreAdapter>) -> Self {
        Self {
            adapter,
            state: Mutex::new(AuthState::default()),
            loading: AtomicBool::new(true),
        }
    }

    pub fn state(&self) -> AuthState {
        self.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    pub fn login(&self, user: UserRecord, token: &str) {
        let snapshot = {
            let mut state = self.lock();
            *state = AuthState {
                user: Some(user),
                token: Some(token.to_string()),
                is_authenticated: true,
            };
            state.clone()
        };
        self.persist(&snapshot);
        let token_key = self.adapter.keys().token_key();
        if let Err(error) = self.adapter.raw_set(&token_key, token) {
            tracing::warn!(domain = "auth", %error, "raw token persist failed");
        }
        self.loading.store(false, Ordering::Relaxed);
    }

    pub fn logout(&self) {
        let snapshot = {
            let mut state = self.lock();
            *state = AuthState::default();
            state.clone()
        };
        self.persist(&snapshot);
        self.adapter.raw_remove(&self.adapter.keys().token_key());
        self.loading.store(false, Ordering::Relaxed);
    }

    pub fn update_user(&self, user: UserRecord) {
        let snapshot = {
            let mut state = self.lock();
            state.user = Some(user);
            state.clone()
        };
        self.persist(&snapshot);
    }

    /// Reconstructs authenticated state from the raw persisted token plus the
    /// last persisted envelope. When the two disagree (either is missing, or
    /// the envelope fails validation), falls back to unauthenticated. Never
    /// leaves the store in a loading state after returning.
    pub fn initialize(&self) {
        let raw_token = self.adapter.raw_get(&self.adapter.keys().token_key());
        let persisted = self.adapter.read_state::<AuthState>();

        let next = match raw_token {
            Some(token) if persisted.is_authenticated && persisted.user.is_some() => AuthState {
                user: persisted.user,
                token: Some(token),
                is_authenticated: true,
            },
            Some(_) | None => {
                if persisted.is_authenticated {
                    tracing::debug!(
                        domain = "auth",
                        "persisted session disagrees with raw token; dropping to unauthenticated"
                    );
                }
                AuthState::default()
            }
        };
        *self.lock() = next;
        self.loading.store(false, Ordering::Relaxed);
    }

    /// Applies a payload observed from a sibling context. The raw token is
    /// already in shared storage; only in-memory state needs the update.
    pub fn reconcile(&self, payload: Value) {
        match serde_json::from_value::<AuthState>(payload) {
            Ok(incoming) if incoming.validate().is_ok() => {
                *self.lock() = incoming;
                self.loading.store(false, Ordering::Relaxed);
            }
            Ok(_) | Err(_) => {
                tracing::warn!(domain = "auth", "dropping invalid reconcile payload");
            }
        }
    }

    fn persist(&self, snapshot: &AuthState) {
        if let Err(error) = self.adapter.write(snapshot) {
            tracing::warn!(domain = "auth", %error, "persist failed; in-memory state kept");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthStore, UserRecord};
    use crate::adapter::StoreAdapter;
    use crate::events::StorageEventBus;
    use crate::keys::KeyLayout;
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use std::sync::Arc;

    fn user() -> UserRecord {
        UserRecord {
            id: "u-1".to_string(),
            email: "owner@acme.example".to_string(),
            name: Some("Acme Owner".to_string()),
            role: Some("admin".to_string()),
        }
    }

    fn store() -> (Arc<StoreAdapter>, AuthStore) {
        let adapter = Arc::new(StoreAdapter::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(StorageEventBus::new()),
            KeyLayout::new("shopfront"),
        ));
        (Arc::clone(&adapter), AuthStore::new(adapter))
    }

    #[test]
    fn login_persists_envelope_and_raw_token() {
        let (adapter, store) = store();
        store.login(user(), "tok123");

        let state = store.state();
        assert!(state.is_authenticated);
        assert_eq!(state.token.as_deref(), Some("tok123"));
        assert_eq!(
            adapter.raw_get(&adapter.keys().token_key()).as_deref(),
            Some("tok123")
        );
        assert!(!store.is_loading());
    }

    #[test]
    fn logout_clears_everything_including_raw_token() {
        let (adapter, store) = store();
        store.login(user(), "tok123");
        store.logout();

        assert_eq!(store.state(), super::AuthState::default());
        assert!(adapter.raw_get(&adapter.keys().token_key()).is_none());
    }

    #[test]
    fn initialize_restores_session_when_token_and_envelope_agree() {
        let (adapter, store) = store();
        store.login(user(), "tok123");

        let fresh = AuthStore::new(adapter);
        assert!(fresh.is_loading());
        fresh.initialize();
        let state = fresh.state();
        assert!(state.is_authenticated);
        assert_eq!(state.user, Some(user()));
        assert_eq!(state.token.as_deref(), Some("tok123"));
        assert!(!fresh.is_loading());
    }

    #[test]
    fn initialize_drops_to_unauthenticated_when_raw_token_missing() {
        let (adapter, store) = store();
        store.login(user(), "tok123");
        adapter.raw_remove(&adapter.keys().token_key());

        let fresh = AuthStore::new(adapter);
        fresh.initialize();
        assert!(!fresh.state().is_authenticated);
        assert!(!fresh.is_loading());
    }

    #[test]
    fn initialize_drops_to_unauthenticated_when_envelope_missing() {
        let (adapter, _store) = store();
        adapter
            .raw_set(&adapter.keys().token_key(), "orphan-token")
            .expect("seed raw token");

        let fresh = AuthStore::new(Arc::clone(&adapter));
        fresh.initialize();
        assert!(!fresh.state().is_authenticated);
        assert!(fresh.state().token.is_none());
    }

    #[test]
    fn reconcile_adopts_sibling_login_and_is_idempotent() {
        let (_adapter, store) = store();
        let payload = json!({
            "user": {"id": "u-1", "email": "owner@acme.example"},
            "token": "tok123",
            "isAuthenticated": true
        });
        store.reconcile(payload.clone());
        let once = store.state();
        assert!(once.is_authenticated);

        store.reconcile(payload);
        assert_eq!(store.state(), once);
    }

    #[test]
    fn reconcile_drops_undecodable_payload() {
        let (_adapter, store) = store();
        store.login(user(), "tok123");
        store.reconcile(json!({"isAuthenticated": "yes"}));
        assert!(store.state().is_authenticated, "bad payload must not apply");
    }
}
