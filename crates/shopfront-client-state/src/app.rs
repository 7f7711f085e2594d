use std::sync::Arc;

use crate::adapter::StoreAdapter;
use crate::backup::BackupManager;
use crate::domain::StateDomain;
use crate::events::StorageEventBus;
use crate::keys::KeyLayout;
use crate::storage::StorageBackend;
use crate::stores::auth::AuthStore;
use crate::stores::cart::CartStore;
use crate::stores::tenant::TenantStore;
use crate::stores::ui::UiStore;
use crate::sync::CrossTabSync;

pub const ADMIN_PREFIX: &str = "shopfront-admin";
pub const STOREFRONT_PREFIX: &str = "shopfront";

/// The admin panel and the storefront run the same state core; the key
/// prefix is the only difference between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStateConfig {
    pub prefix: String,
}

impl ClientStateConfig {
    pub fn admin() -> Self {
        Self {
            prefix: ADMIN_PREFIX.to_string(),
        }
    }

    pub fn storefront() -> Self {
        Self {
            prefix: STOREFRONT_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

/// Composition root for one execution context (one tab). Construction wires
/// the adapter, the synchronizer, the four domain stores, and the backup
/// manager over an injected backend and bus; sibling contexts share those two
/// and nothing else.
pub struct ClientState {
    adapter: Arc<StoreAdapter>,
    sync: CrossTabSync,
    pub auth: Arc<AuthStore>,
    pub cart: Arc<CartStore>,
    pub tenant: Arc<TenantStore>,
    pub ui: Arc<UiStore>,
    pub backup: BackupManager,
}

impl ClientState {
    pub fn new(
        config: ClientStateConfig,
        backend: Arc<dyn StorageBackend>,
        bus: Arc<StorageEventBus>,
    ) -> Self {
        let keys = KeyLayout::new(config.prefix);
        let adapter = Arc::new(StoreAdapter::new(backend, Arc::clone(&bus), keys.clone()));

        let auth = Arc::new(AuthStore::new(Arc::clone(&adapter)));
        let cart = Arc::new(CartStore::new(Arc::clone(&adapter)));
        let tenant = Arc::new(TenantStore::new(Arc::clone(&adapter)));
        let ui = Arc::new(UiStore::new(Arc::clone(&adapter)));

        let sync = CrossTabSync::new(bus, keys);
        {
            let auth = Arc::clone(&auth);
            sync.subscribe(StateDomain::Auth, move |payload| auth.reconcile(payload));
        }
        {
            let cart = Arc::clone(&cart);
            sync.subscribe(StateDomain::Cart, move |payload| cart.reconcile(payload));
        }
        {
            let tenant = Arc::clone(&tenant);
            sync.subscribe(StateDomain::Tenant, move |payload| {
                tenant.reconcile(payload);
            });
        }
        {
            let ui = Arc::clone(&ui);
            sync.subscribe(StateDomain::Ui, move |payload| ui.reconcile(payload));
        }

        let backup = BackupManager::new(Arc::clone(&adapter));

        Self {
            adapter,
            sync,
            auth,
            cart,
            tenant,
            ui,
            backup,
        }
    }

    pub fn adapter(&self) -> &Arc<StoreAdapter> {
        &self.adapter
    }

    pub fn sync(&self) -> &CrossTabSync {
        &self.sync
    }

    /// Startup (and regained-foreground) sequence: self-heal persisted state
    /// first, then rehydrate every store from it.
    pub fn initialize_all(&self) {
        if self.backup.validate_and_repair() {
            tracing::info!(prefix = self.adapter.keys().prefix(), "persisted state repaired");
        }
        self.auth.initialize();
        self.cart.initialize();
        self.tenant.initialize();
        self.ui.initialize();
    }
}

impl std::fmt::Debug for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientState")
            .field("prefix", &self.adapter.keys().prefix())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientState, ClientStateConfig};
    use crate::events::StorageEventBus;
    use crate::storage::{MemoryStorage, StorageBackend};
    use crate::stores::ui::Theme;
    use std::sync::Arc;

    fn origin() -> (Arc<dyn StorageBackend>, Arc<StorageEventBus>) {
        (Arc::new(MemoryStorage::new()), Arc::new(StorageEventBus::new()))
    }

    #[test]
    fn prefixes_differ_between_admin_and_storefront() {
        assert_ne!(
            ClientStateConfig::admin().prefix,
            ClientStateConfig::storefront().prefix
        );
    }

    #[test]
    fn sibling_contexts_converge_through_the_shared_origin() {
        let (backend, bus) = origin();
        let tab_a = ClientState::new(
            ClientStateConfig::storefront(),
            Arc::clone(&backend),
            Arc::clone(&bus),
        );
        let tab_b = ClientState::new(ClientStateConfig::storefront(), backend, bus);
        tab_a.initialize_all();
        tab_b.initialize_all();

        tab_a.ui.set_theme(Theme::Dark);
        assert_eq!(tab_b.ui.state().theme, Theme::Dark);
    }

    #[test]
    fn different_prefixes_do_not_cross_talk() {
        let (backend, bus) = origin();
        let admin = ClientState::new(
            ClientStateConfig::admin(),
            Arc::clone(&backend),
            Arc::clone(&bus),
        );
        let storefront = ClientState::new(ClientStateConfig::storefront(), backend, bus);

        admin.ui.set_theme(Theme::Dark);
        assert_eq!(storefront.ui.state().theme, Theme::System);
    }

    #[test]
    fn initialize_all_rehydrates_from_prior_session() {
        let (backend, bus) = origin();
        {
            let earlier = ClientState::new(
                ClientStateConfig::storefront(),
                Arc::clone(&backend),
                Arc::clone(&bus),
            );
            earlier.ui.set_locale("ja-JP");
        }
        let later = ClientState::new(ClientStateConfig::storefront(), backend, bus);
        later.initialize_all();
        assert_eq!(later.ui.state().locale, "ja-JP");
        assert!(!later.auth.is_loading());
    }
}
