//! Backup rotation and restore-driven convergence, including the file-backed
//! storage path used by the desktop shells.

use std::sync::Arc;

use shopfront_client_state::storage::StorageBackend;
use shopfront_client_state::stores::cart::NewCartItem;
use shopfront_client_state::stores::ui::Theme;
use shopfront_client_state::{
    ClientState, ClientStateConfig, FileStorage, MAX_BACKUPS, MemoryStorage, StorageEventBus,
};

fn tab_over(backend: Arc<dyn StorageBackend>, bus: Arc<StorageEventBus>) -> ClientState {
    let tab = ClientState::new(ClientStateConfig::storefront(), backend, bus);
    tab.initialize_all();
    tab
}

fn mug(quantity: u32) -> NewCartItem {
    NewCartItem {
        product_id: "p-mug".to_string(),
        name: "Mug".to_string(),
        image_url: None,
        unit_price_cents: 1250,
        quantity,
    }
}

#[test]
fn restore_rolls_every_live_store_back_to_the_snapshot() {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let bus = Arc::new(StorageEventBus::new());
    let tab_a = tab_over(Arc::clone(&backend), Arc::clone(&bus));
    let tab_b = tab_over(backend, bus);

    tab_a.cart.add_item(mug(2));
    tab_a.ui.set_theme(Theme::Dark);
    let snapshot = tab_a.backup.create_backup();

    // Later mutations that the restore must undo, in both tabs.
    tab_a.cart.clear_cart();
    tab_b.ui.set_theme(Theme::Light);

    assert!(tab_a.backup.restore_from_backup(&snapshot));
    assert_eq!(tab_a.cart.state().item_count, 2);
    assert_eq!(tab_b.cart.state().item_count, 2);
    assert_eq!(tab_b.ui.state().theme, Theme::Dark);
}

#[test]
fn six_backups_retain_five_newest_first() {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let bus = Arc::new(StorageEventBus::new());
    let tab = tab_over(backend, bus);

    for round in 0..6 {
        tab.ui.set_locale(&format!("locale-{round}"));
        tab.backup.create_backup();
    }

    let history = tab.backup.list_backups();
    assert_eq!(history.len(), MAX_BACKUPS);
    let locales = history
        .iter()
        .map(|snapshot| {
            snapshot.ui.as_ref().expect("ui payload")["locale"]
                .as_str()
                .expect("locale string")
                .to_string()
        })
        .collect::<Vec<_>>();
    assert_eq!(
        locales,
        vec!["locale-5", "locale-4", "locale-3", "locale-2", "locale-1"]
    );
}

#[test]
fn repair_pass_runs_before_rehydration_on_startup() {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let bus = Arc::new(StorageEventBus::new());
    {
        let earlier = tab_over(Arc::clone(&backend), Arc::clone(&bus));
        earlier.cart.add_item(mug(1));
    }
    // Corrupt the cart entry between sessions.
    let probe = ClientState::new(
        ClientStateConfig::storefront(),
        Arc::clone(&backend),
        Arc::clone(&bus),
    );
    let cart_key = probe
        .adapter()
        .keys()
        .domain_key(shopfront_client_state::StateDomain::Cart);
    probe
        .adapter()
        .raw_set(&cart_key, "{torn write")
        .expect("corrupt entry");

    let next = tab_over(backend, bus);
    assert!(next.cart.state().items.is_empty());
    assert!(next.adapter().raw_get(&cart_key).is_none());
}

#[test]
fn file_backed_origin_survives_process_restart() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = temp.path().join("shopfront-data");

    {
        let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(dir.clone()));
        let tab = tab_over(backend, Arc::new(StorageEventBus::new()));
        tab.cart.add_item(mug(3));
        tab.backup.create_backup();
    }

    let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(dir));
    let tab = tab_over(backend, Arc::new(StorageEventBus::new()));
    assert_eq!(tab.cart.state().item_count, 3);
    assert_eq!(tab.backup.list_backups().len(), 1);
}
