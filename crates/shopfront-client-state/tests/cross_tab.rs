//! Multi-context scenarios: several `ClientState` instances sharing one
//! backend and one event bus, standing in for same-origin browser tabs.

use std::sync::Arc;

use shopfront_client_state::storage::StorageBackend;
use shopfront_client_state::stores::auth::UserRecord;
use shopfront_client_state::stores::cart::NewCartItem;
use shopfront_client_state::{ClientState, ClientStateConfig, MemoryStorage, StorageEventBus};

fn two_tabs() -> (ClientState, ClientState) {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let bus = Arc::new(StorageEventBus::new());
    let tab_a = ClientState::new(
        ClientStateConfig::storefront(),
        Arc::clone(&backend),
        Arc::clone(&bus),
    );
    let tab_b = ClientState::new(ClientStateConfig::storefront(), backend, bus);
    tab_a.initialize_all();
    tab_b.initialize_all();
    (tab_a, tab_b)
}

fn user_a() -> UserRecord {
    UserRecord {
        id: "u-a".to_string(),
        email: "a@acme.example".to_string(),
        name: None,
        role: None,
    }
}

#[test]
fn login_in_one_tab_authenticates_the_other_without_reload() {
    let (tab_a, tab_b) = two_tabs();
    assert!(!tab_b.auth.state().is_authenticated);

    tab_a.auth.login(user_a(), "tok123");

    let observed = tab_b.auth.state();
    assert!(observed.is_authenticated);
    assert_eq!(observed.user, Some(user_a()));
    assert_eq!(observed.token.as_deref(), Some("tok123"));
}

#[test]
fn logout_propagates_and_clears_the_shared_raw_token() {
    let (tab_a, tab_b) = two_tabs();
    tab_a.auth.login(user_a(), "tok123");
    tab_b.auth.logout();

    assert!(!tab_a.auth.state().is_authenticated);
    let token_key = tab_a.adapter().keys().token_key();
    assert!(tab_a.adapter().raw_get(&token_key).is_none());
}

#[test]
fn cart_mutations_converge_across_tabs() {
    let (tab_a, tab_b) = two_tabs();
    tab_a.cart.add_item(NewCartItem {
        product_id: "p-mug".to_string(),
        name: "Mug".to_string(),
        image_url: None,
        unit_price_cents: 1250,
        quantity: 2,
    });

    let observed = tab_b.cart.state();
    assert_eq!(observed.item_count, 2);
    assert_eq!(observed.total_cents, 2500);

    // The receiving tab keeps mutating on top of the reconciled state.
    tab_b.cart.update_quantity("p-mug", 5);
    assert_eq!(tab_a.cart.state().item_count, 5);
}

#[test]
fn delivering_the_same_envelope_twice_leaves_state_unchanged() {
    let (tab_a, tab_b) = two_tabs();
    tab_a.cart.add_item(NewCartItem {
        product_id: "p-mug".to_string(),
        name: "Mug".to_string(),
        image_url: None,
        unit_price_cents: 1250,
        quantity: 1,
    });
    let once = tab_b.cart.state();

    // Re-publishing the persisted value is what a duplicate storage event
    // looks like to the synchronizer.
    let key = tab_a
        .adapter()
        .keys()
        .domain_key(shopfront_client_state::StateDomain::Cart);
    let raw = tab_a.adapter().raw_get(&key).expect("persisted cart");
    tab_a
        .adapter()
        .bus()
        .publish(&shopfront_client_state::StorageEvent {
            key,
            new_value: Some(raw),
        });

    assert_eq!(tab_b.cart.state(), once);
}

#[test]
fn racing_writers_resolve_last_writer_wins() {
    // Both tabs read the same base state, then write independently. The
    // second write supersedes the first and the first increment is dropped.
    // This is the accepted weak-consistency behavior of the storage channel,
    // not a defect to lock away.
    let (tab_a, tab_b) = two_tabs();
    let item = |qty| NewCartItem {
        product_id: "p-mug".to_string(),
        name: "Mug".to_string(),
        image_url: None,
        unit_price_cents: 1000,
        quantity: qty,
    };

    // Tab A computes its write from the shared base but tab B's write lands
    // after and was derived from the same (empty) base.
    tab_a.sync().unsubscribe(shopfront_client_state::StateDomain::Cart);
    tab_a.cart.add_item(item(1));
    tab_b.cart.add_item(item(3));
    tab_a.sync().destroy();

    tab_a.cart.initialize();
    let converged = tab_a.cart.state();
    assert_eq!(converged.item_count, 4, "tab B merged on top of A's write");

    // Replay the true race: B reconciled nothing before writing.
    let (tab_c, tab_d) = two_tabs();
    tab_d.sync().unsubscribe(shopfront_client_state::StateDomain::Cart);
    tab_c.sync().unsubscribe(shopfront_client_state::StateDomain::Cart);
    tab_c.cart.add_item(item(1));
    // Tab D never observed C's write; its base is stale.
    tab_d.cart.add_item(item(3));

    tab_c.cart.initialize();
    assert_eq!(
        tab_c.cart.state().item_count,
        3,
        "stale base write wins wholesale; the concurrent increment is lost"
    );
}

#[test]
fn corrupt_external_write_is_never_delivered_and_heals_on_read() {
    let (tab_a, tab_b) = two_tabs();
    tab_a.ui.set_locale("fr-FR");

    // Something outside the application scribbles over the cart key.
    let key = tab_a
        .adapter()
        .keys()
        .domain_key(shopfront_client_state::StateDomain::Cart);
    tab_a
        .adapter()
        .raw_set(&key, "{scribble")
        .expect("seed corrupt value");
    tab_a
        .adapter()
        .bus()
        .publish(&shopfront_client_state::StorageEvent {
            key: key.clone(),
            new_value: Some("{scribble".to_string()),
        });

    // Neither tab applied it, and the next read purges the entry.
    assert!(tab_a.cart.state().items.is_empty());
    assert!(tab_b.cart.state().items.is_empty());
    tab_b.cart.initialize();
    assert!(tab_a.adapter().raw_get(&key).is_none());
}
