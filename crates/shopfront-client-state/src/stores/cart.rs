use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::adapter::StoreAdapter;
use crate::domain::{DomainState, StateDomain, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub line_id: String,
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub items: Vec<CartLine>,
    pub total_cents: i64,
    pub item_count: u32,
}

impl CartState {
    fn derived_totals(items: &[CartLine]) -> (i64, u32) {
        let total = items
            .iter()
            .map(|line| line.unit_price_cents * i64::from(line.quantity))
            .sum();
        let count = items.iter().map(|line| line.quantity).sum();
        (total, count)
    }

    /// Recomputes both derived fields from the full item list. Mutators call
    /// this after every change; derived fields are never adjusted in place.
    fn recompute(&mut self) {
        let (total, count) = Self::derived_totals(&self.items);
        self.total_cents = total;
        self.item_count = count;
    }
}

impl DomainState for CartState {
    const DOMAIN: StateDomain = StateDomain::Cart;

    fn validate(&self) -> Result<(), ValidationError> {
        if self.items.iter().any(|line| line.unit_price_cents < 0) {
            return Err(ValidationError::Field {
                domain: "cart",
                field: "unitPriceCents",
                reason: "must not be negative",
            });
        }
        let (total, count) = Self::derived_totals(&self.items);
        if self.total_cents != total || self.item_count != count {
            return Err(ValidationError::Field {
                domain: "cart",
                field: "totalCents",
                reason: "derived totals out of sync with items",
            });
        }
        Ok(())
    }
}

/// Input for `add_item`: everything but the line id, which the store mints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

#[derive(Debug)]
pub struct CartStore {
    adapter: Arc<StoreAdapter>,
    state: Mutex<CartState>,
}

impl CartStore {
    pub fn new(adapter: Arc<StoreAdapter>) -> Self {
        Self {
            adapter,
            state: Mutex::new(CartState::default()),
        }
    }

    pub fn state(&self) -> CartState {
        self.lock().clone()
    }

    /// Adds a line, merging into an existing line for the same product by
    /// incrementing its quantity. A zero-quantity add is a no-op; a cart
    /// never holds zero-quantity lines.
    pub fn add_item(&self, item: NewCartItem) {
        if item.quantity == 0 {
            return;
        }
        let snapshot = {
            let mut state = self.lock();
            if let Some(existing) = state
                .items
                .iter_mut()
                .find(|line| line.product_id == item.product_id)
            {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            } else {
                state.items.push(CartLine {
                    line_id: Uuid::new_v4().to_string(),
                    product_id: item.product_id,
                    name: item.name,
                    image_url: item.image_url,
                    unit_price_cents: item.unit_price_cents,
                    quantity: item.quantity,
                });
            }
            state.recompute();
            state.clone()
        };
        self.persist(&snapshot);
    }

    /// A quantity of zero or less removes the line outright.
    pub fn update_quantity(&self, product_id: &str, quantity: i64) {
        let snapshot = {
            let mut state = self.lock();
            if quantity <= 0 {
                state.items.retain(|line| line.product_id != product_id);
            } else if let Some(line) = state
                .items
                .iter_mut()
                .find(|line| line.product_id == product_id)
            {
                line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            }
            state.recompute();
            state.clone()
        };
        self.persist(&snapshot);
    }

    pub fn remove_item(&self, product_id: &str) {
        let snapshot = {
            let mut state = self.lock();
            state.items.retain(|line| line.product_id != product_id);
            state.recompute();
            state.clone()
        };
        self.persist(&snapshot);
    }

    pub fn clear_cart(&self) {
        let snapshot = {
            let mut state = self.lock();
            *state = CartState::default();
            state.clone()
        };
        self.persist(&snapshot);
    }

    pub fn initialize(&self) {
        let persisted = self.adapter.read_state::<CartState>();
        *self.lock() = persisted;
    }

    pub fn reconcile(&self, payload: Value) {
        match serde_json::from_value::<CartState>(payload) {
            Ok(incoming) if incoming.validate().is_ok() => {
                *self.lock() = incoming;
            }
            Ok(_) | Err(_) => {
                tracing::warn!(domain = "cart", "dropping invalid reconcile payload");
            }
        }
    }

    fn persist(&self, snapshot: &CartState) {
        if let Err(error) = self.adapter.write(snapshot) {
            tracing::warn!(domain = "cart", %error, "persist failed; in-memory state kept");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
