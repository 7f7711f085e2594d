//! State store modules: one per persisted domain. Each store owns the
//! read/write path for its own slice, persists through the shared adapter on
//! every mutation, and exposes a `reconcile` entry the synchronizer drives
//! when a sibling context writes. Reconciliation overwrites in-memory state
//! with the validated incoming payload (last writer wins) and is idempotent.

pub mod auth;
pub mod cart;
pub mod tenant;
pub mod ui;

pub use auth::{AuthState, AuthStore, UserRecord};
pub use cart::{CartLine, CartState, CartStore, NewCartItem};
pub use tenant::{Branding, BrandingPatch, SubscriptionInfo, TenantRecord, TenantState, TenantStore};
pub use ui::{Theme, UiState, UiStore};
