use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::StoreAdapter;
use crate::domain::{DomainState, StateDomain, ValidationError};

/// Complete branding record. Never partially populated: incoming patches are
/// merged over these defaults before they reach state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    pub shop_name: String,
    pub primary_color: String,
    pub secondary_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            shop_name: "Shopfront".to_string(),
            primary_color: "#1a1a2e".to_string(),
            secondary_color: "#0f3460".to_string(),
            logo_url: None,
        }
    }
}

impl Branding {
    pub fn merged(patch: Option<&BrandingPatch>) -> Self {
        let mut branding = Self::default();
        let Some(patch) = patch else {
            return branding;
        };
        if let Some(shop_name) = &patch.shop_name {
            branding.shop_name = shop_name.clone();
        }
        if let Some(primary_color) = &patch.primary_color {
            branding.primary_color = primary_color.clone();
        }
        if let Some(secondary_color) = &patch.secondary_color {
            branding.secondary_color = secondary_color.clone();
        }
        if patch.logo_url.is_some() {
            branding.logo_url = patch.logo_url.clone();
        }
        branding
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub plan: String,
    pub status: String,
}

/// Full tenant record as served by the tenant-info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<BrandingPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantState {
    pub tenant: Option<TenantRecord>,
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub branding: Branding,
}

impl Default for TenantState {
    fn default() -> Self {
        Self {
            tenant: None,
            tenant_id: None,
            branding: Branding::default(),
        }
    }
}

impl DomainState for TenantState {
    const DOMAIN: StateDomain = StateDomain::Tenant;

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(tenant_id) = &self.tenant_id
            && tenant_id.trim().is_empty()
        {
            return Err(ValidationError::Field {
                domain: "tenant",
                field: "tenantId",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

/// Tenant identity: which tenant this session belongs to, the full record
/// once fetched, and the always-complete branding derived from it. The
/// resolved id is also cached raw so resolution can read it synchronously.
#[derive(Debug)]
pub struct TenantStore {
    adapter: Arc<StoreAdapter>,
    state: Mutex<TenantState>,
}

impl TenantStore {
    pub fn new(adapter: Arc<StoreAdapter>) -> Self {
        Self {
            adapter,
            state: Mutex::new(TenantState::default()),
        }
    }

    pub fn state(&self) -> TenantState {
        self.lock().clone()
    }

    pub fn set_tenant(&self, record: TenantRecord) {
        let snapshot = {
            let mut state = self.lock();
            state.tenant_id = Some(record.id.clone());
            state.branding = Branding::merged(record.branding.as_ref());
            state.tenant = Some(record);
            state.clone()
        };
        self.persist(&snapshot);
        if let Some(tenant_id) = &snapshot.tenant_id {
            self.cache_tenant_id(tenant_id);
        }
    }

    /// Records the resolved id before the full record is fetched.
    pub fn set_tenant_id(&self, tenant_id: &str) {
        let snapshot = {
            let mut state = self.lock();
            state.tenant_id = Some(tenant_id.to_string());
            state.clone()
        };
        self.persist(&snapshot);
        self.cache_tenant_id(tenant_id);
    }

    pub fn clear(&self) {
        let snapshot = {
            let mut state = self.lock();
            *state = TenantState::default();
            state.clone()
        };
        self.persist(&snapshot);
        self.adapter
            .raw_remove(&self.adapter.keys().tenant_id_key());
    }

    pub fn initialize(&self) {
        let mut persisted = self.adapter.read_state::<TenantState>();
        if persisted.tenant_id.is_none() {
            persisted.tenant_id = self
                .adapter
                .raw_get(&self.adapter.keys().tenant_id_key())
                .filter(|cached| !cached.trim().is_empty());
        }
        *self.lock() = persisted;
    }

    pub fn reconcile(&self, payload: Value) {
        match serde_json::from_value::<TenantState>(payload) {
            Ok(incoming) if incoming.validate().is_ok() => {
                *self.lock() = incoming;
            }
            Ok(_) | Err(_) => {
                tracing::warn!(domain = "tenant", "dropping invalid reconcile payload");
            }
        }
    }

    fn cache_tenant_id(&self, tenant_id: &str) {
        let key = self.adapter.keys().tenant_id_key();
        if let Err(error) = self.adapter.raw_set(&key, tenant_id) {
            tracing::warn!(domain = "tenant", %error, "tenant id cache write failed");
        }
    }

    fn persist(&self, snapshot: &TenantState) {
        if let Err(error) = self.adapter.write(snapshot) {
            tracing::warn!(domain = "tenant", %error, "persist failed; in-memory state kept");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TenantState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
