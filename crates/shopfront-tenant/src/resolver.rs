use std::collections::HashMap;
use std::sync::Arc;

use shopfront_client_state::StoreAdapter;
use shopfront_client_state::storage::StorageError;

pub const DEFAULT_TENANT_ID: &str = "default";
pub const ENV_DEFAULT_TENANT: &str = "SHOPFRONT_DEFAULT_TENANT";

const RESERVED_LABELS: [&str; 2] = ["www", "localhost"];
const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];
const ADMIN_SUFFIX: &str = "-admin";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantResolverError {
    #[error("tenant id must be 3-50 characters of [A-Za-z0-9_-]")]
    InvalidTenantId,
    #[error("domain mapping persist failed: {0}")]
    Storage(#[from] StorageError),
}

/// Which signal won the resolution. `Storage` is a cache hit from a prior
/// resolution or an explicit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Subdomain,
    CustomDomain,
    Storage,
    Default,
}

impl ResolutionSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subdomain => "subdomain",
            Self::CustomDomain => "custom_domain",
            Self::Storage => "storage",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantResolution {
    pub tenant_id: String,
    pub source: ResolutionSource,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub default_tenant_id: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_tenant_id: DEFAULT_TENANT_ID.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Build-time default, overridable through `SHOPFRONT_DEFAULT_TENANT`.
    pub fn from_env() -> Self {
        let default_tenant_id = std::env::var(ENV_DEFAULT_TENANT)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| validate_tenant_id(value))
            .unwrap_or_else(|| DEFAULT_TENANT_ID.to_string());
        Self { default_tenant_id }
    }

    pub fn with_default(default_tenant_id: impl Into<String>) -> Self {
        Self {
            default_tenant_id: default_tenant_id.into(),
        }
    }
}

/// Accepts only ids safe to embed in keys and URLs: `[A-Za-z0-9_-]`, length
/// 3 to 50 inclusive. Used to reject malformed manual overrides before they
/// are cached.
#[must_use]
pub fn validate_tenant_id(tenant_id: &str) -> bool {
    (3..=50).contains(&tenant_id.len())
        && tenant_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

/// Priority-ordered tenant resolution. Resolution is a pure function of the
/// hostname, the cached id, and the configured default, except that winning
/// hostname signals are learned back into the durable cache.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    adapter: Arc<StoreAdapter>,
    config: ResolverConfig,
}

impl TenantResolver {
    pub fn new(adapter: Arc<StoreAdapter>, config: ResolverConfig) -> Self {
        Self { adapter, config }
    }

    /// First match wins: subdomain, custom-domain mapping, cached id,
    /// configured default. Local-development hosts skip the hostname
    /// branches outright, and a headless context (no hostname at all)
    /// short-circuits to the default with an empty domain.
    pub fn resolve(&self, hostname: Option<&str>) -> TenantResolution {
        let Some(hostname) = hostname else {
            return TenantResolution {
                tenant_id: self.config.default_tenant_id.clone(),
                source: ResolutionSource::Default,
                domain: String::new(),
            };
        };

        if !LOCAL_HOSTS.contains(&hostname) {
            if let Some(tenant_id) = subdomain_tenant(hostname) {
                self.cache_tenant_id(&tenant_id);
                return TenantResolution {
                    tenant_id,
                    source: ResolutionSource::Subdomain,
                    domain: hostname.to_string(),
                };
            }
            if let Some(tenant_id) = self.domain_mapping().remove(hostname) {
                self.cache_tenant_id(&tenant_id);
                return TenantResolution {
                    tenant_id,
                    source: ResolutionSource::CustomDomain,
                    domain: hostname.to_string(),
                };
            }
        }

        if let Some(cached) = self
            .adapter
            .raw_get(&self.adapter.keys().tenant_id_key())
            .filter(|cached| !cached.trim().is_empty())
        {
            return TenantResolution {
                tenant_id: cached,
                source: ResolutionSource::Storage,
                domain: hostname.to_string(),
            };
        }

        TenantResolution {
            tenant_id: self.config.default_tenant_id.clone(),
            source: ResolutionSource::Default,
            domain: hostname.to_string(),
        }
    }

    /// Merges one entry into the persisted domain→tenant mapping without
    /// discarding unrelated entries.
    pub fn set_domain_mapping(
        &self,
        domain: &str,
        tenant_id: &str,
    ) -> Result<(), TenantResolverError> {
        if !validate_tenant_id(tenant_id) {
            return Err(TenantResolverError::InvalidTenantId);
        }
        let mut mapping = self.domain_mapping();
        mapping.insert(domain.to_string(), tenant_id.to_string());
        let key = self.adapter.keys().domain_map_key();
        let encoded =
            serde_json::to_string(&mapping).map_err(|error| StorageError::WriteFailed {
                message: format!("domain map encode failed: {error}"),
            })?;
        self.adapter.raw_set(&key, &encoded)?;
        Ok(())
    }

    fn domain_mapping(&self) -> HashMap<String, String> {
        let key = self.adapter.keys().domain_map_key();
        let Some(raw) = self.adapter.raw_get(&key) else {
            return HashMap::new();
        };
        match serde_json::from_str::<HashMap<String, String>>(&raw) {
            Ok(mapping) => mapping,
            Err(error) => {
                tracing::warn!(%key, %error, "domain mapping unreadable; treating as empty");
                HashMap::new()
            }
        }
    }

    fn cache_tenant_id(&self, tenant_id: &str) {
        let key = self.adapter.keys().tenant_id_key();
        if let Err(error) = self.adapter.raw_set(&key, tenant_id) {
            tracing::warn!(%key, %error, "tenant id cache write failed");
        }
    }
}

/// Extracts a tenant id from the hostname's leading label, if the hostname
/// has one beyond the registrable domain and the label is neither reserved
/// nor malformed. The admin panel's `-admin` marker is stripped first.
fn subdomain_tenant(hostname: &str) -> Option<String> {
    let labels = hostname.split('.').collect::<Vec<_>>();
    if labels.len() <= 2 {
        return None;
    }
    let label = labels[0];
    if RESERVED_LABELS.contains(&label) {
        return None;
    }
    let tenant_id = label.strip_suffix(ADMIN_SUFFIX).unwrap_or(label);
    validate_tenant_id(tenant_id).then(|| tenant_id.to_string())
}
