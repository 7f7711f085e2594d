//! Tenant resolution for the shopfront client applications.
//!
//! Decides which tenant a browser session belongs to from a priority-ordered
//! set of signals (subdomain, persisted custom-domain mapping, cached id,
//! configured default) and exposes the async tenant-info directory client.

pub mod directory;
pub mod resolver;

pub use directory::{HttpTenantDirectory, TenantDirectory, TenantFetchError};
pub use resolver::{
    DEFAULT_TENANT_ID, ENV_DEFAULT_TENANT, ResolutionSource, ResolverConfig, TenantResolution,
    TenantResolver, TenantResolverError, validate_tenant_id,
};
