use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::stores::auth::AuthState;
use crate::stores::cart::CartState;
use crate::stores::tenant::TenantState;
use crate::stores::ui::UiState;

/// The four independently persisted slices of client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateDomain {
    Auth,
    Cart,
    Tenant,
    Ui,
}

impl StateDomain {
    pub const ALL: [Self; 4] = [Self::Auth, Self::Cart, Self::Tenant, Self::Ui];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Cart => "cart",
            Self::Tenant => "tenant",
            Self::Ui => "ui",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "auth" => Some(Self::Auth),
            "cart" => Some(Self::Cart),
            "tenant" => Some(Self::Tenant),
            "ui" => Some(Self::Ui),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{domain} state does not match the expected shape: {message}")]
    Shape { domain: &'static str, message: String },
    #[error("{domain}.{field} is invalid: {reason}")]
    Field {
        domain: &'static str,
        field: &'static str,
        reason: &'static str,
    },
}

/// One domain's typed state. The `Default` value must itself validate, so a
/// caller can never observe an unvalidated state.
pub trait DomainState: Serialize + DeserializeOwned + Default + Clone {
    const DOMAIN: StateDomain;

    fn validate(&self) -> Result<(), ValidationError>;
}

/// Decodes and validates an opaque payload against its domain's typed state.
/// This is the dynamic entry used by the repair pass and the synchronizer,
/// where the domain is only known at runtime.
pub fn validate_payload(domain: StateDomain, state: &Value) -> Result<(), ValidationError> {
    match domain {
        StateDomain::Auth => decode_and_validate::<AuthState>(state),
        StateDomain::Cart => decode_and_validate::<CartState>(state),
        StateDomain::Tenant => decode_and_validate::<TenantState>(state),
        StateDomain::Ui => decode_and_validate::<UiState>(state),
    }
}

fn decode_and_validate<T: DomainState>(state: &Value) -> Result<(), ValidationError> {
    let decoded =
        serde_json::from_value::<T>(state.clone()).map_err(|error| ValidationError::Shape {
            domain: T::DOMAIN.as_str(),
            message: error.to_string(),
        })?;
    decoded.validate()
}
