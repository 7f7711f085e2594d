use crate::domain::StateDomain;

/// Storage key layout for one application instance. The admin panel and the
/// storefront share the shape and differ only in the prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    prefix: String,
}

impl KeyLayout {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `<prefix>-<domain>-storage`: the enveloped slice for one domain.
    pub fn domain_key(&self, domain: StateDomain) -> String {
        format!("{}-{}-storage", self.prefix, domain.as_str())
    }

    /// `<prefix>-backup`: the rotating snapshot history, one JSON list.
    pub fn backup_key(&self) -> String {
        format!("{}-backup", self.prefix)
    }

    /// Raw bearer token, readable synchronously before stores rehydrate.
    pub fn token_key(&self) -> String {
        format!("{}-token", self.prefix)
    }

    /// Raw cached tenant id.
    pub fn tenant_id_key(&self) -> String {
        format!("{}-tenant-id", self.prefix)
    }

    /// Raw custom-domain to tenant-id mapping.
    pub fn domain_map_key(&self) -> String {
        format!("{}-domain-map", self.prefix)
    }

    /// Maps a storage key back to the domain that owns it. Keys outside this
    /// application's prefix, and non-enveloped keys, map to nothing.
    pub fn domain_for_key(&self, key: &str) -> Option<StateDomain> {
        let rest = key.strip_prefix(&self.prefix)?.strip_prefix('-')?;
        rest.strip_suffix("-storage")
            .and_then(StateDomain::parse)
    }
}
