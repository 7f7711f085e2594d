//! Schema migrations applied when a persisted envelope carries an older
//! version than the current build writes. One transform per domain and
//! version step; an unknown version means the entry is treated as corrupt.

use serde_json::{Map, Value, json};

use crate::domain::StateDomain;
use crate::envelope::STATE_SCHEMA_VERSION;
use crate::stores::tenant::Branding;

/// Brings a payload written under `version` up to the current schema.
/// Returns `None` when no migration path exists.
pub fn migrate(domain: StateDomain, version: &str, state: Value) -> Option<Value> {
    match version {
        STATE_SCHEMA_VERSION => Some(state),
        "1" => Some(migrate_v1(domain, state)),
        _ => None,
    }
}

fn migrate_v1(domain: StateDomain, state: Value) -> Value {
    let Value::Object(fields) = state else {
        // Shape trouble is the validator's call, not the migration's.
        return state;
    };
    match domain {
        StateDomain::Auth => migrate_auth_v1(fields),
        StateDomain::Cart => migrate_cart_v1(fields),
        StateDomain::Tenant => migrate_tenant_v1(fields),
        StateDomain::Ui => migrate_ui_v1(fields),
    }
}

/// v1 persisted the bearer credential under `accessToken`.
fn migrate_auth_v1(mut fields: Map<String, Value>) -> Value {
    if let Some(token) = fields.remove("accessToken")
        && !fields.contains_key("token")
    {
        fields.insert("token".to_string(), token);
    }
    Value::Object(fields)
}

/// v1 carried float dollar prices and no stable line ids; v2 uses integer
/// cents and a uuid per line. Derived totals are recomputed, never carried.
fn migrate_cart_v1(mut fields: Map<String, Value>) -> Value {
    let mut total_cents: i64 = 0;
    let mut item_count: u64 = 0;
    if let Some(Value::Array(items)) = fields.get_mut("items") {
        for item in items.iter_mut() {
            let Value::Object(line) = item else { continue };
            if let Some(price) = line.remove("price").and_then(|p| p.as_f64().map(cents)) {
                line.insert("unitPriceCents".to_string(), json!(price));
            }
            if !line.contains_key("lineId") {
                line.insert(
                    "lineId".to_string(),
                    json!(uuid::Uuid::new_v4().to_string()),
                );
            }
            let quantity = line.get("quantity").and_then(Value::as_u64).unwrap_or(0);
            let unit = line
                .get("unitPriceCents")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            total_cents += unit * quantity as i64;
            item_count += quantity;
        }
    }
    fields.remove("total");
    fields.remove("itemCount");
    fields.insert("totalCents".to_string(), json!(total_cents));
    fields.insert("itemCount".to_string(), json!(item_count));
    Value::Object(fields)
}

/// v1 allowed a partial branding record; v2 requires a complete one, so the
/// stored fields are merged over the defaults.
fn migrate_tenant_v1(mut fields: Map<String, Value>) -> Value {
    let defaults = match serde_json::to_value(Branding::default()) {
        Ok(Value::Object(defaults)) => defaults,
        _ => Map::new(),
    };
    let mut branding = defaults;
    if let Some(Value::Object(partial)) = fields.remove("branding") {
        for (key, value) in partial {
            branding.insert(key, value);
        }
    }
    fields.insert("branding".to_string(), Value::Object(branding));
    Value::Object(fields)
}

/// v1 stored a `darkMode` boolean; v2 stores a three-way theme.
fn migrate_ui_v1(mut fields: Map<String, Value>) -> Value {
    if !fields.contains_key("theme") {
        let theme = match fields.get("darkMode").and_then(Value::as_bool) {
            Some(true) => "dark",
            Some(false) => "light",
            None => "system",
        };
        fields.insert("theme".to_string(), json!(theme));
    }
    fields.remove("darkMode");
    Value::Object(fields)
}

fn cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}
