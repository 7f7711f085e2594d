use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version stamped into every envelope written by this build.
pub const STATE_SCHEMA_VERSION: &str = "2";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope payload is not valid json: {message}")]
    Json { message: String },
    #[error("envelope is missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("envelope field `{field}` has the wrong type")]
    WrongType { field: &'static str },
}

/// The unit stored under one durable key: an opaque domain payload plus the
/// schema version and creation instant it was written with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub state: Value,
    pub version: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl Envelope {
    /// Wraps a domain payload with the current schema version and now-ms.
    pub fn wrap(state: Value) -> Self {
        Self {
            state,
            version: STATE_SCHEMA_VERSION.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Parses a raw persisted value. An entry that parses but lacks `state`
    /// or `version` is invalid and must never reach a caller.
    pub fn decode(raw: &str) -> Result<Self, EnvelopeError> {
        let value = serde_json::from_str::<Value>(raw).map_err(|error| EnvelopeError::Json {
            message: error.to_string(),
        })?;
        let Value::Object(mut fields) = value else {
            return Err(EnvelopeError::WrongType { field: "envelope" });
        };
        let state = fields
            .remove("state")
            .ok_or(EnvelopeError::MissingField { field: "state" })?;
        let version = match fields.remove("version") {
            Some(Value::String(version)) => version,
            Some(_) => return Err(EnvelopeError::WrongType { field: "version" }),
            None => return Err(EnvelopeError::MissingField { field: "version" }),
        };
        let timestamp = match fields.remove("timestamp") {
            Some(Value::Number(number)) => number.as_i64().unwrap_or(0),
            _ => 0,
        };
        Ok(Self {
            state,
            version,
            timestamp,
        })
    }

    pub fn encode(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(|error| EnvelopeError::Json {
            message: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Envelope, EnvelopeError, STATE_SCHEMA_VERSION};
    use serde_json::json;

    #[test]
    fn wrap_stamps_current_version_and_timestamp() {
        let envelope = Envelope::wrap(json!({"theme": "dark"}));
        assert_eq!(envelope.version, STATE_SCHEMA_VERSION);
        assert!(envelope.timestamp > 0);
    }

    #[test]
    fn decode_roundtrips_encoded_envelope() {
        let envelope = Envelope::wrap(json!({"items": []}));
        let raw = envelope.encode().expect("encode envelope");
        let decoded = Envelope::decode(&raw).expect("decode envelope");
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn decode_rejects_missing_state() {
        let error = Envelope::decode(r#"{"version":"2","timestamp":1}"#).expect_err("must fail");
        assert_eq!(error, EnvelopeError::MissingField { field: "state" });
    }

    #[test]
    fn decode_rejects_missing_version() {
        let error = Envelope::decode(r#"{"state":{},"timestamp":1}"#).expect_err("must fail");
        assert_eq!(error, EnvelopeError::MissingField { field: "version" });
    }

    #[test]
    fn decode_rejects_non_object_payload() {
        let error = Envelope::decode("[1,2,3]").expect_err("must fail");
        assert_eq!(error, EnvelopeError::WrongType { field: "envelope" });
    }

    #[test]
    fn decode_rejects_unparsable_json() {
        assert!(matches!(
            Envelope::decode("{not json"),
            Err(EnvelopeError::Json { .. })
        ));
    }

    #[test]
    fn decode_defaults_missing_timestamp_to_zero() {
        let decoded = Envelope::decode(r#"{"state":{},"version":"2"}"#).expect("decode envelope");
        assert_eq!(decoded.timestamp, 0);
    }
}
