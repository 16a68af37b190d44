//! Typed shapes of the events passed between stages.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};

use flurry_core::Item;

/// Inbound event received by the collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// Event body; anything falsy stands for an empty mapping.
    pub detail: Value,
}

impl From<Map<String, Value>> for Envelope {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            detail: fields.remove("detail").unwrap_or_default(),
        }
    }
}

/// Location of a staged blob, as returned by the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobReference {
    pub container: String,
    pub key: String,
}

impl BlobReference {
    /// Resolve the location from a validator input.
    ///
    /// `s3_bucket`/`s3_key` are tried first, then `bucket`/`key`; the two
    /// conventions are never mixed. Non-string or empty values count as
    /// absent.
    pub fn from_event(event: &Value) -> Option<Self> {
        let fields = event.as_object()?;
        [("s3_bucket", "s3_key"), ("bucket", "key")]
            .into_iter()
            .find_map(|(container, key)| {
                Some(Self {
                    container: non_empty(fields, container)?,
                    key: non_empty(fields, key)?,
                })
            })
    }

    /// Collector result: `{"s3_bucket": .., "s3_key": ..}`.
    pub fn into_value(self) -> Value {
        json!({
            "s3_bucket": self.container,
            "s3_key": self.key,
        })
    }
}

fn non_empty(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Staged event body as read by the validator.
///
/// Required fields stay untyped until coercion. `metadata` distinguishes an
/// explicit `null` (`Some(Value::Null)`) from an absent field (`None`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub event_type: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub metadata: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A validated event, ready for the table.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub user_id: String,
    pub event_ts: String,
    pub event_type: String,
    pub metadata: Value,
    /// Container of the originating blob.
    pub source_container: String,
    /// Key of the originating blob.
    pub source_key: String,
}

impl NormalizedRecord {
    /// Table item form, with the traceability keys `_s3_bucket`/`_s3_key`.
    pub fn into_item(self) -> Item {
        let mut item = Map::new();
        item.insert("user_id".to_string(), Value::String(self.user_id));
        item.insert("event_ts".to_string(), Value::String(self.event_ts));
        item.insert("event_type".to_string(), Value::String(self.event_type));
        item.insert("metadata".to_string(), self.metadata);
        item.insert("_s3_bucket".to_string(), Value::String(self.source_container));
        item.insert("_s3_key".to_string(), Value::String(self.source_key));
        item
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.into_item())
    }
}

/// Result of the validator in persist mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistSummary {
    pub table: String,
    pub user_id: String,
    pub event_ts: String,
}

impl PersistSummary {
    pub fn into_value(self) -> Value {
        json!({
            "status": "ok",
            "table": self.table,
            "user_id": self.user_id,
            "event_ts": self.event_ts,
        })
    }
}

/// Result of the writer. `pk`/`sk` echo the item's key values as supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSummary {
    pub table: String,
    pub pk: Value,
    pub sk: Value,
}

impl WriteSummary {
    pub fn into_value(self) -> Value {
        json!({
            "status": "ok",
            "put": {
                "table": self.table,
                "pk": self.pk,
                "sk": self.sk,
            },
        })
    }
}
