//! Collector: stage an inbound event as a date-partitioned blob.

use bytes::Bytes;
use chrono::{DateTime, Timelike, Utc};
use serde_json::{Map, Value};
use snafu::prelude::*;
use tracing::{info, instrument};
use uuid::Uuid;

use flurry_core::emit;
use flurry_core::metrics::events::{BlobBytesWritten, EventCollected};
use flurry_core::{BlobStoreRef, DatePartition};

use crate::config::CollectorConfig;
use crate::error::{
    BlobWriteSnafu, CollectError, EncodeDetailSnafu, InvalidDetailSnafu, InvalidEnvelopeSnafu,
    InvalidPartitionSnafu, InvalidTimestampSnafu, json_type,
};
use crate::types::{BlobReference, Envelope};

/// Stages events in the configured container.
#[derive(Clone)]
pub struct Collector {
    config: CollectorConfig,
    blobs: BlobStoreRef,
}

impl Collector {
    pub fn new(config: CollectorConfig, blobs: BlobStoreRef) -> Self {
        Self { config, blobs }
    }

    /// Stage `event`, stamping the current time if it has no timestamp.
    pub async fn collect(&self, event: Value) -> Result<BlobReference, CollectError> {
        self.collect_at(event, Utc::now()).await
    }

    /// Stage `event`, using `now` for a missing timestamp.
    #[instrument(skip_all, fields(container = %self.config.bucket))]
    pub async fn collect_at(
        &self,
        event: Value,
        now: DateTime<Utc>,
    ) -> Result<BlobReference, CollectError> {
        let envelope = match event {
            Value::Object(fields) => Envelope::from(fields),
            other => {
                return InvalidEnvelopeSnafu {
                    found: json_type(&other),
                }
                .fail();
            }
        };
        let mut detail = detail_map(envelope.detail)?;

        let timestamp = match detail.get("timestamp") {
            None => {
                let timestamp = default_timestamp(now);
                detail.insert("timestamp".to_string(), Value::String(timestamp.clone()));
                timestamp
            }
            Some(Value::String(timestamp)) => timestamp.clone(),
            Some(other) => {
                return InvalidTimestampSnafu {
                    found: json_type(other),
                }
                .fail();
            }
        };

        let partition = DatePartition::from_timestamp(&timestamp)
            .context(InvalidPartitionSnafu { timestamp: &timestamp })?;
        let key = partition.key(&format!("{}.json", Uuid::new_v4().simple()));

        let body = serde_json::to_vec(&detail).context(EncodeDetailSnafu)?;
        let bytes = body.len() as u64;

        let container = &self.config.bucket;
        self.blobs
            .put(container, &key, Bytes::from(body))
            .await
            .context(BlobWriteSnafu { container, key: &key })?;

        emit!(EventCollected {
            container: container.clone(),
        });
        emit!(BlobBytesWritten { bytes });
        info!(key = %key, bytes, "Staged event");

        Ok(BlobReference {
            container: container.clone(),
            key,
        })
    }
}

/// Falsy details become an empty mapping; any other non-object is rejected.
fn detail_map(detail: Value) -> Result<Map<String, Value>, CollectError> {
    match detail {
        Value::Object(map) => Ok(map),
        falsy if !is_truthy(&falsy) => Ok(Map::new()),
        other => InvalidDetailSnafu {
            found: json_type(&other),
        }
        .fail(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Current-time stamp: `YYYY-MM-DDTHH:MM:SS[.ffffff]Z`, with the fraction
/// only when the microseconds are non-zero.
pub fn default_timestamp(now: DateTime<Utc>) -> String {
    let seconds = now.format("%Y-%m-%dT%H:%M:%S");
    match now.nanosecond() / 1_000 {
        0 => format!("{seconds}Z"),
        micros => format!("{seconds}.{micros:06}Z"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use flurry_core::error::StorageError;
    use flurry_core::{BlobStore, ObjectBlobStore, StoragePool, UrlTemplate};
    use serde_json::json;
    use std::sync::Arc;

    fn memory_blobs() -> Arc<ObjectBlobStore> {
        let template = UrlTemplate::new("memory://{container}", UrlTemplate::CONTAINER).unwrap();
        Arc::new(ObjectBlobStore::new(Arc::new(StoragePool::new()), template))
    }

    fn collector(blobs: BlobStoreRef) -> Collector {
        Collector::new(
            CollectorConfig {
                bucket: "raw-events".to_string(),
            },
            blobs,
        )
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
    }

    fn assert_key_shape(key: &str, prefix: &str) {
        let name = key
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(".json"))
            .unwrap_or_else(|| panic!("unexpected key {key}"));
        assert_eq!(name.len(), 32);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_collect_stages_detail() {
        let blobs = memory_blobs();
        let collector = collector(blobs.clone());

        let detail = json!({"user_id": 7, "event_type": "login", "timestamp": "2024-03-05T10:00:00Z"});
        let location = collector
            .collect(json!({"detail": detail.clone()}))
            .await
            .unwrap();

        assert_eq!(location.container, "raw-events");
        assert_key_shape(&location.key, "year=2024/month=03/day=05/");

        let body = blobs.get("raw-events", &location.key).await.unwrap();
        let stored: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stored, detail);
    }

    #[tokio::test]
    async fn test_big_integers_are_staged_verbatim() {
        let blobs = memory_blobs();
        let event: Value = serde_json::from_str(
            r#"{"detail": {"user_id": 12345678901234567890123, "event_type": "e", "timestamp": "2024-03-05", "metadata": {"n": -9223372036854775809}}}"#,
        )
        .unwrap();
        let detail = event["detail"].clone();

        let location = collector(blobs.clone()).collect(event).await.unwrap();

        let body = blobs.get("raw-events", &location.key).await.unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains(r#""user_id":12345678901234567890123"#), "body: {text}");
        assert!(text.contains(r#""n":-9223372036854775809"#), "body: {text}");

        let stored: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stored, detail);
    }

    #[tokio::test]
    async fn test_missing_timestamp_is_synthesized() {
        let blobs = memory_blobs();
        let collector = collector(blobs.clone());

        let location = collector
            .collect_at(json!({"detail": {"user_id": "u1"}}), fixed_now())
            .await
            .unwrap();
        assert_key_shape(&location.key, "year=2024/month=03/day=05/");

        let body = blobs.get("raw-events", &location.key).await.unwrap();
        let stored: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stored, json!({"user_id": "u1", "timestamp": "2024-03-05T10:00:00Z"}));
    }

    #[tokio::test]
    async fn test_falsy_detail_becomes_empty() {
        for detail in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            let blobs = memory_blobs();
            let location = collector(blobs.clone())
                .collect_at(json!({ "detail": detail }), fixed_now())
                .await
                .unwrap();

            let body = blobs.get("raw-events", &location.key).await.unwrap();
            let stored: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(stored, json!({"timestamp": "2024-03-05T10:00:00Z"}));
        }

        // No detail at all
        let location = collector(memory_blobs())
            .collect_at(json!({"source": "app"}), fixed_now())
            .await
            .unwrap();
        assert_key_shape(&location.key, "year=2024/month=03/day=05/");
    }

    #[tokio::test]
    async fn test_truthy_non_object_detail_is_rejected() {
        for detail in [json!("text"), json!(1), json!([1])] {
            let err = collector(memory_blobs())
                .collect(json!({ "detail": detail }))
                .await
                .unwrap_err();
            assert!(matches!(err, CollectError::InvalidDetail { .. }));
        }
    }

    #[tokio::test]
    async fn test_envelope_must_be_object() {
        let err = collector(memory_blobs())
            .collect(json!([{"detail": {}}]))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::InvalidEnvelope { .. }));
    }

    #[tokio::test]
    async fn test_bad_timestamps() {
        let err = collector(memory_blobs())
            .collect(json!({"detail": {"timestamp": null}}))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::InvalidTimestamp { .. }));

        let err = collector(memory_blobs())
            .collect(json!({"detail": {"timestamp": "20240305T100000Z"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::InvalidPartition { .. }));
    }

    #[tokio::test]
    async fn test_partition_values_are_verbatim() {
        let location = collector(memory_blobs())
            .collect(json!({"detail": {"timestamp": "2024-3-5 10:00"}}))
            .await
            .unwrap();
        assert!(location.key.starts_with("year=2024/month=3/day=5 1"));
    }

    struct FailingBlobs;

    #[async_trait]
    impl BlobStore for FailingBlobs {
        async fn put(&self, _: &str, _: &str, _: Bytes) -> Result<(), StorageError> {
            Err(StorageError::InvalidUrl {
                url: "unreachable".to_string(),
            })
        }

        async fn get(&self, _: &str, _: &str) -> Result<Bytes, StorageError> {
            unreachable!("collector never reads")
        }
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let err = collector(Arc::new(FailingBlobs))
            .collect(json!({"detail": {"timestamp": "2024-03-05"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::BlobWrite { .. }));
    }

    #[test]
    fn test_default_timestamp_format() {
        assert_eq!(default_timestamp(fixed_now()), "2024-03-05T10:00:00Z");

        let with_micros = fixed_now() + chrono::Duration::microseconds(123);
        assert_eq!(default_timestamp(with_micros), "2024-03-05T10:00:00.000123Z");

        // Sub-microsecond precision is dropped
        let with_nanos = fixed_now() + chrono::Duration::nanoseconds(999);
        assert_eq!(default_timestamp(with_nanos), "2024-03-05T10:00:00Z");
    }
}
