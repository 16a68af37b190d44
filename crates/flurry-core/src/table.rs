//! Key-value table persistence.
//!
//! Items are JSON objects identified by a partition key and a sort key. The
//! only write is a full-overwrite upsert.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use serde_json::{Map, Value};
use snafu::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::config::UrlTemplate;
use crate::error::{
    DeserializeItemSnafu, InvalidKeyAttributeSnafu, MissingKeyAttributeSnafu, NotAnObjectSnafu,
    SerializeItemSnafu, TableError, TableStorageSnafu,
};
use crate::storage::StoragePoolRef;

/// A table item.
pub type Item = Map<String, Value>;

/// Reference-counted table store.
pub type TableStoreRef = Arc<dyn TableStore>;

/// Attribute names that form an item's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: String,
}

impl Default for KeySchema {
    fn default() -> Self {
        Self {
            partition_key: "user_id".to_string(),
            sort_key: "event_ts".to_string(),
        }
    }
}

impl KeySchema {
    /// Extract the (partition, sort) key values from an item.
    pub fn key_of(&self, item: &Item) -> Result<(String, String), TableError> {
        Ok((
            key_value(item, &self.partition_key)?,
            key_value(item, &self.sort_key)?,
        ))
    }
}

fn key_value(item: &Item, attribute: &str) -> Result<String, TableError> {
    match item.get(attribute) {
        None | Some(Value::Null) => MissingKeyAttributeSnafu { attribute }.fail(),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => InvalidKeyAttributeSnafu {
            attribute,
            found: other.to_string(),
        }
        .fail(),
    }
}

/// Named tables of items.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Insert or fully replace the item with the same key.
    async fn put_item(&self, table: &str, item: &Item) -> Result<(), TableError>;

    /// Read the item with the given key, if any.
    async fn get_item(&self, table: &str, pk: &str, sk: &str) -> Result<Option<Item>, TableError>;
}

/// [`TableStore`] that keeps one JSON object per item in object storage,
/// at `<table-url>/<pk>/<sk>.json`.
#[derive(Debug, Clone)]
pub struct ObjectTableStore {
    pool: StoragePoolRef,
    template: UrlTemplate,
    schema: KeySchema,
}

impl ObjectTableStore {
    pub fn new(pool: StoragePoolRef, template: UrlTemplate) -> Self {
        Self::with_schema(pool, template, KeySchema::default())
    }

    pub fn with_schema(pool: StoragePoolRef, template: UrlTemplate, schema: KeySchema) -> Self {
        Self {
            pool,
            template,
            schema,
        }
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    fn item_path(pk: &str, sk: &str) -> Path {
        // Each key is a single path part, so a '/' inside a key is escaped
        Path::from_iter([pk.to_string(), format!("{sk}.json")])
    }
}

#[async_trait]
impl TableStore for ObjectTableStore {
    async fn put_item(&self, table: &str, item: &Item) -> Result<(), TableError> {
        let (pk, sk) = self.schema.key_of(item)?;
        let body = serde_json::to_vec(item).context(SerializeItemSnafu)?;

        let provider = self
            .pool
            .get_or_create(&self.template.render(table))
            .await
            .context(TableStorageSnafu { table })?;

        let path = Self::item_path(&pk, &sk);
        debug!(table, %path, "Putting item");
        provider
            .put_json(&path, Bytes::from(body))
            .await
            .context(TableStorageSnafu { table })
    }

    async fn get_item(&self, table: &str, pk: &str, sk: &str) -> Result<Option<Item>, TableError> {
        let provider = self
            .pool
            .get_or_create(&self.template.render(table))
            .await
            .context(TableStorageSnafu { table })?;

        let path = Self::item_path(pk, sk);
        let bytes = match provider.get(path.clone()).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e).context(TableStorageSnafu { table }),
        };

        let value: Value = serde_json::from_slice(&bytes).context(DeserializeItemSnafu {
            path: path.to_string(),
        })?;
        match value {
            Value::Object(item) => Ok(Some(item)),
            _ => NotAnObjectSnafu {
                path: path.to_string(),
            }
            .fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePool;
    use serde_json::json;

    fn memory_table() -> ObjectTableStore {
        let template = UrlTemplate::new("memory://{table}", UrlTemplate::TABLE).unwrap();
        ObjectTableStore::new(Arc::new(StoragePool::new()), template)
    }

    fn item(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => panic!("test item must be an object"),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = memory_table();
        let record = item(json!({
            "user_id": "7",
            "event_ts": "2024-03-05T10:00:00Z",
            "event_type": "login",
            "metadata": {}
        }));

        store.put_item("events", &record).await.unwrap();

        let stored = store
            .get_item("events", "7", "2024-03-05T10:00:00Z")
            .await
            .unwrap();
        assert_eq!(stored, Some(record));
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let store = memory_table();
        let first = item(json!({"user_id": "u", "event_ts": "t", "event_type": "a"}));
        let second = item(json!({"user_id": "u", "event_ts": "t", "event_type": "b"}));

        store.put_item("events", &first).await.unwrap();
        store.put_item("events", &second).await.unwrap();

        let stored = store.get_item("events", "u", "t").await.unwrap().unwrap();
        assert_eq!(stored["event_type"], "b");
    }

    #[tokio::test]
    async fn test_get_missing_item_is_none() {
        let store = memory_table();
        assert_eq!(store.get_item("events", "nobody", "never").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_slash_in_key_stays_in_partition() {
        let store = memory_table();
        let record = item(json!({"user_id": "a/b", "event_ts": "t"}));
        store.put_item("events", &record).await.unwrap();

        assert!(store.get_item("events", "a/b", "t").await.unwrap().is_some());
        assert!(store.get_item("events", "a", "b/t").await.unwrap().is_none());
    }

    #[test]
    fn test_key_attributes() {
        let schema = KeySchema::default();

        let (pk, sk) = schema
            .key_of(&item(json!({"user_id": 42, "event_ts": "t"})))
            .unwrap();
        assert_eq!((pk.as_str(), sk.as_str()), ("42", "t"));

        assert!(matches!(
            schema.key_of(&item(json!({"event_ts": "t"}))),
            Err(TableError::MissingKeyAttribute { .. })
        ));
        assert!(matches!(
            schema.key_of(&item(json!({"user_id": "", "event_ts": "t"}))),
            Err(TableError::InvalidKeyAttribute { .. })
        ));
        assert!(matches!(
            schema.key_of(&item(json!({"user_id": "u", "event_ts": [1]}))),
            Err(TableError::InvalidKeyAttribute { .. })
        ));
    }
}
