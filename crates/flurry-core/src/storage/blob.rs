//! Container/key blob access used by the pipeline stages.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::StoragePoolRef;
use crate::config::UrlTemplate;
use crate::error::StorageError;

/// Reference-counted blob store.
pub type BlobStoreRef = Arc<dyn BlobStore>;

/// Named containers of opaque blobs addressed by key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `body` under `key`, replacing any existing blob.
    async fn put(&self, container: &str, key: &str, body: Bytes) -> Result<(), StorageError>;

    /// Read the blob stored under `key`.
    async fn get(&self, container: &str, key: &str) -> Result<Bytes, StorageError>;
}

/// [`BlobStore`] backed by object storage.
///
/// A container name is turned into a storage URL with the template, and the
/// provider for that URL comes from the shared pool.
#[derive(Debug, Clone)]
pub struct ObjectBlobStore {
    pool: StoragePoolRef,
    template: UrlTemplate,
}

impl ObjectBlobStore {
    pub fn new(pool: StoragePoolRef, template: UrlTemplate) -> Self {
        Self { pool, template }
    }

    /// Storage URL for a container.
    pub fn container_url(&self, container: &str) -> String {
        self.template.render(container)
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn put(&self, container: &str, key: &str, body: Bytes) -> Result<(), StorageError> {
        let provider = self.pool.get_or_create(&self.container_url(container)).await?;
        debug!(container, key, bytes = body.len(), "Putting blob");
        provider.put_json(&Path::from(key), body).await
    }

    async fn get(&self, container: &str, key: &str) -> Result<Bytes, StorageError> {
        let provider = self.pool.get_or_create(&self.container_url(container)).await?;
        debug!(container, key, "Getting blob");
        provider.get(Path::from(key)).await
    }
}
