//! Multi-cloud blob storage.
//!
//! [`StorageProvider`] wraps one storage location (S3, GCS, Azure, local
//! filesystem, or in-memory). [`StoragePool`] caches providers for the life of
//! the process, and [`BlobStore`] is the container/key interface the stages
//! depend on.

mod backend;
mod blob;
mod pool;
mod url_parser;

pub use blob::{BlobStore, BlobStoreRef, ObjectBlobStore};
pub use pool::{StoragePool, StoragePoolRef};
pub use url_parser::{AzureConfig, BackendConfig, GcsConfig, LocalConfig, MemoryConfig, S3Config};

use bytes::Bytes;
use object_store::path::Path;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::emit;
use crate::error::{ObjectStoreSnafu, StorageError};
use crate::metrics::events::{
    RequestStatus, StorageOperation, StorageRequest, StorageRequestDuration,
};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider that abstracts over different cloud storage backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    ///
    /// Options are passed to the S3 builder as config keys (credentials,
    /// region, etc.) and ignored by other backends.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;
        let (object_store, canonical_url) = backend::build(&config, &options).await?;

        Ok(Self {
            config,
            object_store,
            canonical_url,
        })
    }

    /// Get the contents of an object.
    pub async fn get(&self, path: impl Into<Path>) -> Result<Bytes, StorageError> {
        let path = path.into();
        let start = Instant::now();
        let result = match self.object_store.get(&self.qualify_path(&path)).await {
            Ok(object) => object.bytes().await,
            Err(e) => Err(e),
        };

        record(StorageOperation::Get, result.is_ok(), start);
        result.context(ObjectStoreSnafu)
    }

    /// Put a payload to a path, replacing any existing object.
    pub async fn put_payload(&self, path: &Path, payload: PutPayload) -> Result<(), StorageError> {
        self.put_payload_with_opts(path, payload, PutOptions::default())
            .await
    }

    /// Put a JSON document with `Content-Type: application/json`.
    ///
    /// Attributes are only sent to cloud backends; local and in-memory stores
    /// get a plain put.
    pub async fn put_json(&self, path: &Path, body: Bytes) -> Result<(), StorageError> {
        let payload = PutPayload::from(body);
        if matches!(self.config, BackendConfig::Local(_) | BackendConfig::Memory(_)) {
            return self.put_payload(path, payload).await;
        }

        let opts = PutOptions {
            attributes: Attributes::from_iter([(
                Attribute::ContentType,
                AttributeValue::from("application/json"),
            )]),
            ..Default::default()
        };
        self.put_payload_with_opts(path, payload, opts).await
    }

    async fn put_payload_with_opts(
        &self,
        path: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self.object_store.put_opts(&path, payload, opts).await;

        record(StorageOperation::Put, result.is_ok(), start);
        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Human-readable location of this provider.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }
}

fn record(operation: StorageOperation, ok: bool, start: Instant) {
    let status = if ok {
        RequestStatus::Success
    } else {
        RequestStatus::Error
    };
    emit!(StorageRequest { operation, status });
    emit!(StorageRequestDuration {
        operation,
        duration: start.elapsed(),
    });
}
