//! Process-scoped cache of storage providers.
//!
//! Clients are built once per URL and reused by every later invocation in
//! the same process.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{StorageProvider, StorageProviderRef};
use crate::error::StorageError;

/// Reference-counted handle to a [`StoragePool`].
pub type StoragePoolRef = Arc<StoragePool>;

/// Pool of storage providers keyed by URL.
///
/// Entries are never evicted, so the pool holds one provider for every
/// distinct URL it has seen. Container names come from validator inputs,
/// which makes the map unbounded in a process that serves many events.
#[derive(Default)]
pub struct StoragePool {
    providers: RwLock<HashMap<String, StorageProviderRef>>,
    options: HashMap<String, String>,
}

impl std::fmt::Debug for StoragePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoragePool").finish_non_exhaustive()
    }
}

impl StoragePool {
    /// Create a new empty storage pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool whose providers are all built with `options`.
    pub fn with_options(options: HashMap<String, String>) -> Self {
        Self {
            providers: RwLock::default(),
            options,
        }
    }

    /// Get or create the storage provider for `url`.
    pub async fn get_or_create(&self, url: &str) -> Result<StorageProviderRef, StorageError> {
        let provider_key = url.trim_end_matches('/').to_string();

        // Fast path: provider already exists
        {
            let providers = self.providers.read().await;
            if let Some(provider) = providers.get(&provider_key) {
                return Ok(provider.clone());
            }
        }

        let mut providers = self.providers.write().await;
        // Another task may have created it while we waited for the lock
        if let Some(provider) = providers.get(&provider_key) {
            return Ok(provider.clone());
        }

        let provider =
            Arc::new(StorageProvider::for_url_with_options(url, self.options.clone()).await?);
        debug!(url = %provider.canonical_url(), "Created storage provider");
        providers.insert(provider_key, provider.clone());

        Ok(provider)
    }

    /// Number of cached providers.
    pub async fn provider_count(&self) -> usize {
        self.providers.read().await.len()
    }
}
