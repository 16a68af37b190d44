//! flurry-core: Shared components for the flurry pipeline stages.
//!
//! - `storage/` - Multi-cloud blob storage (S3, GCS, Azure, local, in-memory)
//! - `table` - Key-value table persistence over object storage
//! - `config/` - Environment-based settings and URL templates
//! - `metrics/` - Prometheus metrics and internal events
//! - `partition` - Date partitioning of blob keys
//! - `error` - Common error types

pub mod config;
pub mod error;
pub mod metrics;
pub mod partition;
pub mod storage;
pub mod table;
pub mod tracing;

// Re-export commonly used items
pub use config::{LogFormat, Lookup, StoreConfig, UrlTemplate, env_lookup};
pub use error::{ConfigError, MetricsError, StorageError, TableError};
pub use metrics::{MetricsController, init as init_metrics, init_test as init_metrics_test};
pub use partition::DatePartition;
pub use storage::{
    BlobStore, BlobStoreRef, ObjectBlobStore, StoragePool, StoragePoolRef, StorageProvider,
    StorageProviderRef,
};
pub use table::{Item, KeySchema, ObjectTableStore, TableStore, TableStoreRef};
pub use crate::tracing::init_tracing;
