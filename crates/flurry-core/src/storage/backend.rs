//! Backend construction for each supported storage service.

use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{
    AzureConfigSnafu, GcsConfigSnafu, IoSnafu, ObjectStoreSnafu, S3ConfigSnafu, StorageError,
};

use super::url_parser::{AzureConfig, BackendConfig, GcsConfig, LocalConfig, S3Config};

/// Failures surface to the caller on the first attempt; the orchestrator
/// owns retry policy.
fn no_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        ..RetryConfig::default()
    }
}

/// Build the object store for `config` and return it with its canonical URL.
pub(super) async fn build(
    config: &BackendConfig,
    options: &HashMap<String, String>,
) -> Result<(Arc<dyn ObjectStore>, String), StorageError> {
    match config {
        BackendConfig::S3(s3) => build_s3(s3, options),
        BackendConfig::Gcs(gcs) => build_gcs(gcs),
        BackendConfig::Azure(azure) => build_azure(azure),
        BackendConfig::Local(local) => build_local(local).await,
        BackendConfig::Memory(memory) => Ok((
            Arc::new(InMemory::new()),
            format!("memory://{}", memory.name),
        )),
    }
}

fn build_s3(
    config: &S3Config,
    options: &HashMap<String, String>,
) -> Result<(Arc<dyn ObjectStore>, String), StorageError> {
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);

    for (key, value) in options {
        builder = builder.with_config(key.parse().context(S3ConfigSnafu)?, value.clone());
    }

    builder = builder.with_retry(no_retry_config());

    if let Some(region) = &config.region {
        builder = builder.with_region(region);
    }

    if let Some(endpoint) = &config.endpoint {
        debug!(endpoint = %endpoint, "Using custom S3 endpoint");
        builder = builder
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(false)
            .with_allow_http(true);
    }

    let canonical_url = match (&config.region, &config.endpoint) {
        (_, Some(endpoint)) => format!("s3::{}/{}", endpoint, config.bucket),
        (Some(region), _) => format!("https://s3.{}.amazonaws.com/{}", region, config.bucket),
        _ => format!("https://s3.amazonaws.com/{}", config.bucket),
    };

    let store = builder.build().context(S3ConfigSnafu)?;
    Ok((Arc::new(store), canonical_url))
}

fn build_gcs(config: &GcsConfig) -> Result<(Arc<dyn ObjectStore>, String), StorageError> {
    let mut builder = GoogleCloudStorageBuilder::from_env()
        .with_bucket_name(&config.bucket)
        .with_retry(no_retry_config());

    if let Ok(service_account_key) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
        debug!("Constructing GCS builder with service account key");
        builder = builder.with_service_account_key(&service_account_key);
    }

    let store = builder.build().context(GcsConfigSnafu)?;
    Ok((
        Arc::new(store),
        format!("https://{}.storage.googleapis.com", config.bucket),
    ))
}

fn build_azure(config: &AzureConfig) -> Result<(Arc<dyn ObjectStore>, String), StorageError> {
    let mut builder = MicrosoftAzureBuilder::from_env()
        .with_container_name(&config.container)
        .with_retry(no_retry_config());

    if let Some(account) = &config.account {
        builder = builder.with_account(account);
    }

    let account = config.account.as_deref().unwrap_or("default");
    let store = builder.build().context(AzureConfigSnafu)?;
    Ok((
        Arc::new(store),
        format!("https://{account}.blob.core.windows.net/{}", config.container),
    ))
}

async fn build_local(config: &LocalConfig) -> Result<(Arc<dyn ObjectStore>, String), StorageError> {
    tokio::fs::create_dir_all(&config.path)
        .await
        .context(IoSnafu)?;

    let store = LocalFileSystem::new_with_prefix(&config.path).context(ObjectStoreSnafu)?;
    Ok((Arc::new(store), format!("file://{}", config.path)))
}
