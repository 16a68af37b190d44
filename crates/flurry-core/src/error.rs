//! Error types shared by the flurry stages.
//!
//! Storage, configuration, and table errors live here so every stage reports
//! upstream and startup failures the same way.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during blob storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error: {source}"))]
    GcsConfig { source: object_store::Error },

    /// Azure configuration error.
    #[snafu(display("Azure configuration error: {source}"))]
    AzureConfig { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Config Errors ============

/// Errors raised while reading process-wide settings at startup.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    #[snafu(display("Required environment variable '{name}' is not set"))]
    MissingVar { name: String },

    /// Neither table name variable is set.
    #[snafu(display(
        "No table name configured: set '{primary}' or '{secondary}'"
    ))]
    MissingTableName {
        primary: &'static str,
        secondary: &'static str,
    },

    /// A URL template does not contain its placeholder.
    #[snafu(display("URL template '{template}' must contain '{placeholder}'"))]
    InvalidTemplate {
        template: String,
        placeholder: &'static str,
    },

    /// A setting has a value outside its allowed set.
    #[snafu(display("Invalid value '{value}' for '{name}' (expected one of: {expected})"))]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

// ============ Metrics Errors ============

/// Errors that can occur while installing the metrics recorder.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },

    /// A recorder is already installed for this process.
    #[snafu(display("Metrics already initialized"))]
    AlreadyInitialized,

    /// No recorder has been installed yet.
    #[snafu(display("Metrics not initialized"))]
    NotInitialized,
}

// ============ Table Errors ============

/// Errors that can occur while reading or writing table items.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TableError {
    /// The item does not carry one of the key attributes.
    #[snafu(display("Item is missing key attribute '{attribute}'"))]
    MissingKeyAttribute { attribute: String },

    /// A key attribute is present but cannot be used as a key.
    #[snafu(display("Key attribute '{attribute}' must be a non-empty string or number, got {found}"))]
    InvalidKeyAttribute { attribute: String, found: String },

    /// Failed to serialize an item.
    #[snafu(display("Failed to serialize item: {source}"))]
    SerializeItem { source: serde_json::Error },

    /// Failed to parse a stored item.
    #[snafu(display("Failed to parse stored item at {path}: {source}"))]
    DeserializeItem {
        path: String,
        source: serde_json::Error,
    },

    /// A stored item is not a JSON object.
    #[snafu(display("Stored item at {path} is not a JSON object"))]
    NotAnObject { path: String },

    /// The underlying storage failed.
    #[snafu(display("Table storage error for '{table}': {source}"))]
    TableStorage { table: String, source: StorageError },
}
