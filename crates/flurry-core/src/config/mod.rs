//! Environment-based configuration shared by all stages.
//!
//! Settings are read once at process start. Every reader takes a lookup
//! function instead of touching `std::env` directly, so callers decide where
//! values come from and tests never mutate the process environment.

mod template;

pub use template::UrlTemplate;

use snafu::prelude::*;

use crate::error::{ConfigError, InvalidValueSnafu, MissingTableNameSnafu, MissingVarSnafu};

/// Container identifier written to by the collector.
pub const BUCKET_NAME: &str = "BUCKET_NAME";
/// Primary table name variable.
pub const TABLE_NAME: &str = "TABLE_NAME";
/// Secondary table name variable, consulted only when [`TABLE_NAME`] is unset.
pub const DDB_TABLE: &str = "DDB_TABLE";
/// Selects the validator variant (`transform` or `persist`).
pub const VALIDATOR_MODE: &str = "VALIDATOR_MODE";
/// Blob URL template; must contain `{container}`.
pub const BLOB_URL: &str = "FLURRY_BLOB_URL";
/// Table URL template; must contain `{table}`.
pub const TABLE_URL: &str = "FLURRY_TABLE_URL";
/// Log output format (`text` or `json`).
pub const LOG_FORMAT: &str = "FLURRY_LOG_FORMAT";

/// Default blob URL template.
pub const DEFAULT_BLOB_URL: &str = "s3://{container}";
/// Default table URL template.
pub const DEFAULT_TABLE_URL: &str = "s3://{table}";

/// Source of configuration values.
///
/// Implemented for any `Fn(&str) -> Option<String>`; use [`env_lookup`] for
/// the real process environment.
pub trait Lookup {
    fn get(&self, name: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Lookup backed by the process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Read a variable, treating an empty value as unset.
pub fn optional(lookup: &impl Lookup, name: &str) -> Option<String> {
    lookup.get(name).filter(|v| !v.is_empty())
}

/// Read a variable that must be present and non-empty.
pub fn require(lookup: &impl Lookup, name: &str) -> Result<String, ConfigError> {
    optional(lookup, name).context(MissingVarSnafu { name })
}

/// Resolve the table name: [`TABLE_NAME`] first, then [`DDB_TABLE`].
pub fn table_name(lookup: &impl Lookup) -> Result<String, ConfigError> {
    optional(lookup, TABLE_NAME)
        .or_else(|| optional(lookup, DDB_TABLE))
        .context(MissingTableNameSnafu {
            primary: TABLE_NAME,
            secondary: DDB_TABLE,
        })
}

/// Storage location templates for blobs and tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub blob_url: UrlTemplate,
    pub table_url: UrlTemplate,
}

impl StoreConfig {
    /// Load templates from [`BLOB_URL`] / [`TABLE_URL`], falling back to the defaults.
    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let blob_url = optional(lookup, BLOB_URL).unwrap_or_else(|| DEFAULT_BLOB_URL.to_string());
        let table_url =
            optional(lookup, TABLE_URL).unwrap_or_else(|| DEFAULT_TABLE_URL.to_string());

        Ok(Self {
            blob_url: UrlTemplate::new(blob_url, UrlTemplate::CONTAINER)?,
            table_url: UrlTemplate::new(table_url, UrlTemplate::TABLE)?,
        })
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        match optional(lookup, LOG_FORMAT).as_deref() {
            None | Some("text") => Ok(LogFormat::Text),
            Some("json") => Ok(LogFormat::Json),
            Some(other) => InvalidValueSnafu {
                name: LOG_FORMAT,
                value: other,
                expected: "text, json",
            }
            .fail(),
        }
    }
}
