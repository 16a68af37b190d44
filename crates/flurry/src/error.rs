//! Error types for the flurry stages.
//!
//! Every error aborts the current invocation. [`HandlerError::kind`] sorts
//! failures into configuration, input-shape, and upstream-dependency errors
//! so the caller can decide what to retry.

use snafu::prelude::*;

pub use flurry_core::error::{ConfigError, StorageError, TableError};

/// Broad failure category of a [`HandlerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required process-wide setting is missing or invalid.
    Config,
    /// The event or staged payload has the wrong shape.
    Input,
    /// The blob or table store failed.
    Upstream,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Input => "input",
            ErrorKind::Upstream => "upstream",
        }
    }
}

/// Errors raised by the collector.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CollectError {
    /// The envelope is not a JSON object.
    #[snafu(display("Event envelope must be an object, got {found}"))]
    InvalidEnvelope { found: &'static str },

    /// `detail` is truthy but not an object.
    #[snafu(display("Event detail must be an object, got {found}"))]
    InvalidDetail { found: &'static str },

    /// `timestamp` is present but not a string.
    #[snafu(display("Event timestamp must be a string, got {found}"))]
    InvalidTimestamp { found: &'static str },

    /// The timestamp does not start with a `YYYY-MM-DD` style date.
    #[snafu(display(
        "Cannot partition timestamp '{timestamp}': expected three dash-separated date components"
    ))]
    InvalidPartition { timestamp: String },

    /// Failed to encode the detail mapping.
    #[snafu(display("Failed to encode event detail: {source}"))]
    EncodeDetail { source: serde_json::Error },

    /// The blob write failed.
    #[snafu(display("Failed to write blob {container}/{key}: {source}"))]
    BlobWrite {
        container: String,
        key: String,
        source: StorageError,
    },
}

impl CollectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollectError::BlobWrite { .. } => ErrorKind::Upstream,
            _ => ErrorKind::Input,
        }
    }
}

/// Errors raised by the validator.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ValidateError {
    /// Neither naming convention yields a container and key.
    #[snafu(display(
        "Missing blob location: expected 's3_bucket'/'s3_key' or 'bucket'/'key'"
    ))]
    MissingLocation,

    /// The blob fetch failed.
    #[snafu(display("Failed to read blob {container}/{key}: {source}"))]
    BlobRead {
        container: String,
        key: String,
        source: StorageError,
    },

    /// The blob body is not valid JSON.
    #[snafu(display("Blob {key} is not valid JSON: {source}"))]
    InvalidPayload {
        key: String,
        source: serde_json::Error,
    },

    /// The blob body parses but is not a JSON object.
    #[snafu(display("Blob {key} must contain a JSON object, got {found}"))]
    PayloadNotObject { key: String, found: &'static str },

    /// A required field is absent, null, or empty.
    #[snafu(display("Missing field: {field}"))]
    MissingField { field: &'static str },

    /// Writing the normalized record failed (persist mode).
    #[snafu(display("Failed to persist record to table '{table}': {source}"))]
    Persist { table: String, source: TableError },
}

impl ValidateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidateError::BlobRead { .. } => ErrorKind::Upstream,
            ValidateError::Persist { source, .. } => table_error_kind(source),
            _ => ErrorKind::Input,
        }
    }
}

/// Errors raised by the writer.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WriteError {
    /// The item is not a JSON object.
    #[snafu(display("Item must be an object, got {found}"))]
    InvalidItem { found: &'static str },

    /// The table write failed.
    #[snafu(display("Failed to put item into table '{table}': {source}"))]
    Put { table: String, source: TableError },

    /// The written item lacks a key needed for the summary.
    #[snafu(display("Missing field: {field}"))]
    MissingSummaryField { field: &'static str },
}

impl WriteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WriteError::Put { source, .. } => table_error_kind(source),
            _ => ErrorKind::Input,
        }
    }
}

fn table_error_kind(error: &TableError) -> ErrorKind {
    match error {
        TableError::MissingKeyAttribute { .. }
        | TableError::InvalidKeyAttribute { .. }
        | TableError::SerializeItem { .. } => ErrorKind::Input,
        _ => ErrorKind::Upstream,
    }
}

/// Errors reading the event given to the CLI.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EventInputError {
    /// Failed to read the event file.
    #[snafu(display("Failed to read event file {path}: {source}"))]
    ReadEventFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to read the event from stdin.
    #[snafu(display("Failed to read event from stdin: {source}"))]
    ReadStdin { source: std::io::Error },

    /// The event is not valid JSON.
    #[snafu(display("Event is not valid JSON: {source}"))]
    ParseEvent { source: serde_json::Error },
}

/// Error returned by a [`Handler`](crate::Handler) invocation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HandlerError {
    #[snafu(display("{source}"), context(false))]
    Config { source: ConfigError },

    #[snafu(display("{source}"), context(false))]
    Collect { source: CollectError },

    #[snafu(display("{source}"), context(false))]
    Validate { source: ValidateError },

    #[snafu(display("{source}"), context(false))]
    Write { source: WriteError },
}

impl HandlerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandlerError::Config { .. } => ErrorKind::Config,
            HandlerError::Collect { source } => source.kind(),
            HandlerError::Validate { source } => source.kind(),
            HandlerError::Write { source } => source.kind(),
        }
    }
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn json_type(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = ValidateError::MissingField { field: "user_id" };
        assert_eq!(err.to_string(), "Missing field: user_id");

        let err: HandlerError = err.into();
        assert_eq!(err.to_string(), "Missing field: user_id");
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_kinds() {
        let upstream = StorageError::InvalidUrl {
            url: "x".to_string(),
        };
        let err: HandlerError = CollectError::BlobWrite {
            container: "raw".to_string(),
            key: "k".to_string(),
            source: upstream,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Upstream);

        let err: HandlerError = ConfigError::MissingVar {
            name: "BUCKET_NAME".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err: HandlerError = WriteError::Put {
            table: "events".to_string(),
            source: TableError::MissingKeyAttribute {
                attribute: "user_id".to_string(),
            },
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Input);
    }
}
