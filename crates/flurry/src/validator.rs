//! Validator: read a staged blob, check required fields, and shape the record.

use serde_json::{Map, Value};
use snafu::prelude::*;
use tracing::{info, instrument, warn};

use flurry_core::emit;
use flurry_core::metrics::events::{RecordNormalized, ValidationFailed, ValidationFailure};
use flurry_core::{BlobStoreRef, TableStoreRef};

use crate::coerce::to_key_string;
use crate::config::ValidatorMode;
use crate::error::{
    BlobReadSnafu, InvalidPayloadSnafu, MissingFieldSnafu, MissingLocationSnafu,
    PayloadNotObjectSnafu, PersistSnafu, ValidateError, json_type,
};
use crate::types::{BlobReference, NormalizedRecord, PersistSummary, RawPayload};

/// Result of one validator invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatorOutput {
    /// Transform mode: the record for the writer.
    Record(NormalizedRecord),
    /// Persist mode: the record was already written.
    Persisted(PersistSummary),
}

impl ValidatorOutput {
    pub fn into_value(self) -> Value {
        match self {
            ValidatorOutput::Record(record) => record.into_value(),
            ValidatorOutput::Persisted(summary) => summary.into_value(),
        }
    }
}

/// Validates staged events. Persist mode needs a table store.
#[derive(Clone)]
pub struct Validator {
    blobs: BlobStoreRef,
    mode: Mode,
}

#[derive(Clone)]
enum Mode {
    Transform,
    Persist { table: String, tables: TableStoreRef },
}

impl Validator {
    /// Validator that only returns the normalized record.
    pub fn transform(blobs: BlobStoreRef) -> Self {
        Self {
            blobs,
            mode: Mode::Transform,
        }
    }

    /// Validator that also writes the record to `table`.
    pub fn persist(blobs: BlobStoreRef, tables: TableStoreRef, table: impl Into<String>) -> Self {
        Self {
            blobs,
            mode: Mode::Persist {
                table: table.into(),
                tables,
            },
        }
    }

    /// Build the variant selected by `mode`.
    pub fn from_mode(mode: ValidatorMode, blobs: BlobStoreRef, tables: TableStoreRef) -> Self {
        match mode {
            ValidatorMode::Transform => Self::transform(blobs),
            ValidatorMode::Persist { table } => Self::persist(blobs, tables, table),
        }
    }

    pub fn persists(&self) -> bool {
        matches!(self.mode, Mode::Persist { .. })
    }

    fn mode_label(&self) -> &'static str {
        match self.mode {
            Mode::Transform => "transform",
            Mode::Persist { .. } => "persist",
        }
    }

    /// Validate the blob referenced by `event`, then persist it when
    /// configured to.
    #[instrument(skip_all, fields(mode = self.mode_label()))]
    pub async fn validate(&self, event: Value) -> Result<ValidatorOutput, ValidateError> {
        let record = self.normalize(&event).await.inspect_err(|e| {
            if let Some(reason) = failure_reason(e) {
                warn!(error = %e, "Validation failed");
                emit!(ValidationFailed { reason });
            }
        })?;
        emit!(RecordNormalized {
            mode: self.mode_label(),
        });

        let Mode::Persist { table, tables } = &self.mode else {
            info!(key = %record.source_key, "Normalized record");
            return Ok(ValidatorOutput::Record(record));
        };

        let summary = PersistSummary {
            table: table.clone(),
            user_id: record.user_id.clone(),
            event_ts: record.event_ts.clone(),
        };
        tables
            .put_item(table, &record.into_item())
            .await
            .context(PersistSnafu { table })?;

        info!(table = %table, user_id = %summary.user_id, "Persisted record");
        Ok(ValidatorOutput::Persisted(summary))
    }

    /// Fetch, check, and shape the referenced payload without writing it.
    pub async fn normalize(&self, event: &Value) -> Result<NormalizedRecord, ValidateError> {
        let location = BlobReference::from_event(event).context(MissingLocationSnafu)?;

        let body = self
            .blobs
            .get(&location.container, &location.key)
            .await
            .context(BlobReadSnafu {
                container: &location.container,
                key: &location.key,
            })?;

        let value: Value = serde_json::from_slice(&body).context(InvalidPayloadSnafu {
            key: &location.key,
        })?;
        ensure!(
            value.is_object(),
            PayloadNotObjectSnafu {
                key: &location.key,
                found: json_type(&value),
            }
        );
        let payload: RawPayload =
            serde_json::from_value(value).context(InvalidPayloadSnafu { key: &location.key })?;

        let user_id = required("user_id", &payload.user_id)?;
        let event_type = required("event_type", &payload.event_type)?;
        let timestamp = required("timestamp", &payload.timestamp)?;

        Ok(NormalizedRecord {
            user_id: to_key_string(user_id),
            event_ts: to_key_string(timestamp),
            event_type: to_key_string(event_type),
            metadata: payload
                .metadata
                .unwrap_or_else(|| Value::Object(Map::new())),
            source_container: location.container,
            source_key: location.key,
        })
    }
}

/// Absent, `null`, and `""` fail; every other value passes.
fn required<'a>(field: &'static str, value: &'a Option<Value>) -> Result<&'a Value, ValidateError> {
    match value {
        None | Some(Value::Null) => MissingFieldSnafu { field }.fail(),
        Some(Value::String(s)) if s.is_empty() => MissingFieldSnafu { field }.fail(),
        Some(value) => Ok(value),
    }
}

/// Metric label for input-shape failures; upstream errors are not counted.
fn failure_reason(error: &ValidateError) -> Option<ValidationFailure> {
    match error {
        ValidateError::MissingLocation => Some(ValidationFailure::MissingLocation),
        ValidateError::InvalidPayload { .. } => Some(ValidationFailure::InvalidJson),
        ValidateError::PayloadNotObject { .. } => Some(ValidationFailure::NotAnObject),
        ValidateError::MissingField { .. } => Some(ValidationFailure::MissingField),
        ValidateError::BlobRead { .. } | ValidateError::Persist { .. } => None,
    }
}
