//! Internal events for flurry metrics emission.
//!
//! Each struct is one measurable occurrence in a stage. Emitting it records
//! the matching Prometheus metric and a `trace!` line.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// An event was staged to blob storage by the collector.
pub struct EventCollected {
    pub container: String,
}

impl InternalEvent for EventCollected {
    fn emit(self) {
        trace!(container = %self.container, "Event collected");
        counter!("flurry_events_collected_total", "container" => self.container).increment(1);
    }
}

/// Bytes written to blob storage by the collector.
pub struct BlobBytesWritten {
    pub bytes: u64,
}

impl InternalEvent for BlobBytesWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, "Blob bytes written");
        counter!("flurry_blob_bytes_written_total").increment(self.bytes);
    }
}

/// A payload passed validation and was shaped into a record.
pub struct RecordNormalized {
    /// Validator mode label (`transform` or `persist`).
    pub mode: &'static str,
}

impl InternalEvent for RecordNormalized {
    fn emit(self) {
        trace!(mode = self.mode, "Record normalized");
        counter!("flurry_records_normalized_total", "mode" => self.mode).increment(1);
    }
}

/// Why a payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    MissingLocation,
    InvalidJson,
    NotAnObject,
    MissingField,
}

impl ValidationFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationFailure::MissingLocation => "missing_location",
            ValidationFailure::InvalidJson => "invalid_json",
            ValidationFailure::NotAnObject => "not_an_object",
            ValidationFailure::MissingField => "missing_field",
        }
    }
}

/// A payload failed validation.
pub struct ValidationFailed {
    pub reason: ValidationFailure,
}

impl InternalEvent for ValidationFailed {
    fn emit(self) {
        trace!(reason = self.reason.as_str(), "Validation failed");
        counter!("flurry_validation_failures_total", "reason" => self.reason.as_str())
            .increment(1);
    }
}

/// An item was put into a table.
pub struct ItemWritten {
    pub table: String,
}

impl InternalEvent for ItemWritten {
    fn emit(self) {
        trace!(table = %self.table, "Item written");
        counter!("flurry_items_written_total", "table" => self.table).increment(1);
    }
}

/// Type of storage operation.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
        }
    }
}

/// Status of a storage request.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// A storage request completed.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "flurry_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// Wall time of a storage request.
pub struct StorageRequestDuration {
    pub operation: StorageOperation,
    pub duration: Duration,
}

impl InternalEvent for StorageRequestDuration {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            duration_ms = self.duration.as_millis(),
            "Storage request duration"
        );
        histogram!(
            "flurry_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}
