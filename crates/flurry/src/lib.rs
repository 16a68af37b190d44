//! flurry: a three-stage event ingestion pipeline.
//!
//! - [`Collector`] stages an inbound event as a date-partitioned JSON blob.
//! - [`Validator`] reads the blob back, checks the required fields, and shapes
//!   a [`NormalizedRecord`]; in persist mode it also writes the record.
//! - [`Writer`] puts a record into the table and reports its key.
//!
//! Each stage implements [`Handler`], so an external orchestrator can invoke
//! them one at a time. [`Pipeline`] chains them for local runs.

pub mod cli;
pub mod coerce;
pub mod collector;
pub mod config;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod types;
pub mod validator;
pub mod writer;

// Re-export commonly used items
pub use cli::{CliArgs, Command, read_event};
pub use collector::{Collector, default_timestamp};
pub use config::{CollectorConfig, ValidatorMode, WriterConfig};
pub use error::{CollectError, ErrorKind, HandlerError, ValidateError, WriteError};
pub use flurry_core::{LogFormat, MetricsController, StoragePool, env_lookup, init_metrics, init_tracing};
pub use handler::Handler;
pub use pipeline::{Pipeline, PipelineRun};
pub use types::{BlobReference, NormalizedRecord, PersistSummary, RawPayload, WriteSummary};
pub use validator::{Validator, ValidatorOutput};
pub use writer::Writer;
