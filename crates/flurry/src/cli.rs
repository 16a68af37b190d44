//! Command-line entry: build a stage from the environment and feed it one event.

use clap::{Parser, Subcommand};
use serde_json::Value;
use snafu::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use flurry_core::config::{Lookup, StoreConfig};
use flurry_core::{BlobStoreRef, ObjectBlobStore, ObjectTableStore, StoragePoolRef, TableStoreRef};

use crate::collector::Collector;
use crate::config::{CollectorConfig, ValidatorMode, WriterConfig};
use crate::error::{
    EventInputError, HandlerError, ParseEventSnafu, ReadEventFileSnafu, ReadStdinSnafu,
};
use crate::handler::Handler;
use crate::pipeline::Pipeline;
use crate::validator::Validator;
use crate::writer::Writer;

#[derive(Parser, Debug)]
#[command(name = "flurry")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// JSON event file; read from stdin when omitted.
    #[arg(short, long, global = true)]
    pub event: Option<PathBuf>,

    /// Print a Prometheus metrics snapshot to stderr when done.
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Stage an event envelope in blob storage.
    Collect,
    /// Validate a staged event and normalize it.
    Validate,
    /// Write a normalized record to the table.
    Write,
    /// Run all stages in this process.
    Run,
}

impl Command {
    /// Build the handler for this command, reading settings through `lookup`.
    pub fn build_handler(
        self,
        lookup: &impl Lookup,
        pool: StoragePoolRef,
    ) -> Result<Box<dyn Handler>, HandlerError> {
        let stores = StoreConfig::from_lookup(lookup)?;
        let blobs: BlobStoreRef = Arc::new(ObjectBlobStore::new(pool.clone(), stores.blob_url));
        let tables: TableStoreRef = Arc::new(ObjectTableStore::new(pool, stores.table_url));

        let handler: Box<dyn Handler> = match self {
            Command::Collect => Box::new(Collector::new(
                CollectorConfig::from_lookup(lookup)?,
                blobs,
            )),
            Command::Validate => Box::new(Validator::from_mode(
                ValidatorMode::from_lookup(lookup)?,
                blobs,
                tables,
            )),
            Command::Write => Box::new(Writer::new(WriterConfig::from_lookup(lookup)?, tables)),
            Command::Run => {
                let collector = Collector::new(CollectorConfig::from_lookup(lookup)?, blobs.clone());
                let validator =
                    Validator::from_mode(ValidatorMode::from_lookup(lookup)?, blobs, tables.clone());
                let writer = Writer::new(WriterConfig::from_lookup(lookup)?, tables);
                Box::new(Pipeline::new(collector, validator, writer))
            }
        };
        Ok(handler)
    }
}

/// Read the event JSON from `path`, or from stdin when `None`.
pub async fn read_event(path: Option<&std::path::Path>) -> Result<Value, EventInputError> {
    let bytes = match path {
        Some(path) => tokio::fs::read(path).await.context(ReadEventFileSnafu {
            path: path.display().to_string(),
        })?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context(ReadStdinSnafu)?;
            buf
        }
    };
    serde_json::from_slice(&bytes).context(ParseEventSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::vars;
    use crate::error::{ConfigError, ErrorKind};
    use flurry_core::StoragePool;
    use flurry_core::config::{BLOB_URL, BUCKET_NAME, TABLE_NAME, TABLE_URL, VALIDATOR_MODE};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_args() {
        let args = CliArgs::try_parse_from(["flurry", "--event", "e.json", "collect"]).unwrap();
        assert_eq!(args.command, Command::Collect);
        assert_eq!(args.event, Some(PathBuf::from("e.json")));
        assert!(!args.metrics);

        let args = CliArgs::try_parse_from(["flurry", "run", "--metrics"]).unwrap();
        assert_eq!(args.command, Command::Run);
        assert!(args.metrics);

        assert!(CliArgs::try_parse_from(["flurry"]).is_err());
    }

    #[test]
    fn test_build_handler_reports_missing_config() {
        let pool = Arc::new(StoragePool::new());
        let lookup = vars(&[]);

        let Err(err) = Command::Collect.build_handler(&lookup, pool.clone()) else {
            panic!("collect should need BUCKET_NAME");
        };
        assert!(matches!(
            err,
            HandlerError::Config {
                source: ConfigError::MissingVar { .. }
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Config);

        let Err(err) = Command::Write.build_handler(&lookup, pool.clone()) else {
            panic!("write should need a table name");
        };
        assert!(matches!(
            err,
            HandlerError::Config {
                source: ConfigError::MissingTableName { .. }
            }
        ));
        // Transform-mode validation needs neither
        let handler = Command::Validate.build_handler(&lookup, pool).unwrap();
        assert_eq!(handler.name(), "validate");
    }

    #[tokio::test]
    async fn test_run_handler_end_to_end() {
        let lookup = vars(&[
            (BUCKET_NAME, "raw"),
            (TABLE_NAME, "events"),
            (BLOB_URL, "memory://{container}"),
            (TABLE_URL, "memory://{table}"),
        ]);
        let handler = Command::Run
            .build_handler(&lookup, Arc::new(StoragePool::new()))
            .unwrap();

        let result = handler
            .handle(json!({"detail": {"user_id": 7, "event_type": "login", "timestamp": "2024-03-05T10:00:00Z"}}))
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({"status": "ok", "put": {"table": "events", "pk": "7", "sk": "2024-03-05T10:00:00Z"}})
        );
    }

    #[tokio::test]
    async fn test_run_handler_persist_mode_skips_writer() {
        let lookup = vars(&[
            (BUCKET_NAME, "raw"),
            (TABLE_NAME, "events"),
            (VALIDATOR_MODE, "persist"),
            (BLOB_URL, "memory://{container}"),
            (TABLE_URL, "memory://{table}"),
        ]);
        let handler = Command::Run
            .build_handler(&lookup, Arc::new(StoragePool::new()))
            .unwrap();

        let result = handler
            .handle(json!({"detail": {"user_id": "u", "event_type": "e", "timestamp": "2024-01-01"}}))
            .await
            .unwrap();
        assert_eq!(result["status"], "ok");
        assert_eq!(result["table"], "events");
        assert_eq!(result["user_id"], "u");
    }

    #[tokio::test]
    async fn test_read_event_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("event.json");
        std::fs::write(&path, r#"{"detail": {"user_id": "u1"}}"#).unwrap();

        let event = read_event(Some(path.as_path())).await.unwrap();
        assert_eq!(event, json!({"detail": {"user_id": "u1"}}));

        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            read_event(Some(path.as_path())).await,
            Err(EventInputError::ParseEvent { .. })
        ));

        assert!(matches!(
            read_event(Some(temp_dir.path().join("missing.json").as_path())).await,
            Err(EventInputError::ReadEventFile { .. })
        ));
    }
}
