//! Writer: persist a normalized record into the table.

use serde_json::Value;
use snafu::prelude::*;
use tracing::{info, instrument};

use flurry_core::TableStoreRef;
use flurry_core::emit;
use flurry_core::metrics::events::ItemWritten;

use crate::config::WriterConfig;
use crate::error::{InvalidItemSnafu, MissingSummaryFieldSnafu, PutSnafu, WriteError, json_type};
use crate::types::WriteSummary;

/// Writes items verbatim into the configured table.
#[derive(Clone)]
pub struct Writer {
    config: WriterConfig,
    tables: TableStoreRef,
}

impl Writer {
    pub fn new(config: WriterConfig, tables: TableStoreRef) -> Self {
        Self { config, tables }
    }

    /// Put `event` as one item, then report its key.
    ///
    /// The put happens before the summary is assembled, so a summary failure
    /// can follow a successful write.
    #[instrument(skip_all, fields(table = %self.config.table))]
    pub async fn write(&self, event: Value) -> Result<WriteSummary, WriteError> {
        let item = match event {
            Value::Object(item) => item,
            other => {
                return InvalidItemSnafu {
                    found: json_type(&other),
                }
                .fail();
            }
        };

        let table = &self.config.table;
        self.tables
            .put_item(table, &item)
            .await
            .context(PutSnafu { table })?;
        emit!(ItemWritten {
            table: table.clone(),
        });

        let pk = item
            .get("user_id")
            .cloned()
            .context(MissingSummaryFieldSnafu { field: "user_id" })?;
        let sk = item
            .get("event_ts")
            .cloned()
            .context(MissingSummaryFieldSnafu { field: "event_ts" })?;

        info!(pk = %pk, sk = %sk, "Wrote item");
        Ok(WriteSummary {
            table: table.clone(),
            pk,
            sk,
        })
    }
}
