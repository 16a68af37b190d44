//! Local, in-process run of all three stages.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::collector::Collector;
use crate::error::HandlerError;
use crate::handler::Handler;
use crate::types::BlobReference;
use crate::validator::{Validator, ValidatorOutput};
use crate::writer::Writer;

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    /// Where the collector staged the event.
    pub location: BlobReference,
    /// Result of the last stage that ran.
    pub result: Value,
}

/// Collector, validator, and writer chained in one process.
///
/// The writer is skipped when the validator persists on its own.
#[derive(Clone)]
pub struct Pipeline {
    collector: Collector,
    validator: Validator,
    writer: Writer,
}

impl Pipeline {
    pub fn new(collector: Collector, validator: Validator, writer: Writer) -> Self {
        Self {
            collector,
            validator,
            writer,
        }
    }

    #[instrument(skip_all)]
    pub async fn run(&self, event: Value) -> Result<PipelineRun, HandlerError> {
        let location = self.collector.collect(event).await?;
        debug!(key = %location.key, "Collected");

        let result = match self.validator.validate(location.clone().into_value()).await? {
            ValidatorOutput::Record(record) => {
                self.writer.write(record.into_value()).await?.into_value()
            }
            ValidatorOutput::Persisted(summary) => summary.into_value(),
        };

        Ok(PipelineRun { location, result })
    }
}

#[async_trait]
impl Handler for Pipeline {
    fn name(&self) -> &'static str {
        "run"
    }

    async fn handle(&self, event: Value) -> Result<Value, HandlerError> {
        Ok(self.run(event).await?.result)
    }
}
