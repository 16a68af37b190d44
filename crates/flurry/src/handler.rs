//! Uniform invocation interface: one JSON event in, one JSON result out.

use async_trait::async_trait;
use serde_json::Value;

use crate::collector::Collector;
use crate::error::HandlerError;
use crate::validator::Validator;
use crate::writer::Writer;

/// A stage invoked once per event.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Stage name used in logs.
    fn name(&self) -> &'static str;

    /// Process one event.
    async fn handle(&self, event: Value) -> Result<Value, HandlerError>;
}

#[async_trait]
impl Handler for Collector {
    fn name(&self) -> &'static str {
        "collect"
    }

    async fn handle(&self, event: Value) -> Result<Value, HandlerError> {
        Ok(self.collect(event).await?.into_value())
    }
}

#[async_trait]
impl Handler for Validator {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn handle(&self, event: Value) -> Result<Value, HandlerError> {
        Ok(self.validate(event).await?.into_value())
    }
}

#[async_trait]
impl Handler for Writer {
    fn name(&self) -> &'static str {
        "write"
    }

    async fn handle(&self, event: Value) -> Result<Value, HandlerError> {
        Ok(self.write(event).await?.into_value())
    }
}
