//! URL templates that map a container or table name to a storage URL.

use snafu::prelude::*;

use crate::error::{ConfigError, InvalidTemplateSnafu};

/// A storage URL with a single placeholder, e.g. `s3://{container}` or
/// `gs://analytics/tables/{table}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
    placeholder: &'static str,
}

impl UrlTemplate {
    pub const CONTAINER: &'static str = "{container}";
    pub const TABLE: &'static str = "{table}";

    /// Create a template, rejecting one that lacks `placeholder`.
    pub fn new(template: impl Into<String>, placeholder: &'static str) -> Result<Self, ConfigError> {
        let template = template.into();
        ensure!(
            template.contains(placeholder),
            InvalidTemplateSnafu {
                template,
                placeholder
            }
        );
        Ok(Self {
            template,
            placeholder,
        })
    }

    /// Substitute `name` for every occurrence of the placeholder.
    pub fn render(&self, name: &str) -> String {
        self.template.replace(self.placeholder, name)
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}
