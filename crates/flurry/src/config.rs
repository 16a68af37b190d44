//! Per-stage settings.

use snafu::prelude::*;

use flurry_core::config::{
    BUCKET_NAME, Lookup, VALIDATOR_MODE, optional, require, table_name,
};
use flurry_core::error::{ConfigError, InvalidValueSnafu};

/// Collector settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Container every event is staged to.
    pub bucket: String,
}

impl CollectorConfig {
    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            bucket: require(lookup, BUCKET_NAME)?,
        })
    }
}

/// Which validator variant runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidatorMode {
    /// Return the normalized record and write nothing.
    #[default]
    Transform,
    /// Write the normalized record to `table` and return a status summary.
    Persist { table: String },
}

impl ValidatorMode {
    /// Read [`VALIDATOR_MODE`]; persist mode also needs a table name.
    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        match optional(lookup, VALIDATOR_MODE).as_deref() {
            None | Some("transform") => Ok(ValidatorMode::Transform),
            Some("persist") => Ok(ValidatorMode::Persist {
                table: table_name(lookup)?,
            }),
            Some(other) => InvalidValueSnafu {
                name: VALIDATOR_MODE,
                value: other,
                expected: "transform, persist",
            }
            .fail(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorMode::Transform => "transform",
            ValidatorMode::Persist { .. } => "persist",
        }
    }
}

/// Writer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    pub table: String,
}

impl WriterConfig {
    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            table: table_name(lookup)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flurry_core::config::{DDB_TABLE, TABLE_NAME};
    use std::collections::HashMap;

    pub(crate) fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_collector_requires_bucket() {
        assert!(matches!(
            CollectorConfig::from_lookup(&vars(&[])),
            Err(ConfigError::MissingVar { .. })
        ));
        let config = CollectorConfig::from_lookup(&vars(&[(BUCKET_NAME, "raw")])).unwrap();
        assert_eq!(config.bucket, "raw");
    }

    #[test]
    fn test_validator_mode_defaults_to_transform() {
        // No table name needed in transform mode
        assert_eq!(
            ValidatorMode::from_lookup(&vars(&[])).unwrap(),
            ValidatorMode::Transform
        );
    }

    #[test]
    fn test_validator_persist_mode() {
        let lookup = vars(&[(VALIDATOR_MODE, "persist"), (DDB_TABLE, "events")]);
        assert_eq!(
            ValidatorMode::from_lookup(&lookup).unwrap(),
            ValidatorMode::Persist {
                table: "events".to_string()
            }
        );

        let lookup = vars(&[(VALIDATOR_MODE, "persist")]);
        assert!(matches!(
            ValidatorMode::from_lookup(&lookup),
            Err(ConfigError::MissingTableName { .. })
        ));
    }

    #[test]
    fn test_validator_mode_rejects_unknown() {
        let lookup = vars(&[(VALIDATOR_MODE, "both")]);
        assert!(matches!(
            ValidatorMode::from_lookup(&lookup),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_writer_table_fallback() {
        let lookup = vars(&[(TABLE_NAME, "primary"), (DDB_TABLE, "secondary")]);
        assert_eq!(WriterConfig::from_lookup(&lookup).unwrap().table, "primary");

        let lookup = vars(&[(DDB_TABLE, "secondary")]);
        assert_eq!(WriterConfig::from_lookup(&lookup).unwrap().table, "secondary");
    }
}
