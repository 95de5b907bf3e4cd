//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::path::PathSyntax;

/// Path syntax markers used by a [`ReactiveStore`](super::ReactiveStore).
///
/// Deserializes from partial JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Segment separator.
    pub delimiter: String,
    /// Single-level wildcard; doubled it matches any depth.
    pub wildcard: char,
    /// Prefix of a named parameter segment in subscription paths.
    pub param: String,
    /// Suffix that makes a subscription fire only for its exact path.
    pub not_recursive: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            delimiter: ".".to_string(),
            wildcard: '*',
            param: ":".to_string(),
            not_recursive: ";".to_string(),
        }
    }
}

impl StoreConfig {
    /// Checks that every marker is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyMarker`] naming the first empty marker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("delimiter", &self.delimiter),
            ("param", &self.param),
            ("not_recursive", &self.not_recursive),
        ] {
            if value.is_empty() {
                return Err(ConfigError::EmptyMarker {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The pattern syntax these markers describe.
    #[must_use]
    pub fn syntax(&self) -> PathSyntax {
        PathSyntax {
            separator: self.delimiter.clone(),
            wildcard: self.wildcard,
        }
    }
}
