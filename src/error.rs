//! Error types for kyrostate.
//!
//! All errors are strongly typed using thiserror. Configuration errors are
//! raised while parsing patterns or subscribing and are never recoverable;
//! execution errors come from writes that cannot be applied to the tree.
//! Reading a missing path is not an error (it yields `None`).

use thiserror::Error;

/// Configuration errors raised at parse or subscribe time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Pattern '{pattern}' cannot have more than one variable-length segment (*? or **)")]
    MultipleVariableSegments {
        pattern: String,
    },

    #[error("Marker '{field}' cannot be empty")]
    EmptyMarker {
        field: String,
    },

    #[error("Invalid prop: {reason}")]
    InvalidProp {
        reason: String,
    },

    #[error("Invalid parameter marker: {reason}")]
    InvalidParamMarker {
        reason: String,
    },
}

/// Execution errors that occur while applying an update to the data tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Cannot descend into '{path}': value is not a container")]
    NotAContainer {
        path: String,
    },

    #[error("Segment '{segment}' of '{path}' is not a valid sequence index")]
    InvalidIndex {
        path: String,
        segment: String,
    },

    #[error("Store has been destroyed")]
    Destroyed,
}

/// Top-level error type for kyrostate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl StateError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

/// Result type alias for kyrostate operations.
pub type StateResult<T> = Result<T, StateError>;
