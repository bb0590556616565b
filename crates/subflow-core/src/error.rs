//! # Error Types
//!
//! Errors raised while constructing or parsing the foundational types.
//! Lifecycle and persistence errors live in the crates that own those
//! concerns (`subflow-state`, `subflow-engine`).

use thiserror::Error;

/// Error type for the foundational primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubflowError {
    /// A timestamp string or epoch value could not be interpreted.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A role name did not match any known role.
    #[error("unknown role: {0:?}")]
    UnknownRole(String),

    /// An identifier failed validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}
