//! Error types for calyx_core

use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised by core value handling and registries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A value was registered twice in a registry that requires uniqueness
    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// A value could not be coerced into the requested kind
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueKind, found: ValueKind },
}

/// Result type for calyx_core operations
pub type Result<T> = std::result::Result<T, CoreError>;
