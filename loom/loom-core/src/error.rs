//! Shared error vocabulary.

use crate::TypeId;
use thiserror::Error;

/// A structural invariant of the IR was violated.
///
/// Parsers guarantee these invariants; seeing one of these after a parser
/// returned Ok means the parser has a bug, and the pipeline reports the job
/// failure with this distinct kind rather than as an input error.
#[derive(Debug, Error)]
pub enum InvariantError {
    #[error("Duplicate operation id: {0}")]
    DuplicateOperationId(String),

    #[error("Duplicate {location} parameter '{name}' on operation {operation}")]
    DuplicateParameter {
        operation: String,
        location: &'static str,
        name: String,
    },

    #[error("Operation {operation}: required field '{field}' is not a declared property")]
    RequiredNotDeclared { operation: String, field: String },

    #[error("Operation {operation}: enum value {value} does not match the enum base type")]
    EnumValueMismatch { operation: String, value: String },

    #[error("Operation {operation}: unresolved type reference {id}")]
    UnresolvedRef { operation: String, id: TypeId },
}
