//! Statement generation errors.

use thiserror::Error;

use super::request::OperationKind;

/// A request that cannot be rendered against the table's schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    /// A field is not a column of the table.
    #[error("field \"{field}\" is not a column of the table")]
    UnqualifiedField {
        /// Offending field name.
        field: String,
    },

    /// A key-matched statement has no qualifier, primary key or identity.
    #[error("no qualifier fields and the table has no primary key or identity")]
    PrimaryKeyRequired,

    /// Nothing is left to write after excluding key and generated columns.
    #[error("{kind} has no writable fields")]
    NoWritableFields {
        /// Operation kind.
        kind: OperationKind,
    },

    /// An aggregate other than `COUNT` names no field.
    #[error("{kind} requires exactly one field")]
    AggregateField {
        /// Operation kind.
        kind: OperationKind,
    },

    /// The builder does not render this kind.
    #[error("{kind} is not supported by the {builder} builder")]
    Unsupported {
        /// Operation kind.
        kind: OperationKind,
        /// Builder name.
        builder: String,
    },
}
