//! Operation-level errors.

use thiserror::Error;

use crate::context::ContextError;
use crate::datum::ConversionError;
use crate::driver::DriverError;
use crate::filter::FilterError;
use crate::schema::SchemaError;
use crate::statement::{OperationKind, StatementError};

/// Errors returned by session operations.
///
/// Every variant except [`Driver`](DbError::Driver) names the operation and
/// table it came from. Driver errors pass through unchanged; nothing is
/// retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DbError {
    /// The table does not exist or is not visible.
    #[error("{kind}: table \"{table}\" was not found")]
    SchemaNotFound {
        /// Operation kind.
        kind: OperationKind,
        /// Table name.
        table: String,
    },

    /// A filter, projection or field list names a column the table lacks.
    #[error("{kind} on \"{table}\": field \"{field}\" is not a column of the table")]
    UnqualifiedField {
        /// Operation kind.
        kind: OperationKind,
        /// Table name.
        table: String,
        /// Offending field.
        field: String,
    },

    /// No qualifiers were given and the table has no primary key or identity.
    #[error("{kind} on \"{table}\": a primary key, identity or qualifier field is required")]
    PrimaryKeyRequired {
        /// Operation kind.
        kind: OperationKind,
        /// Table name.
        table: String,
    },

    /// The entity's fields cannot be bound to the table's columns.
    #[error("{kind} on \"{table}\": cannot bind {entity}: {reason}")]
    UnresolvedEntityShape {
        /// Operation kind.
        kind: OperationKind,
        /// Table name.
        table: String,
        /// Entity type tag.
        entity: String,
        /// What did not line up.
        reason: String,
    },

    /// A single row needs more parameters than one command may bind.
    #[error("{kind} on \"{table}\": {per_row} parameters per row exceed the limit of {limit}")]
    ParameterLimitExceeded {
        /// Operation kind.
        kind: OperationKind,
        /// Table name.
        table: String,
        /// Parameters bound per row.
        per_row: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The filter argument is malformed.
    #[error("{kind} on \"{table}\": {source}")]
    InvalidFilter {
        /// Operation kind.
        kind: OperationKind,
        /// Table name.
        table: String,
        /// Cause.
        source: FilterError,
    },

    /// The statement builder rejected the request.
    #[error("{kind} on \"{table}\": {source}")]
    Statement {
        /// Operation kind.
        kind: OperationKind,
        /// Table name.
        table: String,
        /// Cause.
        source: StatementError,
    },

    /// A returned value does not fit the target field.
    #[error("{kind} on \"{table}\": {source}")]
    Conversion {
        /// Operation kind.
        kind: OperationKind,
        /// Table name.
        table: String,
        /// Cause.
        source: ConversionError,
    },

    /// The driver failed.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The operation's cancellation token fired.
    #[error("{kind} on \"{table}\" was cancelled")]
    Cancelled {
        /// Operation kind.
        kind: OperationKind,
        /// Table name.
        table: String,
    },
}

impl DbError {
    /// Attaches operation context to a statement error.
    pub(crate) fn statement(kind: OperationKind, table: &str, error: StatementError) -> Self {
        let table = table.to_string();
        match error {
            StatementError::UnqualifiedField { field } => DbError::UnqualifiedField {
                kind,
                table,
                field,
            },
            StatementError::PrimaryKeyRequired => DbError::PrimaryKeyRequired { kind, table },
            source => DbError::Statement {
                kind,
                table,
                source,
            },
        }
    }

    /// Attaches operation context to a schema error.
    pub(crate) fn schema(kind: OperationKind, table: &str, error: SchemaError) -> Self {
        match error {
            SchemaError::NotFound { .. } => DbError::SchemaNotFound {
                kind,
                table: table.to_string(),
            },
            SchemaError::Driver(e) => DbError::Driver(e),
        }
    }

    /// Attaches operation context to a context compilation error.
    pub(crate) fn context(kind: OperationKind, table: &str, error: ContextError) -> Self {
        match error {
            ContextError::Schema(e) => Self::schema(kind, table, e),
            ContextError::Statement(e) => Self::statement(kind, table, e),
            ContextError::UnresolvedEntityShape { entity, reason } => {
                DbError::UnresolvedEntityShape {
                    kind,
                    table: table.to_string(),
                    entity,
                    reason,
                }
            }
        }
    }

    /// Attaches operation context to a filter error.
    pub(crate) fn filter(kind: OperationKind, table: &str, source: FilterError) -> Self {
        DbError::InvalidFilter {
            kind,
            table: table.to_string(),
            source,
        }
    }

    /// Attaches operation context to a conversion error.
    pub(crate) fn conversion(kind: OperationKind, table: &str, source: ConversionError) -> Self {
        DbError::Conversion {
            kind,
            table: table.to_string(),
            source,
        }
    }

    /// Returns true for [`DbError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DbError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_errors_are_lifted() {
        let err = DbError::statement(
            OperationKind::Query,
            "people",
            StatementError::UnqualifiedField {
                field: "Salary".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "Query on \"people\": field \"Salary\" is not a column of the table"
        );

        let err = DbError::statement(OperationKind::Merge, "kv", StatementError::PrimaryKeyRequired);
        assert!(matches!(err, DbError::PrimaryKeyRequired { kind: OperationKind::Merge, .. }));
    }

    #[test]
    fn test_driver_errors_pass_through() {
        let source = DriverError::constraint("duplicate key");
        let err = DbError::context(
            OperationKind::Insert,
            "people",
            ContextError::Schema(SchemaError::Driver(source.clone())),
        );
        assert_eq!(err, DbError::Driver(source));
        assert_eq!(err.to_string(), "duplicate key");
    }

    #[test]
    fn test_schema_not_found_names_table_and_kind() {
        let err = DbError::schema(
            OperationKind::CountAll,
            "ghost",
            SchemaError::NotFound {
                table: "ghost".to_string(),
            },
        );
        assert_eq!(err.to_string(), "CountAll: table \"ghost\" was not found");
    }
}
