//! Filter construction errors.

use thiserror::Error;

use super::node::Operator;

/// A comparison that violates its operator's operand rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// A comparison names no field.
    #[error("comparison has an empty field name")]
    EmptyField,

    /// `In`/`NotIn` was given no values.
    #[error("{operator} on \"{field}\" requires at least one value")]
    EmptyList {
        /// Field name.
        field: String,
        /// Offending operator.
        operator: Operator,
    },

    /// `Between`/`NotBetween` was not given exactly two values.
    #[error("{operator} on \"{field}\" requires exactly two values, found {found}")]
    BetweenArity {
        /// Field name.
        field: String,
        /// Offending operator.
        operator: Operator,
        /// Number of values supplied.
        found: usize,
    },

    /// A scalar operator was given a value list.
    #[error("{operator} on \"{field}\" takes a single value, found a list")]
    ListNotAllowed {
        /// Field name.
        field: String,
        /// Offending operator.
        operator: Operator,
    },
}
