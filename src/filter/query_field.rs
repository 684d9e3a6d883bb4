//! Caller-facing comparison builder.

use crate::datum::Value;

use super::error::FilterError;
use super::node::{Comparison, Operand, Operator};

/// One field comparison as written by a caller.
///
/// Operand rules are checked when the field is normalized into a
/// [`FilterNode`](super::FilterNode), not at construction.
///
/// ```ignore
/// let adults = QueryField::new("Age", Operator::GreaterThanOrEqual, 18);
/// let named = QueryField::equal("Name", "ada").ignore_case();
/// let picked = QueryField::any_of("Id", [1, 2, 3]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryField {
    /// Field name.
    pub name: String,
    /// Operator.
    pub operator: Operator,
    /// Right-hand side.
    pub operand: Operand,
    /// Compare text case-insensitively.
    pub ignore_case: bool,
}

impl QueryField {
    /// Creates a comparison against a single value.
    pub fn new(name: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            operator,
            operand: Operand::Single(value.into()),
            ignore_case: false,
        }
    }

    /// Creates an `Equal` comparison.
    pub fn equal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Operator::Equal, value)
    }

    /// Creates an `In` comparison.
    pub fn any_of<V: Into<Value>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::list(name, Operator::In, values)
    }

    /// Creates a `Between` comparison.
    pub fn between(
        name: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            operator: Operator::Between,
            operand: Operand::List(vec![low.into(), high.into()]),
            ignore_case: false,
        }
    }

    /// Creates a comparison against a value list.
    pub fn list<V: Into<Value>>(
        name: impl Into<String>,
        operator: Operator,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            name: name.into(),
            operator,
            operand: Operand::List(values.into_iter().map(Into::into).collect()),
            ignore_case: false,
        }
    }

    /// Compares text case-insensitively.
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Validates into a [`Comparison`].
    pub fn into_comparison(self) -> Result<Comparison, FilterError> {
        Comparison::new(self.name, self.operator, self.operand, self.ignore_case)
    }
}
