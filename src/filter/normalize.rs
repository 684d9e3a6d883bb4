//! Conversion of the accepted "where" inputs into one [`FilterNode`].

use crate::datum::Value;
use crate::entity::Record;

use super::error::FilterError;
use super::node::{Comparison, FilterNode};
use super::query_field::QueryField;

/// A value usable as an operation's "where" argument.
///
/// `Ok(None)` means no filter: the operation matches every row.
pub trait IntoFilter {
    /// Normalizes `self` into a filter tree.
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError>;
}

/// Normalizes any accepted filter input.
pub fn normalize<F: IntoFilter>(input: F) -> Result<Option<FilterNode>, FilterError> {
    input.into_filter()
}

/// ANDs the given nodes, collapsing trivial groups.
fn conjoin(children: Vec<FilterNode>) -> Option<FilterNode> {
    FilterNode::and(children).simplify()
}

impl IntoFilter for QueryField {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        Ok(Some(FilterNode::Comparison(self.into_comparison()?)))
    }
}

impl IntoFilter for Comparison {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        Ok(Some(FilterNode::Comparison(self)))
    }
}

/// A pre-built tree, e.g. from a predicate front-end. Comparisons in it are
/// already validated; groups are simplified.
impl IntoFilter for FilterNode {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        Ok(self.simplify())
    }
}

/// A list of comparisons, implicitly ANDed. An empty list is no filter.
impl IntoFilter for Vec<QueryField> {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        let children = self
            .into_iter()
            .map(|field| field.into_comparison().map(FilterNode::Comparison))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conjoin(children))
    }
}

impl IntoFilter for &[QueryField] {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        self.to_vec().into_filter()
    }
}

impl<const N: usize> IntoFilter for [QueryField; N] {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        Vec::from(self).into_filter()
    }
}

/// A loosely-typed object: every entry becomes an equality comparison.
impl IntoFilter for &Record {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        let children = self
            .iter()
            .map(|(name, value)| Comparison::equal(name, value.clone()).map(FilterNode::Comparison))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conjoin(children))
    }
}

impl IntoFilter for Record {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        (&self).into_filter()
    }
}

/// A single `(field, value)` pair as an equality comparison.
impl<V: Into<Value>> IntoFilter for (&str, V) {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        QueryField::equal(self.0, self.1).into_filter()
    }
}

impl<F: IntoFilter> IntoFilter for Option<F> {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        match self {
            Some(inner) => inner.into_filter(),
            None => Ok(None),
        }
    }
}

/// No filter.
impl IntoFilter for () {
    fn into_filter(self) -> Result<Option<FilterNode>, FilterError> {
        Ok(None)
    }
}
