//! Normalized filter tree.

use std::fmt;

use crate::datum::Value;

use super::error::FilterError;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=` (or `IS NULL` against NULL).
    Equal,
    /// `<>` (or `IS NOT NULL` against NULL).
    NotEqual,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `<=`
    LessThanOrEqual,
    /// `>=`
    GreaterThanOrEqual,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `BETWEEN`
    Between,
    /// `NOT BETWEEN`
    NotBetween,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
}

impl Operator {
    /// SQL text of the operator.
    pub const fn text(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThanOrEqual => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }

    /// Returns true for `In`/`NotIn`.
    pub const fn is_list(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Returns true for `Between`/`NotBetween`.
    pub const fn is_range(self) -> bool {
        matches!(self, Operator::Between | Operator::NotBetween)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Conjunction {
    /// All children must hold.
    #[default]
    And,
    /// At least one child must hold.
    Or,
}

impl Conjunction {
    /// SQL keyword.
    pub const fn text(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A single value.
    Single(Value),
    /// A value list (`In`, `Between`).
    List(Vec<Value>),
}

impl Operand {
    /// The operand values, in order.
    pub fn values(&self) -> &[Value] {
        match self {
            Operand::Single(value) => std::slice::from_ref(value),
            Operand::List(values) => values,
        }
    }
}

/// A validated field comparison.
///
/// `In`/`NotIn` always carry a non-empty list, `Between`/`NotBetween`
/// exactly two values, and every other operator a single value.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    field: String,
    operator: Operator,
    operand: Operand,
    ignore_case: bool,
}

impl Comparison {
    /// Creates a comparison, checking the operand against the operator.
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        operand: Operand,
        ignore_case: bool,
    ) -> Result<Self, FilterError> {
        let field = field.into();
        if field.trim().is_empty() {
            return Err(FilterError::EmptyField);
        }

        let operand = match (operator, operand) {
            (op, Operand::Single(value)) if op.is_list() => Operand::List(vec![value]),
            (op, Operand::List(values)) if op.is_list() && values.is_empty() => {
                return Err(FilterError::EmptyList {
                    field,
                    operator: op,
                });
            }
            (op, operand) if op.is_range() && operand.values().len() != 2 => {
                return Err(FilterError::BetweenArity {
                    field,
                    operator: op,
                    found: operand.values().len(),
                });
            }
            (op, Operand::List(mut values)) if !op.is_list() && !op.is_range() => {
                if values.len() != 1 {
                    return Err(FilterError::ListNotAllowed {
                        field,
                        operator: op,
                    });
                }
                Operand::Single(values.remove(0))
            }
            (_, operand) => operand,
        };

        Ok(Self {
            field,
            operator,
            operand,
            ignore_case,
        })
    }

    /// Shorthand for an `Equal` comparison.
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Result<Self, FilterError> {
        Self::new(field, Operator::Equal, Operand::Single(value.into()), false)
    }

    /// Compared field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Operand.
    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Operand values in order.
    pub fn values(&self) -> &[Value] {
        self.operand.values()
    }

    /// Whether text comparison ignores case.
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Returns true if this is an `Equal`/`NotEqual` against NULL, which
    /// renders as `IS [NOT] NULL` and binds no parameter.
    pub fn is_null_check(&self) -> bool {
        matches!(self.operator, Operator::Equal | Operator::NotEqual)
            && matches!(&self.operand, Operand::Single(v) if v.is_null())
    }

    fn write_shape(&self, out: &mut String) {
        out.push_str(&self.field);
        out.push(' ');
        out.push_str(self.operator.text());
        if self.is_null_check() {
            out.push_str(" NULL");
        } else {
            out.push_str(&format!(" ?{}", self.values().len()));
        }
        if self.ignore_case {
            out.push_str(" ci");
        }
    }
}

/// A normalized boolean filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// A single field comparison.
    Comparison(Comparison),
    /// Children combined with a conjunction.
    Group {
        /// How children combine.
        conjunction: Conjunction,
        /// Child filters.
        children: Vec<FilterNode>,
    },
}

impl FilterNode {
    /// Creates an `AND` group.
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            conjunction: Conjunction::And,
            children,
        }
    }

    /// Creates an `OR` group.
    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            conjunction: Conjunction::Or,
            children,
        }
    }

    /// Visits every comparison depth-first, left to right.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            FilterNode::Comparison(c) => out.push(c),
            FilterNode::Group { children, .. } => {
                for child in children {
                    child.collect_comparisons(out);
                }
            }
        }
    }

    /// Structural shape of the filter: fields, operators, value counts and
    /// nesting, but not values. Field names keep their casing since they
    /// name the bound parameters. Two filters with the same shape render to the
    /// same statement text.
    pub fn shape(&self) -> String {
        let mut out = String::new();
        self.write_shape(&mut out);
        out
    }

    fn write_shape(&self, out: &mut String) {
        match self {
            FilterNode::Comparison(c) => c.write_shape(out),
            FilterNode::Group {
                conjunction,
                children,
            } => {
                out.push('(');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                        out.push_str(conjunction.text());
                        out.push(' ');
                    }
                    child.write_shape(out);
                }
                out.push(')');
            }
        }
    }

    /// Removes empty groups and collapses single-child groups.
    ///
    /// Returns `None` when nothing is left to filter on.
    pub fn simplify(self) -> Option<FilterNode> {
        match self {
            FilterNode::Comparison(_) => Some(self),
            FilterNode::Group {
                conjunction,
                children,
            } => {
                let mut children: Vec<FilterNode> =
                    children.into_iter().filter_map(FilterNode::simplify).collect();
                match children.len() {
                    0 => None,
                    1 => children.pop(),
                    _ => Some(FilterNode::Group {
                        conjunction,
                        children,
                    }),
                }
            }
        }
    }
}

impl From<Comparison> for FilterNode {
    fn from(comparison: Comparison) -> Self {
        FilterNode::Comparison(comparison)
    }
}
