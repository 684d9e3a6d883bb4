//! Filter normalization.
//!
//! Operations accept their "where" argument in several forms: a single
//! [`QueryField`], a list of them (implicitly ANDed), a pre-built
//! [`FilterNode`] tree, or a loosely-typed [`Record`](crate::entity::Record)
//! whose entries become equality comparisons. [`normalize`] turns any of them
//! into one tree of [`Comparison`]s and groups.
//!
//! Field names are not checked here. A comparison on a column the table
//! does not have is carried through and rejected when the statement is
//! generated.

mod error;
mod namer;
mod node;
mod normalize;
mod query_field;

pub use error::FilterError;
pub use namer::{ParameterNamer, filter_parameters};
pub(crate) use namer::sanitize;
pub use node::{Comparison, Conjunction, FilterNode, Operand, Operator};
pub use normalize::{IntoFilter, normalize};
pub use query_field::QueryField;
