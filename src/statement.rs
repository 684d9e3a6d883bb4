//! Statement generation.
//!
//! An [`OperationRequest`] describes what to do: kind, table, fields,
//! filter, order, hints, qualifiers and batch size. A [`StatementBuilder`]
//! renders it to SQL for one dialect, and the [`StatementCache`] memoizes
//! the text by the request's structural shape so that repeated calls skip
//! rendering.
//!
//! [`AnsiStatementBuilder`] is the default builder.

mod ansi;
mod builder;
mod cache;
mod error;
mod request;

pub use ansi::AnsiStatementBuilder;
pub use builder::{ORDER_COLUMN, RESULT_COLUMN, StatementBuilder, parameter_name, row_suffix};
pub use cache::StatementCache;
pub use error::StatementError;
pub use request::{Aggregate, OperationKind, OperationRequest, Order, OrderField};
