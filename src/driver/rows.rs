//! Row-oriented result data.

use std::future::Future;

use crate::datum::{Type, Value};

use super::error::DriverError;

/// Result column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDesc {
    /// Column name (or alias).
    pub name: String,
    /// Column data type, when the driver reports it.
    pub data_type: Option<Type>,
}

impl ColumnDesc {
    /// Creates a column with an unknown type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }

    /// Creates a typed column.
    pub fn typed(name: impl Into<String>, data_type: Type) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
        }
    }
}

/// One result row, values in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// Column values.
    pub values: Vec<Value>,
}

impl Row {
    /// Creates a row from values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Returns the value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One materialized result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    /// Column metadata.
    pub columns: Vec<ColumnDesc>,
    /// Rows in order.
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a result set with untyped columns.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(ColumnDesc::new).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn with_row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(Row::new(values));
        self
    }
}

/// A forward-only stream over one or more result sets.
///
/// Rows are read with [`next_row`](Self::next_row) until it yields `None`;
/// [`next_result`](Self::next_result) then advances to the following result
/// set of a multi-statement command. A stream cannot be restarted.
pub trait RowStream: Send {
    /// Columns of the current result set.
    fn columns(&self) -> &[ColumnDesc];

    /// Reads the next row of the current result set.
    fn next_row(&mut self) -> impl Future<Output = Result<Option<Row>, DriverError>> + Send;

    /// Advances to the next result set. Returns false when there is none.
    fn next_result(&mut self) -> impl Future<Output = Result<bool, DriverError>> + Send;
}
