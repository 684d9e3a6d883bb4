//! Operation requests: the structural description a statement is built from.

use std::fmt;

use crate::filter::FilterNode;

/// The kind of operation a statement implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Filtered `AVG`.
    Average,
    /// Unfiltered `AVG`.
    AverageAll,
    /// Filtered `COUNT(*)`.
    Count,
    /// Unfiltered `COUNT(*)`.
    CountAll,
    /// Filtered delete.
    Delete,
    /// Delete every row, or the rows matching a key list.
    DeleteAll,
    /// Filtered existence check.
    Exists,
    /// Single-row insert.
    Insert,
    /// Batched insert.
    InsertAll,
    /// Filtered `MAX`.
    Max,
    /// Unfiltered `MAX`.
    MaxAll,
    /// Single-row upsert.
    Merge,
    /// Batched upsert.
    MergeAll,
    /// Filtered `MIN`.
    Min,
    /// Unfiltered `MIN`.
    MinAll,
    /// Filtered select.
    Query,
    /// Unfiltered select.
    QueryAll,
    /// Filtered `SUM`.
    Sum,
    /// Unfiltered `SUM`.
    SumAll,
    /// Remove every row.
    Truncate,
    /// Single-row or filtered update.
    Update,
    /// Batched update by qualifiers.
    UpdateAll,
}

impl OperationKind {
    /// Operation name.
    pub const fn name(self) -> &'static str {
        match self {
            OperationKind::Average => "Average",
            OperationKind::AverageAll => "AverageAll",
            OperationKind::Count => "Count",
            OperationKind::CountAll => "CountAll",
            OperationKind::Delete => "Delete",
            OperationKind::DeleteAll => "DeleteAll",
            OperationKind::Exists => "Exists",
            OperationKind::Insert => "Insert",
            OperationKind::InsertAll => "InsertAll",
            OperationKind::Max => "Max",
            OperationKind::MaxAll => "MaxAll",
            OperationKind::Merge => "Merge",
            OperationKind::MergeAll => "MergeAll",
            OperationKind::Min => "Min",
            OperationKind::MinAll => "MinAll",
            OperationKind::Query => "Query",
            OperationKind::QueryAll => "QueryAll",
            OperationKind::Sum => "Sum",
            OperationKind::SumAll => "SumAll",
            OperationKind::Truncate => "Truncate",
            OperationKind::Update => "Update",
            OperationKind::UpdateAll => "UpdateAll",
        }
    }

    /// The aggregate this kind computes, if any.
    pub const fn aggregate(self) -> Option<Aggregate> {
        match self {
            OperationKind::Count | OperationKind::CountAll => Some(Aggregate::Count),
            OperationKind::Sum | OperationKind::SumAll => Some(Aggregate::Sum),
            OperationKind::Max | OperationKind::MaxAll => Some(Aggregate::Max),
            OperationKind::Min | OperationKind::MinAll => Some(Aggregate::Min),
            OperationKind::Average | OperationKind::AverageAll => Some(Aggregate::Average),
            _ => None,
        }
    }

    /// Returns true for kinds that write rows.
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            OperationKind::Delete
                | OperationKind::DeleteAll
                | OperationKind::Insert
                | OperationKind::InsertAll
                | OperationKind::Merge
                | OperationKind::MergeAll
                | OperationKind::Truncate
                | OperationKind::Update
                | OperationKind::UpdateAll
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    /// `COUNT(*)`
    Count,
    /// `SUM(field)`
    Sum,
    /// `MAX(field)`
    Max,
    /// `MIN(field)`
    Min,
    /// `AVG(field)`
    Average,
}

impl Aggregate {
    /// SQL function name.
    pub const fn function(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
            Aggregate::Average => "AVG",
        }
    }

    /// Alias of the result column, e.g. `CountValue`.
    pub const fn alias(self) -> &'static str {
        match self {
            Aggregate::Count => "CountValue",
            Aggregate::Sum => "SumValue",
            Aggregate::Max => "MaxValue",
            Aggregate::Min => "MinValue",
            Aggregate::Average => "AverageValue",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    /// `ASC`
    #[default]
    Ascending,
    /// `DESC`
    Descending,
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderField {
    /// Field name.
    pub name: String,
    /// Direction.
    pub order: Order,
}

impl OrderField {
    /// Ascending order on `name`.
    pub fn ascending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: Order::Ascending,
        }
    }

    /// Descending order on `name`.
    pub fn descending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: Order::Descending,
        }
    }
}

/// Everything a statement builder needs to render one statement.
///
/// Filter values never reach the text; they are bound as parameters. Two
/// requests that differ only in filter values render identically.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Operation kind.
    pub kind: OperationKind,
    /// Target table.
    pub table: String,
    /// Entity type tag, when the call is typed.
    pub entity_type: Option<String>,
    /// Fields to write, project or aggregate. Empty projects every column.
    pub fields: Vec<String>,
    /// Row filter.
    pub filter: Option<FilterNode>,
    /// Sort order.
    pub order_by: Vec<OrderField>,
    /// Table hints, rendered verbatim after the table name.
    pub hints: Option<String>,
    /// Fields matching existing rows for merge and update.
    pub qualifiers: Vec<String>,
    /// Rows per command for batched kinds.
    pub batch_size: usize,
    /// Maximum number of rows a query returns.
    pub top: Option<usize>,
}

impl OperationRequest {
    /// Creates a request with no fields, filter or hints and a batch size of 1.
    pub fn new(kind: OperationKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            entity_type: None,
            fields: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            hints: None,
            qualifiers: Vec::new(),
            batch_size: 1,
            top: None,
        }
    }

    /// Sets the entity type tag.
    pub fn entity_type(mut self, tag: impl Into<String>) -> Self {
        self.entity_type = Some(tag.into());
        self
    }

    /// Sets the fields.
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the filter.
    pub fn filter(mut self, filter: Option<FilterNode>) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the sort order.
    pub fn order_by(mut self, order_by: Vec<OrderField>) -> Self {
        self.order_by = order_by;
        self
    }

    /// Sets the table hints.
    pub fn hints(mut self, hints: Option<String>) -> Self {
        self.hints = hints;
        self
    }

    /// Sets the qualifier fields.
    pub fn qualifiers<S: Into<String>>(mut self, qualifiers: impl IntoIterator<Item = S>) -> Self {
        self.qualifiers = qualifiers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the batch size (at least 1).
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets the row limit.
    pub fn top(mut self, top: Option<usize>) -> Self {
        self.top = top;
        self
    }
}
