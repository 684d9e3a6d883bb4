//! The dialect builder contract.

use crate::filter::sanitize;
use crate::schema::SchemaField;

use super::error::StatementError;
use super::request::{OperationKind, OperationRequest};

/// Alias of the generated key column returned by identity-returning inserts
/// and merges.
pub const RESULT_COLUMN: &str = "Result";

/// Alias of the literal row index appended to each statement of an
/// identity-returning batch, used to correlate returned keys with input rows.
pub const ORDER_COLUMN: &str = "__OrderColumn";

/// Name of the parameter bound for `field` (without the dialect prefix).
///
/// Statements rendered for a batch of more than one row suffix every column
/// parameter with the row index: `Name_0`, `Name_1`, ...
pub fn parameter_name(field: &str, row: Option<usize>) -> String {
    let base = sanitize(field);
    match row {
        Some(index) => format!("{base}_{index}"),
        None => base,
    }
}

/// Row index used for parameter names of row `index` in a batch of `batch_size`.
pub fn row_suffix(batch_size: usize, index: usize) -> Option<usize> {
    (batch_size > 1).then_some(index)
}

/// Renders requests into SQL text for one database dialect.
///
/// The core never embeds dialect rules; everything it executes comes from
/// an implementation of this trait. Implementations must validate every
/// field a request names against `fields` and report unknown ones as
/// [`StatementError::UnqualifiedField`].
///
/// Parameter names must follow [`parameter_name`] for column values and
/// [`ParameterNamer`](crate::filter::ParameterNamer) for filter values so
/// that the binders produced by the execution context line up with the
/// text.
pub trait StatementBuilder: Send + Sync {
    /// Identity of the builder and its settings. Statement texts are cached
    /// per name.
    fn name(&self) -> &str;

    /// Whether an identity-returning statement of `kind` rendered for
    /// `batch_size` rows returns the generated keys.
    fn returns_identity(&self, kind: OperationKind, batch_size: usize) -> bool {
        let _ = (kind, batch_size);
        true
    }

    /// `SELECT` for `Query`/`QueryAll`.
    fn build_query(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError>;

    /// Aggregate `SELECT` for `Count`/`Sum`/`Max`/`Min`/`Average` and their
    /// `*All` forms.
    fn build_aggregate(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError>;

    /// Existence check.
    fn build_exists(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError>;

    /// `INSERT` for `Insert`/`InsertAll`.
    fn build_insert(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError>;

    /// Upsert for `Merge`/`MergeAll`.
    fn build_merge(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError>;

    /// `UPDATE` for `Update`/`UpdateAll`.
    fn build_update(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError>;

    /// Columns an `Insert`, `Merge` or `Update` statement binds per row, in
    /// binding order. Execution contexts bind exactly these, so every bound
    /// parameter appears in the text. Other kinds bind no columns.
    fn bound_columns(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<Vec<String>, StatementError>;

    /// `DELETE` for `Delete`/`DeleteAll`.
    fn build_delete(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError>;

    /// `TRUNCATE`.
    fn build_truncate(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError>;

    /// Dispatches on the request kind.
    fn build(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        match request.kind {
            OperationKind::Query | OperationKind::QueryAll => self.build_query(request, fields),
            OperationKind::Exists => self.build_exists(request, fields),
            OperationKind::Insert | OperationKind::InsertAll => self.build_insert(request, fields),
            OperationKind::Merge | OperationKind::MergeAll => self.build_merge(request, fields),
            OperationKind::Update | OperationKind::UpdateAll => self.build_update(request, fields),
            OperationKind::Delete | OperationKind::DeleteAll => self.build_delete(request, fields),
            OperationKind::Truncate => self.build_truncate(request, fields),
            kind if kind.aggregate().is_some() => self.build_aggregate(request, fields),
            kind => Err(StatementError::Unsupported {
                kind,
                builder: self.name().to_string(),
            }),
        }
    }
}
