//! Per-call operation options.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::statement::OrderField;

/// Knobs accepted by every session operation. Options an operation has no
/// use for are ignored.
///
/// ```ignore
/// let options = OperationOptions::new()
///     .batch_size(50)
///     .hints("WITH (NOLOCK)")
///     .trace_key("import");
/// session.insert_all("people", &mut people, &options).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    /// Rows per command for batch operations; the setting's default when
    /// unset.
    pub batch_size: Option<usize>,
    /// Columns to write, or to project for queries. Every matching column
    /// when unset.
    pub fields: Option<Vec<String>>,
    /// Match columns for merge, update and key-based delete. The primary
    /// key (or identity) when empty.
    pub qualifiers: Vec<String>,
    /// Table hints passed verbatim to the statement builder.
    pub hints: Option<String>,
    /// Query ordering.
    pub order_by: Vec<OrderField>,
    /// Query row limit.
    pub top: Option<usize>,
    /// Command timeout; the setting's default when unset.
    pub timeout: Option<Duration>,
    /// Key reported to the trace hook instead of the operation name.
    pub trace_key: Option<String>,
    /// Result-cache key for reads.
    pub cache_key: Option<String>,
    /// Result-cache expiration; the setting's default when unset.
    pub cache_expiration: Option<Duration>,
    /// Signal cancellation.
    pub cancellation: Option<CancellationToken>,
}

impl OperationOptions {
    /// Options with every knob unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Sets the columns to write or project.
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the qualifier columns.
    pub fn qualifiers<S: Into<String>>(mut self, qualifiers: impl IntoIterator<Item = S>) -> Self {
        self.qualifiers = qualifiers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the table hints.
    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }

    /// Sets the query ordering.
    pub fn order_by(mut self, order_by: Vec<OrderField>) -> Self {
        self.order_by = order_by;
        self
    }

    /// Sets the query row limit.
    pub fn top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    /// Sets the command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the trace key.
    pub fn trace_key(mut self, key: impl Into<String>) -> Self {
        self.trace_key = Some(key.into());
        self
    }

    /// Caches read results under `key`.
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Sets the result-cache expiration.
    pub fn cache_expiration(mut self, expiration: Duration) -> Self {
        self.cache_expiration = Some(expiration);
        self
    }

    /// Attaches a cancellation token.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}
