//! Memoized statement text.
//!
//! Texts are keyed by the structural shape of the request: builder,
//! connection target, kind, table, fields, filter shape, order, hints,
//! qualifiers, batch size and row limit. Filter values are not part of the
//! key. There is no eviction; the number of distinct shapes an application
//! issues is small and stable.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::schema::SchemaField;

use super::builder::StatementBuilder;
use super::error::StatementError;
use super::request::{OperationKind, OperationRequest, Order};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StatementKey {
    builder: String,
    target: String,
    kind: OperationKind,
    table: String,
    fields: Vec<String>,
    filter: Option<String>,
    order_by: Vec<(String, Order)>,
    hints: Option<String>,
    qualifiers: Vec<String>,
    batch_size: usize,
    top: Option<usize>,
}

impl StatementKey {
    fn new(builder: &str, target: &str, request: &OperationRequest) -> Self {
        let lower = |names: &[String]| -> Vec<String> {
            names.iter().map(|n| n.to_ascii_lowercase()).collect()
        };
        Self {
            builder: builder.to_string(),
            target: target.to_string(),
            kind: request.kind,
            table: request.table.to_ascii_lowercase(),
            fields: lower(&request.fields),
            filter: request.filter.as_ref().map(|f| f.shape()),
            order_by: request
                .order_by
                .iter()
                .map(|o| (o.name.to_ascii_lowercase(), o.order))
                .collect(),
            hints: request.hints.clone(),
            qualifiers: lower(&request.qualifiers),
            batch_size: request.batch_size,
            top: request.top,
        }
    }
}

/// Cache of rendered statement texts.
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: RwLock<HashMap<StatementKey, Arc<str>>>,
}

impl StatementCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the text for `request`, rendering it with `builder` on a miss.
    ///
    /// Render failures are not cached.
    pub fn get_text(
        &self,
        builder: &dyn StatementBuilder,
        target: &str,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<Arc<str>, StatementError> {
        let key = StatementKey::new(builder.name(), target, request);
        if let Some(text) = self.entries.read().get(&key) {
            return Ok(Arc::clone(text));
        }

        let text: Arc<str> = builder.build(request, fields)?.into();
        tracing::debug!(
            kind = %request.kind,
            table = %request.table,
            batch_size = request.batch_size,
            text = %text,
            "generated statement"
        );
        self.entries.write().insert(key, Arc::clone(&text));
        Ok(text)
    }

    /// Number of cached texts.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every text rendered for `table` on `target` and returns how
    /// many were dropped.
    pub fn invalidate_table(&self, target: &str, table: &str) -> usize {
        let table = table.to_ascii_lowercase();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.target != target || key.table != table);
        before - entries.len()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
