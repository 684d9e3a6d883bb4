//! Process-wide cache of compiled execution contexts.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::statement::OperationKind;

use super::ExecutionContext;

/// Everything that changes the compiled context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ContextKey {
    pub builder: String,
    pub target: String,
    pub kind: OperationKind,
    pub table: String,
    pub type_tag: String,
    pub entity_fields: Vec<String>,
    pub fields: Option<Vec<String>>,
    pub qualifiers: Vec<String>,
    pub hints: Option<String>,
    pub batch_size: usize,
}

/// Cache of [`ExecutionContext`]s by entity shape, column set and batch
/// size.
#[derive(Debug, Default)]
pub struct ContextCache {
    entries: RwLock<HashMap<ContextKey, Arc<ExecutionContext>>>,
}

impl ContextCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &ContextKey) -> Option<Arc<ExecutionContext>> {
        self.entries.read().get(key).cloned()
    }

    /// Stores a compiled context. When two callers race to compile the same
    /// shape the later insert replaces the earlier; both are equivalent.
    pub(crate) fn put(&self, key: ContextKey, context: ExecutionContext) -> Arc<ExecutionContext> {
        let context = Arc::new(context);
        self.entries.write().insert(key, Arc::clone(&context));
        context
    }

    /// Number of cached contexts.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every context compiled for `table` on `target` and returns how
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
