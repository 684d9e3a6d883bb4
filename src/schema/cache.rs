//! Process-wide cache of table column metadata.
//!
//! Entries are keyed by connection target and table name (case-insensitive)
//! and live until [`SchemaCache::invalidate`] or [`SchemaCache::clear`].
//! Concurrent first access may describe the same table more than once; the
//! last writer wins and every caller sees a complete, immutable slice.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::driver::{self, Connection, DriverError};

use super::field::SchemaField;

/// Errors from schema lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// The table does not exist or is not visible to the connection.
    #[error("table \"{table}\" was not found")]
    NotFound {
        /// Requested table name.
        table: String,
    },

    /// Introspection failed in the driver.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SchemaKey {
    target: String,
    table: String,
}

impl SchemaKey {
    fn new(target: &str, table: &str) -> Self {
        Self {
            target: target.to_string(),
            table: table.to_ascii_lowercase(),
        }
    }
}

/// Cache of [`SchemaField`] sets per (target, table).
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<SchemaKey, Arc<[SchemaField]>>>,
}

impl SchemaCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the fields of `table`, describing it through `conn` on a miss.
    ///
    /// `force_refresh` bypasses the cached entry for this call and stores the
    /// refreshed result. Statement texts and execution contexts rendered from
    /// the old fields are left alone; [`Caches::refresh_schema`] drops those
    /// too. An empty description is reported as [`SchemaError::NotFound`]
    /// and is not cached.
    ///
    /// [`Caches::refresh_schema`]: crate::caches::Caches::refresh_schema
    pub async fn get<C: Connection>(
        &self,
        conn: &mut C,
        table: &str,
        force_refresh: bool,
    ) -> Result<Arc<[SchemaField]>, SchemaError> {
        if !force_refresh && let Some(fields) = self.get_cached(conn.target(), table) {
            return Ok(fields);
        }

        driver::ensure_open(conn).await?;
        let described = conn.describe_table(table).await?;
        if described.is_empty() {
            return Err(SchemaError::NotFound {
                table: table.to_string(),
            });
        }
        tracing::debug!(
            target_id = conn.target(),
            table,
            columns = described.len(),
            force_refresh,
            "described table"
        );
        Ok(self.put(conn.target(), table, described))
    }

    /// Gets cached fields without I/O.
    pub fn get_cached(&self, target: &str, table: &str) -> Option<Arc<[SchemaField]>> {
        self.entries
            .read()
            .get(&SchemaKey::new(target, table))
            .cloned()
    }

    /// Caches fields for a table, returning the shared slice.
    ///
    /// Only the first identity column is kept as identity.
    pub fn put(&self, target: &str, table: &str, mut fields: Vec<SchemaField>) -> Arc<[SchemaField]> {
        let mut seen_identity = false;
        for field in fields.iter_mut().filter(|f| f.is_identity) {
            if seen_identity {
                tracing::warn!(table, column = %field.name, "ignoring extra identity column");
                field.is_identity = false;
            }
            seen_identity = true;
        }

        let fields: Arc<[SchemaField]> = fields.into();
        self.entries
            .write()
            .insert(SchemaKey::new(target, table), Arc::clone(&fields));
        fields
    }

    /// Drops the entry for one table.
    pub fn invalidate(&self, target: &str, table: &str) {
        self.entries.write().remove(&SchemaKey::new(target, table));
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
