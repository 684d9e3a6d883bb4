//! The process-wide cache bundle.

use std::sync::{Arc, OnceLock};

use crate::context::ContextCache;
use crate::driver::Connection;
use crate::schema::{SchemaCache, SchemaError, SchemaField};
use crate::statement::StatementCache;

/// Schema, statement-text and execution-context caches.
///
/// Sessions share [`Caches::global`] unless built with their own bundle.
/// Entries live until [`clear`](Self::clear) is called.
#[derive(Debug, Default)]
pub struct Caches {
    schema: SchemaCache,
    statements: StatementCache,
    contexts: ContextCache,
}

impl Caches {
    /// Creates an empty, private bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundle shared by every session of the process, created on first
    /// use.
    pub fn global() -> Arc<Caches> {
        static GLOBAL: OnceLock<Arc<Caches>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Caches::new())))
    }

    /// Schema field cache.
    pub fn schema(&self) -> &SchemaCache {
        &self.schema
    }

    /// Statement text cache.
    pub fn statements(&self) -> &StatementCache {
        &self.statements
    }

    /// Execution context cache.
    pub fn contexts(&self) -> &ContextCache {
        &self.contexts
    }

    /// Re-reads the fields of `table` and drops the statement texts and
    /// execution contexts built from the previous ones.
    pub async fn refresh_schema<C: Connection>(
        &self,
        conn: &mut C,
        table: &str,
    ) -> Result<Arc<[SchemaField]>, SchemaError> {
        let fields = self.schema.get(conn, table, true).await?;
        let statements = self.statements.invalidate_table(conn.target(), table);
        let contexts = self.contexts.invalidate_table(conn.target(), table);
        tracing::debug!(
            target_id = conn.target(),
            table,
            statements,
            contexts,
            "refreshed schema"
        );
        Ok(fields)
    }

    /// Empties every cache.
    pub fn clear(&self) {
        self.schema.clear();
        self.statements.clear();
        self.contexts.clear();
        tracing::debug!("cleared schema, statement and context caches");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbSetting;
    use crate::context::{self, ContextRequest};
    use crate::datum::Type;
    use crate::driver::MemoryConnection;
    use crate::entity::Record;
    use crate::statement::{AnsiStatementBuilder, OperationKind};

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&Caches::global(), &Caches::global()));
        assert!(!Arc::ptr_eq(&Caches::global(), &Arc::new(Caches::new())));
    }

    #[tokio::test]
    async fn test_refresh_schema_drops_dependent_entries() {
        let caches = Caches::new();
        let builder = AnsiStatementBuilder::new(&DbSetting::default());
        let mut conn = MemoryConnection::new("memory://refresh")
            .with_table(
                "people",
                vec![
                    SchemaField::new("Id", 0, Type::Int8).primary(),
                    SchemaField::new("Name", 1, Type::Text),
                ],
            )
            .with_table("pets", vec![SchemaField::new("Id", 0, Type::Int8).primary()]);
        let log = conn.log();
        let person = Record::new().with("Id", 1i64).with("Name", "a");
        let pet = Record::new().with("Id", 2i64);

        for (table, entity) in [("people", &person), ("pets", &pet)] {
            let request = ContextRequest {
                kind: OperationKind::Insert,
                table,
                batch_size: 1,
                fields: None,
                qualifiers: &[],
                hints: None,
            };
            context::create(&mut conn, &caches, &builder, entity, &request)
                .await
                .unwrap();
        }
        assert_eq!((caches.statements().len(), caches.contexts().len()), (2, 2));

        let fields = caches.refresh_schema(&mut conn, "people").await.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!((caches.statements().len(), caches.contexts().len()), (1, 1));
        assert_eq!(caches.schema().len(), 2);
        assert_eq!(log.describe_calls(), 3);
    }
}
