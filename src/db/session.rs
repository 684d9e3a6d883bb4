//! Sessions: one connection plus everything operations run with.

use std::sync::Arc;

use crate::caches::Caches;
use crate::config::DbSetting;
use crate::driver::{self, Connection};
use crate::executor::Execution;
use crate::result_cache::ResultCache;
use crate::schema::SchemaField;
use crate::statement::{OperationKind, StatementBuilder};
use crate::trace::Trace;

use super::error::DbError;
use super::options::OperationOptions;

/// A connection wired with settings, a statement builder, caches and the
/// optional trace hook and result cache.
///
/// Operations take `&mut self`: a session, like its connection, serves one
/// operation at a time.
///
/// # Transaction Ownership
///
/// A transaction started via [`begin()`](Self::begin) is the caller's: every
/// operation joins it and none commits or rolls it back. The caller closes
/// it with [`commit()`](Self::commit) or [`rollback()`](Self::rollback).
/// Without one, batch operations run in a transaction of their own that is
/// committed when they succeed and rolled back when they fail.
pub struct Session<C: Connection> {
    pub(crate) conn: C,
    pub(crate) setting: Arc<DbSetting>,
    pub(crate) builder: Arc<dyn StatementBuilder>,
    pub(crate) caches: Arc<Caches>,
    pub(crate) trace: Option<Arc<dyn Trace>>,
    pub(crate) result_cache: Option<Arc<dyn ResultCache>>,
    pub(crate) transaction: bool,
}

impl<C: Connection> Session<C> {
    /// Creates a session with default settings, the ANSI statement builder
    /// and the process-wide caches.
    pub fn new(conn: C) -> Self {
        super::SessionBuilder::new().build(conn)
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// The underlying connection, mutably.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Consumes the session and returns the connection.
    pub fn into_connection(self) -> C {
        self.conn
    }

    /// Session settings.
    pub fn setting(&self) -> &DbSetting {
        &self.setting
    }

    /// Caches this session uses.
    pub fn caches(&self) -> &Arc<Caches> {
        &self.caches
    }

    /// Returns true while a transaction begun through this session is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction
    }

    /// Begins an explicit transaction.
    ///
    /// If already in a transaction, this is a no-op.
    pub async fn begin(&mut self) -> Result<(), DbError> {
        if !self.transaction {
            driver::ensure_open(&mut self.conn).await?;
            self.conn.begin().await?;
            self.transaction = true;
            tracing::debug!(target_id = self.conn.target(), "began transaction");
        }
        Ok(())
    }

    /// Commits the current transaction.
    ///
    /// If not in a transaction, this is a no-op.
    pub async fn commit(&mut self) -> Result<(), DbError> {
        if self.transaction {
            self.transaction = false;
            self.conn.commit().await?;
            tracing::debug!(target_id = self.conn.target(), "committed transaction");
        }
        Ok(())
    }

    /// Rolls back the current transaction.
    ///
    /// If not in a transaction, this is a no-op.
    pub async fn rollback(&mut self) -> Result<(), DbError> {
        if self.transaction {
            self.transaction = false;
            self.conn.rollback().await?;
            tracing::debug!(target_id = self.conn.target(), "rolled back transaction");
        }
        Ok(())
    }

    /// Returns the schema fields of `table`, reading them from the database
    /// unless cached. `force_refresh` re-reads and replaces the cached set,
    /// and drops the statements and contexts built for the table.
    pub async fn schema(
        &mut self,
        table: &str,
        force_refresh: bool,
    ) -> Result<Arc<[SchemaField]>, DbError> {
        let fields = if force_refresh {
            self.caches.refresh_schema(&mut self.conn, table).await
        } else {
            self.caches.schema().get(&mut self.conn, table, false).await
        };
        fields.map_err(|e| DbError::schema(OperationKind::Query, table, e))
    }

    /// Splits the session into its connection and the execution
    /// environment for one call.
    pub(crate) fn split<'a>(
        &'a mut self,
        kind: OperationKind,
        table: &'a str,
        options: &'a OperationOptions,
    ) -> (&'a mut C, Execution<'a>) {
        let Self {
            conn,
            setting,
            builder,
            caches,
            trace,
            ..
        } = self;
        let setting: &DbSetting = setting;
        let exec = Execution {
            kind,
            table,
            caches: &**caches,
            builder: &**builder,
            setting,
            timeout: options.timeout.or_else(|| setting.command_timeout()),
            trace: trace.as_deref(),
            trace_key: options.trace_key.as_deref(),
            cancellation: options.cancellation.as_ref(),
        };
        (conn, exec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Type;
    use crate::driver::MemoryConnection;

    fn session() -> Session<MemoryConnection> {
        let conn = MemoryConnection::new("memory://session").with_table(
            "people",
            vec![SchemaField::new("Id", 0, Type::Int8).primary().identity()],
        );
        super::super::SessionBuilder::new()
            .caches(Arc::new(Caches::new()))
            .build(conn)
    }

    #[tokio::test]
    async fn test_session_transaction_lifecycle() {
        let mut session = session();
        let log = session.connection().log();
        assert!(!session.in_transaction());

        session.begin().await.unwrap();
        session.begin().await.unwrap();
        assert!(session.in_transaction());
        assert!(session.connection().in_transaction());

        session.commit().await.unwrap();
        assert!(!session.in_transaction());
        session.commit().await.unwrap();
        assert_eq!((log.begins(), log.commits()), (1, 1));
    }

    #[tokio::test]
    async fn test_session_rollback() {
        let mut session = session();
        let log = session.connection().log();

        session.begin().await.unwrap();
        session.rollback().await.unwrap();
        assert!(!session.in_transaction());
        assert!(!session.connection().in_transaction());
        assert_eq!(log.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_schema_lookup_and_refresh() {
        let mut session = session();
        let log = session.connection().log();

        let fields = session.schema("people", false).await.unwrap();
        assert_eq!(fields.len(), 1);
        session.schema("PEOPLE", false).await.unwrap();
        assert_eq!(log.describe_calls(), 1);
        session.schema("people", true).await.unwrap();
        assert_eq!(log.describe_calls(), 2);

        let err = session.schema("ghost", false).await.unwrap_err();
        assert!(matches!(err, DbError::SchemaNotFound { .. }));
    }
}
