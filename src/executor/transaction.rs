//! Transaction coordination for multi-command operations.

use crate::db::DbError;
use crate::driver::{self, Connection, DriverError};

/// Where the transaction an operation runs in comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionScope {
    /// Begun explicitly by the caller through the session.
    Supplied,
    /// Already active on the connection when the operation started.
    Ambient,
    /// Begun by the operation itself; committed when it succeeds and
    /// rolled back when it fails.
    Owned,
}

/// The transaction an operation runs in.
///
/// Only an [`Owned`](TransactionScope::Owned) transaction is ever committed
/// or rolled back here; supplied and ambient transactions are left to
/// whoever began them.
#[derive(Debug)]
#[must_use = "an owned transaction stays open until finished"]
pub struct TransactionGuard {
    scope: TransactionScope,
}

impl TransactionGuard {
    /// Joins the caller's or the connection's transaction, or begins one.
    pub async fn acquire<C: Connection>(
        conn: &mut C,
        supplied: bool,
    ) -> Result<Self, DriverError> {
        let scope = if supplied {
            TransactionScope::Supplied
        } else if conn.in_transaction() {
            TransactionScope::Ambient
        } else {
            driver::ensure_open(conn).await?;
            conn.begin().await?;
            tracing::debug!(target_id = conn.target(), "began owned transaction");
            TransactionScope::Owned
        };
        Ok(Self { scope })
    }

    /// The transaction's origin.
    pub fn scope(&self) -> TransactionScope {
        self.scope
    }

    /// Commits an owned transaction.
    pub async fn commit<C: Connection>(self, conn: &mut C) -> Result<(), DriverError> {
        if self.scope == TransactionScope::Owned {
            conn.commit().await?;
            tracing::debug!(target_id = conn.target(), "committed owned transaction");
        }
        Ok(())
    }

    /// Rolls back an owned transaction. A failing rollback is logged, not
    /// returned, so the error that caused it is what the caller sees.
    pub async fn rollback<C: Connection>(self, conn: &mut C) {
        if self.scope != TransactionScope::Owned {
            return;
        }
        match conn.rollback().await {
            Ok(()) => tracing::debug!(target_id = conn.target(), "rolled back owned transaction"),
            Err(e) => tracing::warn!(
                target_id = conn.target(),
                error = %e,
                "failed to roll back owned transaction"
            ),
        }
    }

    /// Commits on success and rolls back on failure.
    pub async fn finish<C: Connection, T>(
        self,
        conn: &mut C,
        result: Result<T, DbError>,
    ) -> Result<T, DbError> {
        match result {
            Ok(value) => {
                self.commit(conn).await?;
                Ok(value)
            }
            Err(e) => {
                self.rollback(conn).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryConnection;

    #[tokio::test]
    async fn test_owned_transaction_commits_on_success() {
        let mut conn = MemoryConnection::new("memory://tx");
        let log = conn.log();

        let guard = TransactionGuard::acquire(&mut conn, false).await.unwrap();
        assert_eq!(guard.scope(), TransactionScope::Owned);
        assert!(conn.in_transaction());
        let value = guard.finish(&mut conn, Ok::<_, DbError>(7)).await.unwrap();
        assert_eq!(value, 7);
        assert!(!conn.in_transaction());
        assert_eq!((log.begins(), log.commits(), log.rollbacks()), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_owned_transaction_rolls_back_on_error() {
        let mut conn = MemoryConnection::new("memory://tx");
        let log = conn.log();

        let guard = TransactionGuard::acquire(&mut conn, false).await.unwrap();
        let err = guard
            .finish::<_, ()>(&mut conn, Err(DbError::Driver(DriverError::other("boom"))))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!((log.commits(), log.rollbacks()), (0, 1));
    }

    #[tokio::test]
    async fn test_ambient_and_supplied_are_left_alone() {
        let mut conn = MemoryConnection::new("memory://tx");
        let log = conn.log();
        conn.open().await.unwrap();
        conn.begin().await.unwrap();

        let ambient = TransactionGuard::acquire(&mut conn, false).await.unwrap();
        assert_eq!(ambient.scope(), TransactionScope::Ambient);
        ambient.finish(&mut conn, Ok::<_, DbError>(())).await.unwrap();

        let supplied = TransactionGuard::acquire(&mut conn, true).await.unwrap();
        assert_eq!(supplied.scope(), TransactionScope::Supplied);
        supplied
            .finish::<_, ()>(&mut conn, Err(DbError::Driver(DriverError::other("x"))))
            .await
            .unwrap_err();

        assert!(conn.in_transaction());
        assert_eq!((log.begins(), log.commits(), log.rollbacks()), (1, 0, 0));
    }
}
