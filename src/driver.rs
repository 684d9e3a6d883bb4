//! Driver contract consumed by the core.
//!
//! The core never talks to a database engine directly. It depends on the
//! narrow [`Connection`] contract below: open, transaction control, schema
//! introspection, and three execution shapes (non-query, scalar, rows).
//! Wire protocols, pooling and dialect-specific type mapping live behind it.
//!
//! [`MemoryConnection`] is a scripted implementation that answers commands
//! through a caller-supplied handler and records everything it sees.

mod command;
mod error;
pub mod memory;
mod rows;

pub use command::{Command, CommandKind, Parameter, Parameters};
pub use error::{DriverError, DriverErrorKind};
pub use memory::{ConnectionLog, MemoryConnection, Response};
pub use rows::{ColumnDesc, ResultSet, Row, RowStream};

use std::future::Future;

use crate::datum::Value;
use crate::schema::SchemaField;

/// A single database connection.
///
/// A connection is never used by more than one in-flight operation at a
/// time; the core holds `&mut` for the duration of each call.
///
/// # Transactions
///
/// Transaction state lives on the connection. [`in_transaction`](Self::in_transaction)
/// reports a transaction begun by anyone, which is how the core detects an
/// ambient transaction it must join rather than own.
pub trait Connection: Send {
    /// Forward-only row stream returned by [`query`](Self::query).
    type Rows: RowStream;

    /// Identity of the connection target (e.g. a normalized connection
    /// string). Schema metadata is cached per target.
    fn target(&self) -> &str;

    /// Returns true once the connection is open.
    fn is_open(&self) -> bool;

    /// Opens the connection.
    fn open(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Returns true while a transaction is active on this connection.
    fn in_transaction(&self) -> bool;

    /// Begins a transaction.
    fn begin(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Commits the active transaction.
    fn commit(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Rolls back the active transaction.
    fn rollback(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Describes the columns of `table`.
    ///
    /// An empty result means the table does not exist or is not visible.
    fn describe_table(
        &mut self,
        table: &str,
    ) -> impl Future<Output = Result<Vec<SchemaField>, DriverError>> + Send;

    /// Executes a command and returns the number of affected rows.
    fn execute(
        &mut self,
        command: &Command,
    ) -> impl Future<Output = Result<u64, DriverError>> + Send;

    /// Executes a command and returns the first column of the first row,
    /// or [`Value::Null`] when no row is produced.
    fn execute_scalar(
        &mut self,
        command: &Command,
    ) -> impl Future<Output = Result<Value, DriverError>> + Send;

    /// Executes a command and returns its result sets as a row stream.
    fn query(
        &mut self,
        command: &Command,
    ) -> impl Future<Output = Result<Self::Rows, DriverError>> + Send;
}

/// Opens `conn` unless it is already open.
pub async fn ensure_open<C: Connection>(conn: &mut C) -> Result<(), DriverError> {
    if !conn.is_open() {
        conn.open().await?;
    }
    Ok(())
}
