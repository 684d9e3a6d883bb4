//! Scripted in-memory driver.
//!
//! [`MemoryConnection`] serves schema introspection from registered table
//! definitions and routes every command to a handler closure that decides
//! the [`Response`]. Everything the connection sees is recorded in a shared
//! [`ConnectionLog`], including write visibility: rows reported by write
//! commands stay pending inside a transaction and only become committed on
//! commit.
//!
//! ```ignore
//! let conn = MemoryConnection::new("memory://test")
//!     .with_table("people", people_fields())
//!     .with_handler(|command| Ok(Response::Affected(1)));
//! let log = conn.log();
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::datum::Value;
use crate::schema::SchemaField;

use super::command::Command;
use super::error::DriverError;
use super::rows::{ColumnDesc, ResultSet, Row, RowStream};
use super::Connection;

/// What the handler answers for a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// A non-query result with an affected-row count.
    Affected(u64),
    /// A single value.
    Scalar(Value),
    /// One or more result sets.
    Rows(Vec<ResultSet>),
}

impl Response {
    /// Number of rows this response reports for write accounting.
    fn row_count(&self) -> u64 {
        match self {
            Response::Affected(n) => *n,
            Response::Scalar(v) => u64::from(!v.is_null()),
            Response::Rows(sets) => sets.iter().map(|s| s.rows.len() as u64).sum(),
        }
    }
}

type Handler = Box<dyn FnMut(&Command) -> Result<Response, DriverError> + Send>;

#[derive(Debug, Default)]
struct LogState {
    commands: Vec<Command>,
    describe_calls: usize,
    opens: usize,
    begins: usize,
    commits: usize,
    rollbacks: usize,
    committed_rows: u64,
    pending_rows: u64,
}

/// Shared record of everything a [`MemoryConnection`] has seen.
///
/// Cloning is cheap; all clones observe the same log.
#[derive(Debug, Clone, Default)]
pub struct ConnectionLog {
    state: Arc<Mutex<LogState>>,
}

impl ConnectionLog {
    /// Commands executed so far, in order.
    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().commands.clone()
    }

    /// Number of commands executed.
    pub fn command_count(&self) -> usize {
        self.state.lock().commands.len()
    }

    /// Number of schema introspection calls.
    pub fn describe_calls(&self) -> usize {
        self.state.lock().describe_calls
    }

    /// Number of times the connection was opened.
    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    /// Number of transactions begun.
    pub fn begins(&self) -> usize {
        self.state.lock().begins
    }

    /// Number of commits.
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    /// Number of rollbacks.
    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }

    /// Rows written by write commands that are visible (committed or
    /// executed outside a transaction).
    pub fn committed_rows(&self) -> u64 {
        self.state.lock().committed_rows
    }

    /// Rows written inside the active transaction.
    pub fn pending_rows(&self) -> u64 {
        self.state.lock().pending_rows
    }

    /// Forgets recorded commands and counters.
    pub fn reset(&self) {
        *self.state.lock() = LogState::default();
    }
}

/// A scripted connection; see the [module docs](self).
pub struct MemoryConnection {
    target: String,
    open: bool,
    in_transaction: bool,
    tables: HashMap<String, Vec<SchemaField>>,
    handler: Option<Handler>,
    delay: Option<Duration>,
    log: ConnectionLog,
}

impl MemoryConnection {
    /// Creates a closed connection to `target` with no tables.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            open: false,
            in_transaction: false,
            tables: HashMap::new(),
            handler: None,
            delay: None,
            log: ConnectionLog::default(),
        }
    }

    /// Registers a table definition for introspection.
    pub fn with_table(mut self, name: &str, fields: Vec<SchemaField>) -> Self {
        self.tables.insert(name.to_ascii_lowercase(), fields);
        self
    }

    /// Sets the command handler.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Command) -> Result<Response, DriverError> + Send + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Delays every command by `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle to the shared log.
    pub fn log(&self) -> ConnectionLog {
        self.log.clone()
    }

    async fn dispatch(&mut self, command: &Command) -> Result<Response, DriverError> {
        if !self.open {
            return Err(DriverError::connection("connection is not open"));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.log.state.lock().commands.push(command.clone());
        let response = match self.handler.as_mut() {
            Some(handler) => handler(command)?,
            None => Response::Affected(0),
        };

        if is_write(&command.text) {
            let rows = response.row_count();
            let mut state = self.log.state.lock();
            if self.in_transaction {
                state.pending_rows += rows;
            } else {
                state.committed_rows += rows;
            }
        }
        Ok(response)
    }
}

/// Returns true if the command text starts with a data-modifying keyword.
fn is_write(text: &str) -> bool {
    let head = text
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("");
    ["INSERT", "UPDATE", "DELETE", "MERGE", "TRUNCATE"]
        .iter()
        .any(|kw| head.eq_ignore_ascii_case(kw))
}

impl Connection for MemoryConnection {
    type Rows = MemoryRows;

    fn target(&self) -> &str {
        &self.target
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self) -> Result<(), DriverError> {
        self.open = true;
        self.log.state.lock().opens += 1;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    async fn begin(&mut self) -> Result<(), DriverError> {
        if !self.open {
            return Err(DriverError::connection("connection is not open"));
        }
        if self.in_transaction {
            return Err(DriverError::other("a transaction is already active"));
        }
        self.in_transaction = true;
        self.log.state.lock().begins += 1;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        if !self.in_transaction {
            return Err(DriverError::other("no active transaction"));
        }
        self.in_transaction = false;
        let mut state = self.log.state.lock();
        state.commits += 1;
        state.committed_rows += state.pending_rows;
        state.pending_rows = 0;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        if !self.in_transaction {
            return Err(DriverError::other("no active transaction"));
        }
        self.in_transaction = false;
        let mut state = self.log.state.lock();
        state.rollbacks += 1;
        state.pending_rows = 0;
        Ok(())
    }

    async fn describe_table(&mut self, table: &str) -> Result<Vec<SchemaField>, DriverError> {
        if !self.open {
            return Err(DriverError::connection("connection is not open"));
        }
        self.log.state.lock().describe_calls += 1;
        Ok(self
            .tables
            .get(&table.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn execute(&mut self, command: &Command) -> Result<u64, DriverError> {
        let response = self.dispatch(command).await?;
        Ok(response.row_count())
    }

    async fn execute_scalar(&mut self, command: &Command) -> Result<Value, DriverError> {
        let value = match self.dispatch(command).await? {
            Response::Scalar(value) => value,
            Response::Affected(n) => Value::Int64(n as i64),
            Response::Rows(sets) => sets
                .into_iter()
                .next()
                .and_then(|set| set.rows.into_iter().next())
                .and_then(|row| row.values.into_iter().next())
                .unwrap_or(Value::Null),
        };
        Ok(value)
    }

    async fn query(&mut self, command: &Command) -> Result<MemoryRows, DriverError> {
        let sets = match self.dispatch(command).await? {
            Response::Rows(sets) => sets,
            Response::Scalar(value) => {
                vec![ResultSet::new(["Result"]).with_row(vec![value])]
            }
            Response::Affected(_) => Vec::new(),
        };
        Ok(MemoryRows::new(sets))
    }
}

/// Row stream over materialized result sets.
#[derive(Debug)]
pub struct MemoryRows {
    columns: Vec<ColumnDesc>,
    rows: VecDeque<Row>,
    remaining: VecDeque<ResultSet>,
}

impl MemoryRows {
    /// Creates a stream positioned on the first result set.
    pub fn new(sets: Vec<ResultSet>) -> Self {
        let mut remaining: VecDeque<ResultSet> = sets.into();
        let (columns, rows) = match remaining.pop_front() {
            Some(first) => (first.columns, first.rows.into()),
            None => (Vec::new(), VecDeque::new()),
        };
        Self {
            columns,
            rows,
            remaining,
        }
    }
}

impl RowStream for MemoryRows {
    fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>, DriverError> {
        Ok(self.rows.pop_front())
    }

    async fn next_result(&mut self) -> Result<bool, DriverError> {
        match self.remaining.pop_front() {
            Some(set) => {
                self.columns = set.columns;
                self.rows = set.rows.into();
                Ok(true)
            }
            None => {
                self.columns.clear();
                self.rows.clear();
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Type;

    fn people() -> Vec<SchemaField> {
        vec![
            SchemaField::new("id", 0, Type::Int8).primary().identity(),
            SchemaField::new("name", 1, Type::Text),
        ]
    }

    #[tokio::test]
    async fn test_requires_open() {
        let mut conn = MemoryConnection::new("memory://t");
        let err = conn.execute(&Command::new("SELECT 1")).await.unwrap_err();
        assert_eq!(err.kind(), crate::driver::DriverErrorKind::Connection);
        conn.open().await.unwrap();
        assert_eq!(conn.execute(&Command::new("SELECT 1")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_describe_counts_calls() {
        let mut conn = MemoryConnection::new("memory://t").with_table("People", people());
        let log = conn.log();
        conn.open().await.unwrap();
        assert_eq!(conn.describe_table("people").await.unwrap().len(), 2);
        assert!(conn.describe_table("missing").await.unwrap().is_empty());
        assert_eq!(log.describe_calls(), 2);
    }

    #[tokio::test]
    async fn test_write_visibility_follows_transaction() {
        let mut conn =
            MemoryConnection::new("memory://t").with_handler(|_| Ok(Response::Affected(2)));
        let log = conn.log();
        conn.open().await.unwrap();

        conn.execute(&Command::new("INSERT INTO t VALUES (1)"))
            .await
            .unwrap();
        assert_eq!(log.committed_rows(), 2);

        conn.begin().await.unwrap();
        conn.execute(&Command::new("UPDATE t SET a = 1"))
            .await
            .unwrap();
        assert_eq!(log.pending_rows(), 2);
        conn.rollback().await.unwrap();
        assert_eq!(log.pending_rows(), 0);
        assert_eq!(log.committed_rows(), 2);

        conn.begin().await.unwrap();
        conn.execute(&Command::new("delete from t")).await.unwrap();
        conn.commit().await.unwrap();
        assert_eq!(log.committed_rows(), 4);
        assert_eq!((log.begins(), log.commits(), log.rollbacks()), (2, 1, 1));
    }

    #[tokio::test]
    async fn test_reads_are_not_counted_as_writes() {
        let mut conn =
            MemoryConnection::new("memory://t").with_handler(|_| Ok(Response::Affected(5)));
        let log = conn.log();
        conn.open().await.unwrap();
        conn.execute(&Command::new("SELECT COUNT(*) FROM t"))
            .await
            .unwrap();
        assert_eq!(log.committed_rows(), 0);
        assert_eq!(log.command_count(), 1);
    }

    #[tokio::test]
    async fn test_multi_result_stream() {
        let mut conn = MemoryConnection::new("memory://t").with_handler(|_| {
            Ok(Response::Rows(vec![
                ResultSet::new(["a"]).with_row(vec![Value::Int32(1)]),
                ResultSet::new(["b"])
                    .with_row(vec![Value::Int32(2)])
                    .with_row(vec![Value::Int32(3)]),
            ]))
        });
        conn.open().await.unwrap();
        let mut rows = conn.query(&Command::new("SELECT")).await.unwrap();

        assert_eq!(rows.columns()[0].name, "a");
        assert_eq!(rows.next_row().await.unwrap(), Some(Row::new(vec![Value::Int32(1)])));
        assert_eq!(rows.next_row().await.unwrap(), None);
        assert!(rows.next_result().await.unwrap());
        assert_eq!(rows.columns()[0].name, "b");
        assert_eq!(rows.next_row().await.unwrap().unwrap().values[0], Value::Int32(2));
        assert_eq!(rows.next_row().await.unwrap().unwrap().values[0], Value::Int32(3));
        assert!(!rows.next_result().await.unwrap());
    }

    #[tokio::test]
    async fn test_scalar_shapes() {
        let mut conn = MemoryConnection::new("memory://t")
            .with_handler(|_| Ok(Response::Scalar(Value::Int64(9))));
        conn.open().await.unwrap();
        assert_eq!(
            conn.execute_scalar(&Command::new("SELECT 9")).await.unwrap(),
            Value::Int64(9)
        );
        let mut rows = conn.query(&Command::new("SELECT 9")).await.unwrap();
        assert_eq!(rows.columns()[0].name, "Result");
        assert_eq!(rows.next_row().await.unwrap().unwrap().values, vec![Value::Int64(9)]);
    }
}
