//! Command execution.
//!
//! This module runs what the [`context`](crate::context) and
//! [`statement`](crate::statement) layers produce:
//!
//! ```text
//! Session operation
//!       |
//! [TransactionGuard] -- supplied / ambient / owned
//!       |
//! execute_batch ----------------+
//!   chunk 0..n                  |  single-row path:
//!     bind -> execute           |  execute_non_query / execute_scalar /
//!     read keys -> KeySetter    |  execute_reader
//!       |                       |
//! RecordStream <----------------+  FromRow materialization
//! ```
//!
//! Every driver call goes through [`Execution`], which applies the command
//! timeout, races the call against the caller's cancellation token and
//! invokes the [`Trace`] hook around it.

mod batch;
mod materialize;
mod single;
mod transaction;

pub use batch::{effective_batch_size, execute_batch};
pub use materialize::{FromRow, RecordStream, fill_entity};
pub use single::{execute_non_query, execute_reader, execute_scalar};
pub use transaction::{TransactionGuard, TransactionScope};

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::caches::Caches;
use crate::config::DbSetting;
use crate::db::DbError;
use crate::driver::{Command, DriverError, DriverErrorKind};
use crate::statement::{OperationKind, StatementBuilder};
use crate::trace::{Trace, TraceAction, TraceEvent, TraceOutcome};

/// Everything one operation call executes with.
#[derive(Clone, Copy)]
pub struct Execution<'a> {
    /// Operation kind.
    pub kind: OperationKind,
    /// Target table.
    pub table: &'a str,
    /// Schema, statement and context caches.
    pub caches: &'a Caches,
    /// Dialect builder.
    pub builder: &'a dyn StatementBuilder,
    /// Session settings.
    pub setting: &'a DbSetting,
    /// Command timeout.
    pub timeout: Option<Duration>,
    /// Interception hook.
    pub trace: Option<&'a dyn Trace>,
    /// Key reported to the hook; defaults to the operation name.
    pub trace_key: Option<&'a str>,
    /// Signal cancellation.
    pub cancellation: Option<&'a CancellationToken>,
}

impl<'a> Execution<'a> {
    /// Creates an execution with no timeout, hook or cancellation.
    pub fn new(
        kind: OperationKind,
        table: &'a str,
        caches: &'a Caches,
        builder: &'a dyn StatementBuilder,
        setting: &'a DbSetting,
    ) -> Self {
        Self {
            kind,
            table,
            caches,
            builder,
            setting,
            timeout: None,
            trace: None,
            trace_key: None,
            cancellation: None,
        }
    }

    /// Creates a text command with this execution's timeout.
    pub fn command(&self, text: &str) -> Command {
        Command::new(text).with_timeout(self.timeout)
    }

    pub(crate) fn cancelled(&self) -> DbError {
        DbError::Cancelled {
            kind: self.kind,
            table: self.table.to_string(),
        }
    }

    /// Fails with [`DbError::Cancelled`] once the token has fired.
    pub(crate) fn check(&self) -> Result<(), DbError> {
        match self.cancellation {
            Some(token) if token.is_cancelled() => {
                tracing::debug!(kind = %self.kind, table = self.table, "operation cancelled");
                Err(self.cancelled())
            }
            _ => Ok(()),
        }
    }

    /// Runs a driver call under the timeout and the cancellation token.
    pub(crate) async fn guard<T, F>(&self, call: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, DriverError>>,
    {
        let timed = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(DriverError::new(
                        DriverErrorKind::Timeout,
                        format!("command timed out after {} ms", limit.as_millis()),
                    )),
                },
                None => call.await,
            }
        };
        match self.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(kind = %self.kind, table = self.table, "in-flight command cancelled");
                    Err(self.cancelled())
                }
                result = timed => result.map_err(DbError::from),
            },
            None => timed.await.map_err(DbError::from),
        }
    }

    fn event<'c>(&'c self, command: &'c Command) -> TraceEvent<'c> {
        TraceEvent {
            key: self.trace_key.unwrap_or(self.kind.name()),
            kind: self.kind,
            table: self.table,
            command,
        }
    }

    /// Asks the hook whether to run `command`.
    pub(crate) fn before(&self, command: &Command) -> TraceAction {
        match self.trace {
            Some(trace) => {
                let action = trace.before_execution(&self.event(command));
                if action == TraceAction::Cancel {
                    tracing::debug!(
                        kind = %self.kind,
                        table = self.table,
                        "execution cancelled by trace"
                    );
                }
                action
            }
            None => TraceAction::Continue,
        }
    }

    /// Reports an executed command to the hook.
    pub(crate) fn after(
        &self,
        command: &Command,
        started: Instant,
        rows: Option<u64>,
        error: Option<&DbError>,
    ) {
        if let Some(trace) = self.trace {
            let outcome = TraceOutcome {
                elapsed: started.elapsed(),
                rows,
                error: error.map(ToString::to_string),
            };
            trace.after_execution(&self.event(command), &outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execution<'a>(caches: &'a Caches, builder: &'a dyn StatementBuilder, setting: &'a DbSetting) -> Execution<'a> {
        Execution::new(OperationKind::Query, "people", caches, builder, setting)
    }

    #[tokio::test]
    async fn test_guard_times_out() {
        let caches = Caches::new();
        let setting = DbSetting::default();
        let builder = crate::statement::AnsiStatementBuilder::new(&setting);
        let exec = Execution {
            timeout: Some(Duration::from_millis(10)),
            ..execution(&caches, &builder, &setting)
        };

        let err = exec
            .guard(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, DriverError>(())
            })
            .await
            .unwrap_err();
        match err {
            DbError::Driver(e) => assert_eq!(e.kind(), DriverErrorKind::Timeout),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guard_observes_cancellation() {
        let caches = Caches::new();
        let setting = DbSetting::default();
        let builder = crate::statement::AnsiStatementBuilder::new(&setting);
        let token = CancellationToken::new();
        let exec = Execution {
            cancellation: Some(&token),
            ..execution(&caches, &builder, &setting)
        };

        assert!(exec.check().is_ok());
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let err = exec
            .guard(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, DriverError>(1)
            })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(exec.check().unwrap_err().is_cancelled());
    }
}
