//! The single-command execution path.
//!
//! Each function opens the connection if needed, consults the trace hook,
//! executes under the [`Execution`]'s timeout and cancellation token and
//! reports the outcome back to the hook. `Ok(None)` means the hook
//! cancelled the command; nothing was sent to the driver.

use std::time::Instant;

use crate::datum::FromValue;
use crate::db::DbError;
use crate::driver::{self, Command, Connection};
use crate::trace::TraceAction;

use super::Execution;

async fn prepare<C: Connection>(
    conn: &mut C,
    exec: &Execution<'_>,
    command: &Command,
) -> Result<bool, DbError> {
    exec.check()?;
    exec.guard(driver::ensure_open(conn)).await?;
    Ok(exec.before(command) == TraceAction::Continue)
}

/// Executes `command` and returns the number of affected rows.
pub async fn execute_non_query<C: Connection>(
    conn: &mut C,
    exec: &Execution<'_>,
    command: &Command,
) -> Result<Option<u64>, DbError> {
    if !prepare(conn, exec, command).await? {
        return Ok(None);
    }
    let started = Instant::now();
    let result = exec.guard(conn.execute(command)).await;
    exec.after(
        command,
        started,
        result.as_ref().ok().copied(),
        result.as_ref().err(),
    );
    result.map(Some)
}

/// Executes `command` and converts the first column of the first row.
///
/// NULL (or no row at all) converts through [`FromValue`], so asking for
/// `Option<T>` yields `None` rather than an error.
pub async fn execute_scalar<C, T>(
    conn: &mut C,
    exec: &Execution<'_>,
    command: &Command,
) -> Result<Option<T>, DbError>
where
    C: Connection,
    T: FromValue,
{
    if !prepare(conn, exec, command).await? {
        return Ok(None);
    }
    let started = Instant::now();
    let result = exec.guard(conn.execute_scalar(command)).await;
    exec.after(
        command,
        started,
        result.as_ref().ok().map(|v| u64::from(!v.is_null())),
        result.as_ref().err(),
    );
    let value = result?;
    T::from_value(value)
        .map(Some)
        .map_err(|e| DbError::conversion(exec.kind, exec.table, e))
}

/// Executes `command` and returns its row stream.
pub async fn execute_reader<C: Connection>(
    conn: &mut C,
    exec: &Execution<'_>,
    command: &Command,
) -> Result<Option<C::Rows>, DbError> {
    if !prepare(conn, exec, command).await? {
        return Ok(None);
    }
    let started = Instant::now();
    let result = exec.guard(conn.query(command)).await;
    exec.after(command, started, None, result.as_ref().err());
    result.map(Some)
}
