//! Execution interception.
//!
//! A [`Trace`] sees every command right before and right after it is sent to
//! the driver. Returning [`TraceAction::Cancel`] from
//! [`before_execution`](Trace::before_execution) skips the command: single
//! operations return their default result and batch operations return the
//! rows affected so far. This is not an error.
//!
//! [`TracingTrace`] logs both events through `tracing`.

use std::time::Duration;

use crate::driver::Command;
use crate::statement::OperationKind;

/// Whether to go ahead with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceAction {
    /// Execute the command.
    #[default]
    Continue,
    /// Skip the command and stop the operation quietly.
    Cancel,
}

/// A command about to be executed.
#[derive(Debug, Clone, Copy)]
pub struct TraceEvent<'a> {
    /// Caller-supplied trace key, or the operation name.
    pub key: &'a str,
    /// Operation kind.
    pub kind: OperationKind,
    /// Target table.
    pub table: &'a str,
    /// The command.
    pub command: &'a Command,
}

/// What happened to an executed command.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceOutcome {
    /// Time spent in the driver.
    pub elapsed: Duration,
    /// Affected or returned rows, when known.
    pub rows: Option<u64>,
    /// Driver error message, if the command failed.
    pub error: Option<String>,
}

/// Before/after execution hook.
pub trait Trace: Send + Sync {
    /// Called before each command.
    fn before_execution(&self, event: &TraceEvent<'_>) -> TraceAction;

    /// Called after each executed command.
    fn after_execution(&self, event: &TraceEvent<'_>, outcome: &TraceOutcome);
}

/// Logs commands with `tracing`. Never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTrace;

impl Trace for TracingTrace {
    fn before_execution(&self, event: &TraceEvent<'_>) -> TraceAction {
        tracing::debug!(
            key = event.key,
            kind = %event.kind,
            table = event.table,
            text = %event.command.text,
            parameters = event.command.parameters.len(),
            "executing command"
        );
        TraceAction::Continue
    }

    fn after_execution(&self, event: &TraceEvent<'_>, outcome: &TraceOutcome) {
        match &outcome.error {
            Some(error) => tracing::warn!(
                key = event.key,
                kind = %event.kind,
                table = event.table,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                error = %error,
                "command failed"
            ),
            None => tracing::debug!(
                key = event.key,
                kind = %event.kind,
                table = event.table,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                rows = outcome.rows,
                "command finished"
            ),
        }
    }
}
