//! Session operations, one file per family.
//!
//! Every operation follows the same path: normalize the filter, resolve the
//! table's schema fields, fetch the statement text (or the execution
//! context for entity-driven writes), bind and execute. Filtered reads and
//! aggregates run a single command; entity batches go through
//! [`execute_batch`](crate::executor::execute_batch).

mod aggregate;
mod delete;
mod query;
mod write;

use std::sync::Arc;

use crate::context::ContextRequest;
use crate::db::DbError;
use crate::driver::{Command, Connection};
use crate::executor::Execution;
use crate::filter::{FilterNode, IntoFilter, filter_parameters, normalize};
use crate::schema::SchemaField;
use crate::statement::{OperationKind, OperationRequest};

use super::options::OperationOptions;

/// Normalizes a filter argument, attaching the operation to any error.
fn normalize_filter<F: IntoFilter>(
    kind: OperationKind,
    table: &str,
    filter: F,
) -> Result<Option<FilterNode>, DbError> {
    normalize(filter).map_err(|e| DbError::filter(kind, table, e))
}

/// Schema fields of the execution's table.
async fn schema_fields<C: Connection>(
    conn: &mut C,
    exec: &Execution<'_>,
) -> Result<Arc<[SchemaField]>, DbError> {
    exec.caches
        .schema()
        .get(conn, exec.table, false)
        .await
        .map_err(|e| DbError::schema(exec.kind, exec.table, e))
}

/// Renders `request` into a command with its filter values bound.
async fn prepare<C: Connection>(
    conn: &mut C,
    exec: &Execution<'_>,
    request: &OperationRequest,
) -> Result<Command, DbError> {
    exec.check()?;
    let fields = schema_fields(conn, exec).await?;
    let text = exec
        .caches
        .statements()
        .get_text(exec.builder, conn.target(), request, &fields)
        .map_err(|e| DbError::statement(exec.kind, exec.table, e))?;
    let mut command = exec.command(&text);
    if let Some(filter) = &request.filter {
        for (name, value) in filter_parameters(filter) {
            command.parameters.add(name, value);
        }
    }
    Ok(command)
}

/// Context request for an entity-driven write.
fn context_request<'a>(
    kind: OperationKind,
    table: &'a str,
    options: &'a OperationOptions,
) -> ContextRequest<'a> {
    ContextRequest {
        kind,
        table,
        batch_size: 1,
        fields: options.fields.as_deref(),
        qualifiers: &options.qualifiers,
        hints: options.hints.as_deref(),
    }
}
