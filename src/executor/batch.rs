//! Batched execution of entity-driven writes.

use std::sync::Arc;

use crate::config::DbSetting;
use crate::context::{self, ContextRequest, ExecutionContext, KeySetter};
use crate::datum::Value;
use crate::db::DbError;
use crate::driver::{Command, Connection, RowStream};
use crate::entity::Entity;
use crate::statement::ORDER_COLUMN;

use super::Execution;
use super::single::{execute_non_query, execute_reader, execute_scalar};
use super::transaction::TransactionGuard;

/// Rows bound per command for a batch of `count` entities.
///
/// This is the requested size (or the configured default), capped so that
/// one command never binds more than `max_parameters`, and never larger
/// than the batch itself. Drivers that cannot run several statements in one
/// command always get 1.
pub fn effective_batch_size(
    setting: &DbSetting,
    requested: Option<usize>,
    params_per_row: usize,
    count: usize,
) -> usize {
    if !setting.multi_statement_executable {
        return 1;
    }
    let requested = requested
        .filter(|&n| n > 0)
        .unwrap_or(setting.default_batch_size);
    let by_limit = setting
        .max_parameters
        .checked_div(params_per_row)
        .unwrap_or(usize::MAX);
    requested.min(by_limit).min(count).max(1)
}

/// Executes `request.kind` for every entity, in chunks.
///
/// `request.batch_size` is ignored; `requested` is the caller's batch size.
/// Returns the number of affected rows, or for identity-returning
/// statements the number of non-NULL keys written onto entities, whatever
/// the chunk shape.
///
/// Runs inside the caller's or the connection's transaction when there is
/// one (`supplied` tells the caller began it), otherwise inside an owned
/// transaction that is committed once every chunk has run and rolled back
/// on the first error. When the trace hook cancels a chunk, the chunks
/// already executed are kept and their count is returned.
pub async fn execute_batch<C, E>(
    conn: &mut C,
    exec: &Execution<'_>,
    request: &ContextRequest<'_>,
    requested: Option<usize>,
    entities: &mut [E],
    supplied: bool,
) -> Result<u64, DbError>
where
    C: Connection,
    E: Entity,
{
    let Some(first) = entities.first() else {
        return Ok(0);
    };
    exec.check()?;

    let single = create(conn, exec, first, request, 1).await?;
    let per_row = single.binder.params_per_row();
    let limit = exec.setting.max_parameters;
    if per_row > limit {
        return Err(DbError::ParameterLimitExceeded {
            kind: exec.kind,
            table: exec.table.to_string(),
            per_row,
            limit,
        });
    }
    let size = effective_batch_size(exec.setting, requested, per_row, entities.len());
    tracing::debug!(
        kind = %exec.kind,
        table = exec.table,
        rows = entities.len(),
        batch_size = size,
        params_per_row = per_row,
        "executing batch"
    );

    let guard = TransactionGuard::acquire(conn, supplied).await?;
    let result = run_chunks(conn, exec, request, entities, size, single).await;
    guard.finish(conn, result).await
}

async fn create<C, E>(
    conn: &mut C,
    exec: &Execution<'_>,
    entity: &E,
    request: &ContextRequest<'_>,
    batch_size: usize,
) -> Result<Arc<ExecutionContext>, DbError>
where
    C: Connection,
    E: Entity,
{
    let request = ContextRequest {
        batch_size,
        ..*request
    };
    context::create(conn, exec.caches, exec.builder, entity, &request)
        .await
        .map_err(|e| DbError::context(exec.kind, exec.table, e))
}

async fn run_chunks<C, E>(
    conn: &mut C,
    exec: &Execution<'_>,
    request: &ContextRequest<'_>,
    entities: &mut [E],
    size: usize,
    mut context: Arc<ExecutionContext>,
) -> Result<u64, DbError>
where
    C: Connection,
    E: Entity,
{
    let mut total = 0u64;
    for (index, chunk) in entities.chunks_mut(size).enumerate() {
        exec.check()?;
        if context.batch_size != chunk.len() {
            context = create(conn, exec, &chunk[0], request, chunk.len()).await?;
        }

        let mut command = exec.command(&context.command_text);
        if chunk.len() == 1 {
            context.binder.bind(&mut command.parameters, &chunk[0]);
        } else {
            context.binder.bind_many(&mut command.parameters, chunk);
        }
        tracing::trace!(
            kind = %exec.kind,
            table = exec.table,
            chunk = index,
            rows = chunk.len(),
            parameters = command.parameters.len(),
            "executing chunk"
        );

        let affected = match &context.key_setter {
            Some(setter) if chunk.len() == 1 => {
                read_key(conn, exec, &command, setter, &mut chunk[0]).await?
            }
            Some(setter) => read_keys(conn, exec, &command, setter, chunk).await?,
            None => execute_non_query(conn, exec, &command).await?,
        };
        let Some(affected) = affected else {
            tracing::debug!(
                kind = %exec.kind,
                table = exec.table,
                chunk = index,
                affected = total,
                "batch stopped by trace"
            );
            break;
        };
        total += affected;
    }
    Ok(total)
}

/// Single-row statement: the key comes back as a scalar.
async fn read_key<C, E>(
    conn: &mut C,
    exec: &Execution<'_>,
    command: &Command,
    setter: &KeySetter,
    entity: &mut E,
) -> Result<Option<u64>, DbError>
where
    C: Connection,
    E: Entity,
{
    let Some(key) = execute_scalar::<_, Value>(conn, exec, command).await? else {
        return Ok(None);
    };
    let assigned = setter
        .apply(entity, key)
        .map_err(|e| DbError::conversion(exec.kind, exec.table, e))?;
    Ok(Some(u64::from(assigned)))
}

/// Multi-row statement: one key row per statement, correlated with the
/// chunk by the trailing order column when present and by position
/// otherwise. Like [`read_key`], only non-NULL keys written onto an entity
/// are counted.
async fn read_keys<C, E>(
    conn: &mut C,
    exec: &Execution<'_>,
    command: &Command,
    setter: &KeySetter,
    chunk: &mut [E],
) -> Result<Option<u64>, DbError>
where
    C: Connection,
    E: Entity,
{
    let Some(mut rows) = execute_reader(conn, exec, command).await? else {
        return Ok(None);
    };

    let mut position = 0usize;
    let mut count = 0u64;
    loop {
        let ordered = rows
            .columns()
            .last()
            .is_some_and(|c| c.name.eq_ignore_ascii_case(ORDER_COLUMN));
        loop {
            exec.check()?;
            let Some(row) = exec.guard(rows.next_row()).await? else {
                break;
            };
            let index = if ordered {
                row.values
                    .last()
                    .and_then(Value::as_i64)
                    .and_then(|i| usize::try_from(i).ok())
            } else {
                Some(position)
            };
            position += 1;

            let key = row.values.into_iter().next().unwrap_or(Value::Null);
            match index.and_then(|i| chunk.get_mut(i)) {
                Some(entity) => {
                    let assigned = setter
                        .apply(entity, key)
                        .map_err(|e| DbError::conversion(exec.kind, exec.table, e))?;
                    count += u64::from(assigned);
                }
                None => tracing::warn!(
                    kind = %exec.kind,
                    table = exec.table,
                    index,
                    "returned key has no matching entity"
                ),
            }
        }
        if !exec.guard(rows.next_result()).await? {
            break;
        }
    }
    Ok(Some(count))
}
