//! Deletes and truncation.

use crate::datum::Value;
use crate::db::{DbError, OperationOptions, Session};
use crate::driver::Connection;
use crate::entity::Entity;
use crate::executor::{Execution, TransactionGuard, execute_non_query};
use crate::filter::{Comparison, FilterError, FilterNode, IntoFilter, QueryField};
use crate::schema;
use crate::statement::{OperationKind, OperationRequest};

use super::{normalize_filter, prepare, schema_fields};

impl<C: Connection> Session<C> {
    /// Deletes the rows matching `filter` and returns how many were deleted.
    pub async fn delete<F: IntoFilter>(
        &mut self,
        table: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        let kind = OperationKind::Delete;
        let filter = normalize_filter(kind, table, filter)?;
        self.execute_request(kind, table, filter, options).await
    }

    /// Deletes every row.
    pub async fn delete_all(
        &mut self,
        table: &str,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.execute_request(OperationKind::DeleteAll, table, None, options)
            .await
    }

    /// Deletes the rows of the given entities, matched on the qualifiers in
    /// `options` (the primary key when none are given).
    ///
    /// Keys are sent in chunks small enough for the parameter limit, inside
    /// one transaction. An empty slice returns 0 without touching the
    /// connection.
    pub async fn delete_all_entities<E: Entity>(
        &mut self,
        table: &str,
        entities: &[E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        if entities.is_empty() {
            return Ok(0);
        }
        let kind = OperationKind::DeleteAll;
        let supplied = self.transaction;
        let (conn, exec) = self.split(kind, table, options);
        exec.check()?;

        let fields = schema_fields(conn, &exec).await?;
        let keys = schema::resolve_qualifiers(&options.qualifiers, &fields)
            .ok_or_else(|| DbError::PrimaryKeyRequired {
                kind,
                table: table.to_string(),
            })?;
        let mut resolved = Vec::with_capacity(keys.len());
        for key in &keys {
            let column = schema::find(&fields, key).ok_or_else(|| DbError::UnqualifiedField {
                kind,
                table: table.to_string(),
                field: key.clone(),
            })?;
            if entities[0].field_index(&column.name).is_none() {
                return Err(DbError::UnresolvedEntityShape {
                    kind,
                    table: table.to_string(),
                    entity: entities[0].type_tag().to_string(),
                    reason: format!("key \"{}\" is not a member of the entity", column.name),
                });
            }
            resolved.push(column.name.clone());
        }

        let chunk_size = (exec.setting.max_parameters / resolved.len()).max(1);
        tracing::debug!(
            kind = %kind,
            table,
            rows = entities.len(),
            chunk_size,
            keys = ?resolved,
            "deleting by keys"
        );

        let guard = TransactionGuard::acquire(conn, supplied).await?;
        let result = delete_chunks(conn, &exec, &resolved, entities, chunk_size).await;
        guard.finish(conn, result).await
    }

    /// Removes every row with `TRUNCATE`. Returns the driver's affected-row
    /// count, which many engines report as 0.
    pub async fn truncate(
        &mut self,
        table: &str,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.execute_request(OperationKind::Truncate, table, None, options)
            .await
    }

    async fn execute_request(
        &mut self,
        kind: OperationKind,
        table: &str,
        filter: Option<FilterNode>,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        let request = OperationRequest::new(kind, table)
            .filter(filter)
            .hints(options.hints.clone());
        let (conn, exec) = self.split(kind, table, options);
        let command = prepare(conn, &exec, &request).await?;
        Ok(execute_non_query(conn, &exec, &command)
            .await?
            .unwrap_or_default())
    }
}

async fn delete_chunks<C: Connection, E: Entity>(
    conn: &mut C,
    exec: &Execution<'_>,
    keys: &[String],
    entities: &[E],
    chunk_size: usize,
) -> Result<u64, DbError> {
    let mut total = 0u64;
    for chunk in entities.chunks(chunk_size) {
        let filter =
            key_filter(keys, chunk).map_err(|e| DbError::filter(exec.kind, exec.table, e))?;
        let request = OperationRequest::new(exec.kind, exec.table).filter(Some(filter));
        let command = prepare(conn, exec, &request).await?;
        let Some(affected) = execute_non_query(conn, exec, &command).await? else {
            tracing::debug!(
                kind = %exec.kind,
                table = exec.table,
                affected = total,
                "delete stopped by trace"
            );
            break;
        };
        total += affected;
    }
    Ok(total)
}

/// `key IN (..)` for a single key; `(k1 = .. AND k2 = ..) OR ..` for
/// composite keys.
fn key_filter<E: Entity>(keys: &[String], chunk: &[E]) -> Result<FilterNode, FilterError> {
    let value = |entity: &E, key: &str| entity.get_by_name(key).unwrap_or(Value::Null);
    if let [key] = keys {
        let values: Vec<Value> = chunk.iter().map(|e| value(e, key.as_str())).collect();
        let comparison = QueryField::any_of(key.as_str(), values).into_comparison()?;
        return Ok(FilterNode::Comparison(comparison));
    }
    let rows = chunk
        .iter()
        .map(|entity| -> Result<FilterNode, FilterError> {
            let terms = keys
                .iter()
                .map(|key| {
                    Comparison::equal(key.as_str(), value(entity, key.as_str()))
                        .map(FilterNode::Comparison)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FilterNode::and(terms))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FilterNode::or(rows))
}
