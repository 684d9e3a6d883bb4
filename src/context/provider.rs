//! Execution context compilation.

use std::sync::Arc;

use crate::caches::Caches;
use crate::driver::Connection;
use crate::entity::Entity;
use crate::schema::{self, SchemaError, SchemaField};
use crate::statement::{OperationKind, OperationRequest, StatementBuilder, StatementError};

use super::ExecutionContext;
use super::binder::{Binder, KeySetter};
use super::cache::ContextKey;

/// Errors from compiling an execution context.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContextError {
    /// Schema lookup failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Statement generation failed.
    #[error(transparent)]
    Statement(#[from] StatementError),

    /// The entity's fields cannot be bound to the table's columns.
    #[error("cannot bind {entity}: {reason}")]
    UnresolvedEntityShape {
        /// Entity type tag.
        entity: String,
        /// What did not line up.
        reason: String,
    },
}

/// What to compile a context for.
#[derive(Debug, Clone, Copy)]
pub struct ContextRequest<'a> {
    /// Operation kind.
    pub kind: OperationKind,
    /// Target table.
    pub table: &'a str,
    /// Rows per command.
    pub batch_size: usize,
    /// Columns to write; `None` writes every entity field the table has.
    pub fields: Option<&'a [String]>,
    /// Explicit qualifiers for merge and update.
    pub qualifiers: &'a [String],
    /// Table hints.
    pub hints: Option<&'a str>,
}

impl ContextRequest<'_> {
    fn key<E: Entity + ?Sized>(&self, builder: &str, target: &str, entity: &E) -> ContextKey {
        let lower = |names: &[String]| -> Vec<String> {
            names.iter().map(|n| n.to_ascii_lowercase()).collect()
        };
        ContextKey {
            builder: builder.to_string(),
            target: target.to_string(),
            kind: self.kind,
            table: self.table.to_ascii_lowercase(),
            type_tag: entity.type_tag().to_string(),
            entity_fields: entity
                .fields()
                .iter()
                .map(|f| f.name().to_ascii_lowercase())
                .collect(),
            fields: self.fields.map(lower),
            qualifiers: lower(self.qualifiers),
            hints: self.hints.map(str::to_string),
            batch_size: self.batch_size.max(1),
        }
    }

    fn needs_qualifiers(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::Merge
                | OperationKind::MergeAll
                | OperationKind::Update
                | OperationKind::UpdateAll
        )
    }

    fn returns_key(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::Insert
                | OperationKind::InsertAll
                | OperationKind::Merge
                | OperationKind::MergeAll
        )
    }
}

/// Returns the execution context for `entity`'s shape, compiling and caching
/// it on a miss.
///
/// A cache hit performs no I/O. On a miss the table schema is fetched
/// through the schema cache.
pub async fn create<C, E>(
    conn: &mut C,
    caches: &Caches,
    builder: &dyn StatementBuilder,
    entity: &E,
    request: &ContextRequest<'_>,
) -> Result<Arc<ExecutionContext>, ContextError>
where
    C: Connection,
    E: Entity + ?Sized,
{
    let key = request.key(builder.name(), conn.target(), entity);
    if let Some(context) = caches.contexts().get(&key) {
        return Ok(context);
    }

    let fields = caches.schema().get(conn, request.table, false).await?;
    let context = compile(caches, builder, conn.target(), entity, request, &fields)?;
    Ok(caches.contexts().put(key, context))
}

/// Compiles a context against known schema fields, bypassing the context
/// cache. The statement text still goes through the statement cache.
pub fn compile<E: Entity + ?Sized>(
    caches: &Caches,
    builder: &dyn StatementBuilder,
    target: &str,
    entity: &E,
    request: &ContextRequest<'_>,
    fields: &[SchemaField],
) -> Result<ExecutionContext, ContextError> {
    let shape_error = |reason: String| ContextError::UnresolvedEntityShape {
        entity: entity.type_tag().to_string(),
        reason,
    };
    let batch_size = request.batch_size.max(1);

    let explicit = request.fields.is_some();
    let requested: Vec<String> = match request.fields {
        Some(names) => names.to_vec(),
        None => entity.fields().iter().map(|f| f.name().to_string()).collect(),
    };

    let mut matched: Vec<&SchemaField> = Vec::with_capacity(requested.len());
    for name in &requested {
        let Some(column) = schema::find(fields, name) else {
            if explicit {
                return Err(StatementError::UnqualifiedField {
                    field: name.clone(),
                }
                .into());
            }
            continue;
        };
        if entity.field_index(&column.name).is_none() {
            return Err(shape_error(format!(
                "field \"{name}\" is not a member of the entity"
            )));
        }
        if !matched.iter().any(|c| c.is_named(&column.name)) {
            matched.push(column);
        }
    }
    if matched.is_empty() {
        return Err(shape_error(format!(
            "no field matches a column of \"{}\"",
            request.table
        )));
    }

    let mut columns: Vec<&SchemaField> = matched
        .into_iter()
        .filter(|c| match request.kind {
            OperationKind::Insert | OperationKind::InsertAll => c.is_insertable(),
            _ => !c.is_generated,
        })
        .collect();

    if request.needs_qualifiers() {
        let qualifiers = schema::resolve_qualifiers(request.qualifiers, fields)
            .ok_or(StatementError::PrimaryKeyRequired)?;
        for name in &qualifiers {
            let column = schema::find(fields, name).ok_or_else(|| {
                StatementError::UnqualifiedField {
                    field: name.clone(),
                }
            })?;
            if entity.field_index(&column.name).is_none() {
                return Err(shape_error(format!(
                    "qualifier \"{name}\" is not a member of the entity"
                )));
            }
            if !columns.iter().any(|c| c.is_named(&column.name)) {
                columns.push(column);
            }
        }
    }

    let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let statement = OperationRequest::new(request.kind, request.table)
        .entity_type(entity.type_tag())
        .fields(column_names.iter().cloned())
        .qualifiers(request.qualifiers.iter().cloned())
        .hints(request.hints.map(str::to_string))
        .batch_size(batch_size);
    let command_text = caches
        .statements()
        .get_text(builder, target, &statement, fields)?;

    let bound = builder.bound_columns(&statement, fields)?;
    let binder = Binder::compile(entity, &bound, batch_size)
        .map_err(|field| shape_error(format!("field \"{field}\" is not a member of the entity")))?;

    let key_setter = match schema::identity(fields) {
        Some(identity) if request.returns_key() && builder.returns_identity(request.kind, batch_size) => {
            KeySetter::compile(entity, &identity.name)
        }
        _ => None,
    };

    tracing::debug!(
        kind = %request.kind,
        table = request.table,
        entity = entity.type_tag(),
        batch_size,
        params_per_row = binder.params_per_row(),
        key = key_setter.as_ref().map(|k| k.field()),
        "compiled execution context"
    );

    Ok(ExecutionContext {
        kind: request.kind,
        table: request.table.to_string(),
        command_text,
        batch_size,
        binder,
        key_setter,
    })
}
