//! Entity-driven writes: insert, merge and update, single and batched.

use std::sync::Arc;

use crate::context::{self, ContextRequest, ExecutionContext};
use crate::datum::Value;
use crate::db::{DbError, OperationOptions, Session};
use crate::driver::Connection;
use crate::entity::{Entity, TableMapped};
use crate::executor::{Execution, execute_batch, execute_non_query, execute_scalar};
use crate::filter::IntoFilter;
use crate::schema::{self, SchemaField};
use crate::statement::{OperationKind, OperationRequest, parameter_name};

use super::{context_request, normalize_filter, prepare, schema_fields};

impl<C: Connection> Session<C> {
    /// Inserts one entity and returns its key.
    ///
    /// A database-generated identity is written back onto the entity's
    /// identity field. Without one, the returned key is the entity's primary
    /// key value (NULL for keyless tables).
    pub async fn insert<E: Entity>(
        &mut self,
        table: &str,
        entity: &mut E,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.write_one(OperationKind::Insert, table, entity, options)
            .await
    }

    /// [`insert`](Self::insert) into the entity's own table.
    pub async fn insert_mapped<E: TableMapped>(
        &mut self,
        entity: &mut E,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.insert(E::TABLE, entity, options).await
    }

    /// Inserts or updates one entity, matched on the qualifiers in `options`
    /// (the primary key when none are given), and returns its key.
    pub async fn merge<E: Entity>(
        &mut self,
        table: &str,
        entity: &mut E,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.write_one(OperationKind::Merge, table, entity, options)
            .await
    }

    /// Updates the row matched by the entity's qualifier values and returns
    /// the affected-row count.
    pub async fn update<E: Entity>(
        &mut self,
        table: &str,
        entity: &E,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        let kind = OperationKind::Update;
        let request = context_request(kind, table, options);
        let (conn, exec) = self.split(kind, table, options);
        exec.check()?;
        let context = create_context(conn, &exec, entity, &request).await?;
        let mut command = exec.command(&context.command_text);
        context.binder.bind(&mut command.parameters, entity);
        Ok(execute_non_query(conn, &exec, &command)
            .await?
            .unwrap_or_default())
    }

    /// Updates every row matching `filter` with the entity's values and
    /// returns the affected-row count.
    ///
    /// The entity's fields that name updatable columns (or the fields in
    /// `options`, when given) are written; keys are never overwritten.
    pub async fn update_where<E: Entity, F: IntoFilter>(
        &mut self,
        table: &str,
        entity: &E,
        filter: F,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        let kind = OperationKind::Update;
        let filter = normalize_filter(kind, table, filter)?;
        let (conn, exec) = self.split(kind, table, options);
        exec.check()?;
        let fields = schema_fields(conn, &exec).await?;
        let columns = update_columns(&fields, entity, options.fields.as_deref());

        let request = OperationRequest::new(kind, table)
            .entity_type(entity.type_tag())
            .fields(&columns)
            .filter(filter)
            .hints(options.hints.clone());
        let mut command = prepare(conn, &exec, &request).await?;
        let bound = exec
            .builder
            .bound_columns(&request, &fields)
            .map_err(|e| DbError::statement(kind, table, e))?;
        for column in &bound {
            let value = entity.get_by_name(column).unwrap_or(Value::Null);
            command.parameters.add(parameter_name(column, None), value);
        }
        Ok(execute_non_query(conn, &exec, &command)
            .await?
            .unwrap_or_default())
    }

    /// Inserts every entity in batches and returns the number of rows
    /// inserted. Generated identities are written back onto the entities.
    ///
    /// An empty slice returns 0 without touching the connection.
    pub async fn insert_all<E: Entity>(
        &mut self,
        table: &str,
        entities: &mut [E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.write_all(OperationKind::InsertAll, table, entities, options)
            .await
    }

    /// [`insert_all`](Self::insert_all) into the entities' own table.
    pub async fn insert_all_mapped<E: TableMapped>(
        &mut self,
        entities: &mut [E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.insert_all(E::TABLE, entities, options).await
    }

    /// Inserts or updates every entity in batches.
    pub async fn merge_all<E: Entity>(
        &mut self,
        table: &str,
        entities: &mut [E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.write_all(OperationKind::MergeAll, table, entities, options)
            .await
    }

    /// [`merge_all`](Self::merge_all) into the entities' own table.
    pub async fn merge_all_mapped<E: TableMapped>(
        &mut self,
        entities: &mut [E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.merge_all(E::TABLE, entities, options).await
    }

    /// Updates every entity's row, matched on the qualifiers, in batches.
    pub async fn update_all<E: Entity>(
        &mut self,
        table: &str,
        entities: &mut [E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.write_all(OperationKind::UpdateAll, table, entities, options)
            .await
    }

    async fn write_one<E: Entity>(
        &mut self,
        kind: OperationKind,
        table: &str,
        entity: &mut E,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        let request = context_request(kind, table, options);
        let (conn, exec) = self.split(kind, table, options);
        exec.check()?;
        let context = create_context(conn, &exec, &*entity, &request).await?;
        let per_row = context.binder.params_per_row();
        if per_row > exec.setting.max_parameters {
            return Err(DbError::ParameterLimitExceeded {
                kind,
                table: table.to_string(),
                per_row,
                limit: exec.setting.max_parameters,
            });
        }

        let mut command = exec.command(&context.command_text);
        context.binder.bind(&mut command.parameters, &*entity);
        let Some(key) = execute_scalar::<_, Value>(conn, &exec, &command).await? else {
            return Ok(Value::Null);
        };
        if let Some(setter) = &context.key_setter {
            setter
                .apply(entity, key.clone())
                .map_err(|e| DbError::conversion(kind, table, e))?;
        }
        if !key.is_null() {
            return Ok(key);
        }

        let fields = schema_fields(conn, &exec).await?;
        Ok(schema::primary_keys(&fields)
            .first()
            .and_then(|pk| entity.get_by_name(&pk.name))
            .unwrap_or(Value::Null))
    }

    async fn write_all<E: Entity>(
        &mut self,
        kind: OperationKind,
        table: &str,
        entities: &mut [E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        let supplied = self.transaction;
        let request = context_request(kind, table, options);
        let (conn, exec) = self.split(kind, table, options);
        execute_batch(conn, &exec, &request, options.batch_size, entities, supplied).await
    }
}

async fn create_context<C: Connection, E: Entity + ?Sized>(
    conn: &mut C,
    exec: &Execution<'_>,
    entity: &E,
    request: &ContextRequest<'_>,
) -> Result<Arc<ExecutionContext>, DbError> {
    context::create(conn, exec.caches, exec.builder, entity, request)
        .await
        .map_err(|e| DbError::context(exec.kind, exec.table, e))
}

/// Field names a filtered update writes: the explicit field list, or every
/// entity field the table has, spelled as the schema spells them.
///
/// Unknown explicit names are kept so that statement generation rejects
/// them.
fn update_columns<E: Entity + ?Sized>(
    fields: &[SchemaField],
    entity: &E,
    explicit: Option<&[String]>,
) -> Vec<String> {
    let names: Vec<&str> = match explicit {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => entity.fields().iter().map(|f| f.name()).collect(),
    };
    let mut columns: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let resolved = match schema::find(fields, name) {
            Some(column) => column.name.as_str(),
            None if explicit.is_some() => name,
            None => continue,
        };
        if !columns.iter().any(|c| c.eq_ignore_ascii_case(resolved)) {
            columns.push(resolved.to_string());
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::caches::Caches;
    use crate::datum::{Type, Value};
    use crate::db::{DbError, OperationOptions, Session, SessionBuilder};
    use crate::driver::{MemoryConnection, Response};
    use crate::entity::Record;
    use crate::filter::{Operator, QueryField};
    use crate::schema::SchemaField;
    use crate::statement::OperationKind;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        id: i64,
        name: String,
        age: Option<i32>,
    }

    crate::impl_entity!(Person => "people" { id, name, age });

    fn fields() -> Vec<SchemaField> {
        vec![
            SchemaField::new("Id", 0, Type::Int8).primary().identity(),
            SchemaField::new("Name", 1, Type::Text),
            SchemaField::new("Age", 2, Type::Int4).nullable(),
        ]
    }

    fn session(conn: MemoryConnection) -> Session<MemoryConnection> {
        SessionBuilder::new()
            .caches(Arc::new(Caches::new()))
            .build(conn.with_table("people", fields()))
    }

    #[tokio::test]
    async fn test_insert_assigns_identity() {
        let conn = MemoryConnection::new("memory://write")
            .with_handler(|_| Ok(Response::Scalar(Value::Int64(42))));
        let mut session = session(conn);
        let mut person = Person {
            name: "Ada".to_string(),
            ..Person::default()
        };

        let key = session
            .insert_mapped(&mut person, &OperationOptions::new())
            .await
            .unwrap();
        assert_eq!(key, Value::Int64(42));
        assert_eq!(person.id, 42);

        let command = &session.connection().log().commands()[0];
        assert_eq!(
            command.text,
            r#"INSERT INTO "people" ("Name", "Age") VALUES (@Name, @Age) RETURNING "Id" AS "Result";"#
        );
        assert_eq!(command.parameters.get("Name"), Some(&Value::Text("Ada".into())));
    }

    #[tokio::test]
    async fn test_insert_without_identity_returns_primary_key() {
        let conn = MemoryConnection::new("memory://write-pk")
            .with_table(
                "tags",
                vec![
                    SchemaField::new("Code", 0, Type::Text).primary(),
                    SchemaField::new("Label", 1, Type::Text),
                ],
            )
            .with_handler(|_| Ok(Response::Scalar(Value::Null)));
        let mut session = SessionBuilder::new()
            .caches(Arc::new(Caches::new()))
            .build(conn);
        let mut tag = Record::new().with("Code", "rs").with("Label", "Rust");

        let key = session
            .insert("tags", &mut tag, &OperationOptions::new())
            .await
            .unwrap();
        assert_eq!(key, Value::Text("rs".into()));
    }

    #[tokio::test]
    async fn test_update_by_primary_key() {
        let conn = MemoryConnection::new("memory://update")
            .with_handler(|_| Ok(Response::Affected(1)));
        let mut session = session(conn);
        let person = Person {
            id: 7,
            name: "Bo".to_string(),
            age: Some(30),
        };

        let affected = session
            .update("people", &person, &OperationOptions::new())
            .await
            .unwrap();
        assert_eq!(affected, 1);
        let command = &session.connection().log().commands()[0];
        assert_eq!(
            command.text,
            r#"UPDATE "people" SET "Name" = @Name, "Age" = @Age WHERE "Id" = @Id;"#
        );
        assert_eq!(command.parameters.get("Id"), Some(&Value::Int64(7)));
    }

    #[tokio::test]
    async fn test_update_where_keeps_set_and_filter_parameters_apart() {
        let conn = MemoryConnection::new("memory://update-where")
            .with_handler(|_| Ok(Response::Affected(3)));
        let mut session = session(conn);
        let patch = Record::new().with("Id", 1).with("Name", "anon");

        let affected = session
            .update_where(
                "people",
                &patch,
                QueryField::new("Name", Operator::Like, "test%"),
                &OperationOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(affected, 3);

        let command = &session.connection().log().commands()[0];
        assert_eq!(
            command.text,
            r#"UPDATE "people" SET "Name" = @Name WHERE "Name" LIKE @_Name;"#
        );
        assert_eq!(command.parameters.get("Name"), Some(&Value::Text("anon".into())));
        assert_eq!(command.parameters.get("_Name"), Some(&Value::Text("test%".into())));
        assert_eq!(command.parameters.get("Id"), None);
    }

    #[tokio::test]
    async fn test_merge_on_keyless_table_fails() {
        let conn = MemoryConnection::new("memory://merge")
            .with_table("kv", vec![SchemaField::new("Name", 0, Type::Text)]);
        let mut session = SessionBuilder::new()
            .caches(Arc::new(Caches::new()))
            .build(conn);
        let mut person = Person::default();

        let err = session
            .merge("kv", &mut person, &OperationOptions::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DbError::PrimaryKeyRequired {
                kind: OperationKind::Merge,
                table: "kv".to_string(),
            }
        );
        assert_eq!(session.connection().log().command_count(), 0);
    }
}
