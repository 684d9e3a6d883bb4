//! Row-returning operations.

use std::sync::Arc;

use crate::db::{DbError, OperationOptions, Session};
use crate::driver::Connection;
use crate::entity::TableMapped;
use crate::executor::{FromRow, RecordStream, execute_reader};
use crate::filter::{FilterNode, IntoFilter};
use crate::result_cache::get_typed;
use crate::statement::{OperationKind, OperationRequest};

use super::{normalize_filter, prepare};

impl<C: Connection> Session<C> {
    /// Reads the rows matching `filter`.
    ///
    /// With a cache key and a result cache configured, a live cached result
    /// is returned without running the query, and a fresh result is stored
    /// for the call's expiration.
    pub async fn query<T, F>(
        &mut self,
        table: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Vec<T>, DbError>
    where
        T: FromRow + Clone + Send + Sync + 'static,
        F: IntoFilter,
    {
        let filter = normalize_filter(OperationKind::Query, table, filter)?;
        self.read_cached(OperationKind::Query, table, filter, options)
            .await
    }

    /// Reads every row, subject to the ordering and row limit in `options`.
    pub async fn query_all<T>(
        &mut self,
        table: &str,
        options: &OperationOptions,
    ) -> Result<Vec<T>, DbError>
    where
        T: FromRow + Clone + Send + Sync + 'static,
    {
        self.read_cached(OperationKind::QueryAll, table, None, options)
            .await
    }

    /// [`query`](Self::query) against the entity's own table.
    pub async fn query_mapped<T, F>(
        &mut self,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Vec<T>, DbError>
    where
        T: TableMapped + FromRow + Clone + Send + Sync + 'static,
        F: IntoFilter,
    {
        self.query(T::TABLE, filter, options).await
    }

    /// Reads the rows matching `filter` lazily.
    ///
    /// The returned stream borrows nothing from the session but holds the
    /// driver's row stream; read it to the end (or drop it) before running
    /// the next operation. Result caching does not apply.
    pub async fn query_stream<T, F>(
        &mut self,
        table: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<RecordStream<C::Rows, T>, DbError>
    where
        T: FromRow,
        F: IntoFilter,
    {
        let kind = OperationKind::Query;
        let filter = normalize_filter(kind, table, filter)?;
        let request = read_request(kind, table, filter, options);
        let (conn, exec) = self.split(kind, table, options);
        let command = prepare(conn, &exec, &request).await?;
        Ok(match execute_reader(conn, &exec, &command).await? {
            Some(rows) => RecordStream::new(rows, kind, table, options.cancellation.clone()),
            None => RecordStream::empty(kind, table),
        })
    }

    async fn read_cached<T>(
        &mut self,
        kind: OperationKind,
        table: &str,
        filter: Option<FilterNode>,
        options: &OperationOptions,
    ) -> Result<Vec<T>, DbError>
    where
        T: FromRow + Clone + Send + Sync + 'static,
    {
        let cache = match &options.cache_key {
            Some(key) => self.result_cache.clone().map(|cache| (key, cache)),
            None => None,
        };
        if let Some((key, cache)) = &cache
            && let Some(hit) = get_typed::<Vec<T>>(&**cache, key)
        {
            tracing::trace!(kind = %kind, table, key = key.as_str(), "result cache hit");
            return Ok((*hit).clone());
        }

        let request = read_request(kind, table, filter, options);
        let rows: Vec<T> = {
            let (conn, exec) = self.split(kind, table, options);
            let command = prepare(conn, &exec, &request).await?;
            match execute_reader(conn, &exec, &command).await? {
                Some(rows) => {
                    RecordStream::new(rows, kind, table, options.cancellation.clone())
                        .collect()
                        .await?
                }
                None => return Ok(Vec::new()),
            }
        };

        if let Some((key, cache)) = cache {
            let expiration = options
                .cache_expiration
                .unwrap_or_else(|| self.setting.cache_expiration());
            cache.set(key, Arc::new(rows.clone()), expiration);
        }
        Ok(rows)
    }
}

fn read_request(
    kind: OperationKind,
    table: &str,
    filter: Option<FilterNode>,
    options: &OperationOptions,
) -> OperationRequest {
    OperationRequest::new(kind, table)
        .fields(options.fields.iter().flatten())
        .filter(filter)
        .order_by(options.order_by.clone())
        .top(options.top)
        .hints(options.hints.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::caches::Caches;
    use crate::datum::{Type, Value};
    use crate::db::{OperationOptions, Session, SessionBuilder};
    use crate::driver::{MemoryConnection, ResultSet, Response};
    use crate::entity::Record;
    use crate::result_cache::MemoryCache;
    use crate::schema::SchemaField;
    use crate::statement::OrderField;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        id: i64,
        name: String,
    }

    crate::impl_entity!(Person => "people" { id, name });

    fn session() -> Session<MemoryConnection> {
        let conn = MemoryConnection::new("memory://query")
            .with_table(
                "people",
                vec![
                    SchemaField::new("Id", 0, Type::Int8).primary().identity(),
                    SchemaField::new("Name", 1, Type::Text),
                ],
            )
            .with_handler(|_| {
                Ok(Response::Rows(vec![
                    ResultSet::new(["Id", "Name"])
                        .with_row(vec![Value::Int64(1), Value::Text("Ada".into())])
                        .with_row(vec![Value::Int64(2), Value::Text("Bo".into())]),
                ]))
            });
        SessionBuilder::new()
            .caches(Arc::new(Caches::new()))
            .result_cache(Arc::new(MemoryCache::new()))
            .build(conn)
    }

    #[tokio::test]
    async fn test_query_renders_order_and_limit() {
        let mut session = session();
        let options = OperationOptions::new()
            .order_by(vec![OrderField::descending("name")])
            .top(2);
        let people: Vec<Person> = session.query_mapped(("Id", 1), &options).await.unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].name, "Ada");

        let command = &session.connection().log().commands()[0];
        assert_eq!(
            command.text,
            r#"SELECT "Id", "Name" FROM "people" WHERE "Id" = @_Id ORDER BY "Name" DESC LIMIT 2;"#
        );
    }

    #[tokio::test]
    async fn test_query_all_uses_result_cache() {
        let mut session = session();
        let log = session.connection().log();
        let options = OperationOptions::new()
            .cache_key("all-people")
            .cache_expiration(Duration::from_secs(60));

        let first: Vec<Record> = session.query_all("people", &options).await.unwrap();
        let second: Vec<Record> = session.query_all("people", &options).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(log.command_count(), 1);

        // A different row type under the same key is a miss.
        let typed: Vec<Person> = session.query_all("people", &options).await.unwrap();
        assert_eq!(typed.len(), 2);
        assert_eq!(log.command_count(), 2);
    }

    #[tokio::test]
    async fn test_query_stream_reads_lazily() {
        let mut session = session();
        let mut stream = session
            .query_stream::<Record, _>("people", (), &OperationOptions::new())
            .await
            .unwrap();
        assert_eq!(stream.columns().len(), 2);
        let first = stream.try_next().await.unwrap().unwrap();
        assert_eq!(first.value("name"), Some(&Value::Text("Ada".into())));
        assert!(stream.try_next().await.unwrap().is_some());
        assert!(stream.try_next().await.unwrap().is_none());
    }
}
