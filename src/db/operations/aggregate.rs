//! Count, existence and aggregate operations.

use crate::datum::{FromValue, Value};
use crate::db::{DbError, OperationOptions, Session};
use crate::driver::Connection;
use crate::executor::execute_scalar;
use crate::filter::IntoFilter;
use crate::statement::{OperationKind, OperationRequest};

use super::{normalize_filter, prepare};

impl<C: Connection> Session<C> {
    /// Counts the rows matching `filter`.
    pub async fn count<F: IntoFilter>(
        &mut self,
        table: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        let value = self
            .aggregate(OperationKind::Count, table, None, filter, options)
            .await?;
        to_count(OperationKind::Count, table, value)
    }

    /// Counts every row.
    pub async fn count_all(
        &mut self,
        table: &str,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        let value = self
            .aggregate(OperationKind::CountAll, table, None, (), options)
            .await?;
        to_count(OperationKind::CountAll, table, value)
    }

    /// Returns true if any row matches `filter`.
    pub async fn exists<F: IntoFilter>(
        &mut self,
        table: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<bool, DbError> {
        let kind = OperationKind::Exists;
        let filter = normalize_filter(kind, table, filter)?;
        let request = OperationRequest::new(kind, table)
            .filter(filter)
            .hints(options.hints.clone());
        let (conn, exec) = self.split(kind, table, options);
        let command = prepare(conn, &exec, &request).await?;
        let value = execute_scalar::<_, Value>(conn, &exec, &command).await?;
        Ok(value.is_some_and(|v| !v.is_null()))
    }

    /// `SUM(field)` over the rows matching `filter`. NULL when no row
    /// matches.
    pub async fn sum<F: IntoFilter>(
        &mut self,
        table: &str,
        field: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.aggregate(OperationKind::Sum, table, Some(field), filter, options)
            .await
    }

    /// `SUM(field)` over every row.
    pub async fn sum_all(
        &mut self,
        table: &str,
        field: &str,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.aggregate(OperationKind::SumAll, table, Some(field), (), options)
            .await
    }

    /// `MAX(field)` over the rows matching `filter`.
    pub async fn max<F: IntoFilter>(
        &mut self,
        table: &str,
        field: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.aggregate(OperationKind::Max, table, Some(field), filter, options)
            .await
    }

    /// `MAX(field)` over every row.
    pub async fn max_all(
        &mut self,
        table: &str,
        field: &str,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.aggregate(OperationKind::MaxAll, table, Some(field), (), options)
            .await
    }

    /// `MIN(field)` over the rows matching `filter`.
    pub async fn min<F: IntoFilter>(
        &mut self,
        table: &str,
        field: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.aggregate(OperationKind::Min, table, Some(field), filter, options)
            .await
    }

    /// `MIN(field)` over every row.
    pub async fn min_all(
        &mut self,
        table: &str,
        field: &str,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.aggregate(OperationKind::MinAll, table, Some(field), (), options)
            .await
    }

    /// `AVG(field)` over the rows matching `filter`.
    pub async fn average<F: IntoFilter>(
        &mut self,
        table: &str,
        field: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.aggregate(OperationKind::Average, table, Some(field), filter, options)
            .await
    }

    /// `AVG(field)` over every row.
    pub async fn average_all(
        &mut self,
        table: &str,
        field: &str,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.aggregate(OperationKind::AverageAll, table, Some(field), (), options)
            .await
    }

    /// Runs one aggregate. A cancelled trace yields NULL.
    async fn aggregate<F: IntoFilter>(
        &mut self,
        kind: OperationKind,
        table: &str,
        field: Option<&str>,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        let filter = normalize_filter(kind, table, filter)?;
        let request = OperationRequest::new(kind, table)
            .fields(field)
            .filter(filter)
            .hints(options.hints.clone());
        let (conn, exec) = self.split(kind, table, options);
        let command = prepare(conn, &exec, &request).await?;
        Ok(execute_scalar::<_, Value>(conn, &exec, &command)
            .await?
            .unwrap_or(Value::Null))
    }
}

fn to_count(kind: OperationKind, table: &str, value: Value) -> Result<u64, DbError> {
    Option::<u64>::from_value(value)
        .map(Option::unwrap_or_default)
        .map_err(|e| DbError::conversion(kind, table, e))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::caches::Caches;
    use crate::datum::{Type, Value};
    use crate::db::{DbError, OperationOptions, Session, SessionBuilder};
    use crate::driver::{Command, DriverError, MemoryConnection, Response};
    use crate::filter::{Operator, QueryField};
    use crate::schema::SchemaField;
    use crate::statement::OperationKind;

    fn session<F>(handler: F) -> Session<MemoryConnection>
    where
        F: FnMut(&Command) -> Result<Response, DriverError> + Send + 'static,
    {
        let conn = MemoryConnection::new("memory://aggregate")
            .with_table(
                "people",
                vec![
                    SchemaField::new("Id", 0, Type::Int8).primary().identity(),
                    SchemaField::new("Age", 1, Type::Int4).nullable(),
                ],
            )
            .with_handler(handler);
        SessionBuilder::new()
            .caches(Arc::new(Caches::new()))
            .build(conn)
    }

    #[tokio::test]
    async fn test_count_binds_filter_values() {
        let mut session = session(|_| Ok(Response::Scalar(Value::Int64(4))));
        let count = session
            .count(
                "people",
                QueryField::new("Age", Operator::GreaterThan, 30),
                &OperationOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(count, 4);

        let command = &session.connection().log().commands()[0];
        assert_eq!(
            command.text,
            r#"SELECT COUNT(*) AS "CountValue" FROM "people" WHERE "Age" > @_Age;"#
        );
        assert_eq!(command.parameters.get("_Age"), Some(&Value::Int32(30)));
    }

    #[tokio::test]
    async fn test_aggregates_and_exists() {
        let mut session = session(|command| {
            Ok(Response::Scalar(if command.text.contains("ExistsValue") {
                Value::Null
            } else {
                Value::Int64(81)
            }))
        });
        let options = OperationOptions::new();

        assert_eq!(
            session.max_all("people", "Age", &options).await.unwrap(),
            Value::Int64(81)
        );
        assert_eq!(session.count_all("people", &options).await.unwrap(), 81);
        assert!(!session.exists("people", ("Age", 200), &options).await.unwrap());

        let err = session
            .sum("people", "Salary", (), &options)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DbError::UnqualifiedField {
                kind: OperationKind::Sum,
                table: "people".to_string(),
                field: "Salary".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_filter_names_the_operation() {
        let mut session = session(|_| Ok(Response::Affected(0)));
        let err = session
            .count(
                "people",
                QueryField::any_of("Age", Vec::<i32>::new()),
                &OperationOptions::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidFilter {
                kind: OperationKind::Count,
                ..
            }
        ));
        assert_eq!(session.connection().log().command_count(), 0);
    }
}
