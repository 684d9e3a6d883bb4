//! Result materialization: rows into records and entities.

use std::marker::PhantomData;

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::datum::ConversionError;
use crate::db::DbError;
use crate::driver::{ColumnDesc, Row, RowStream};
use crate::entity::{Entity, Record};
use crate::statement::OperationKind;

/// Builds a value from one result row.
pub trait FromRow: Sized {
    /// Converts `row`, whose values follow `columns`.
    fn from_row(columns: &[ColumnDesc], row: Row) -> Result<Self, ConversionError>;
}

impl FromRow for Record {
    fn from_row(columns: &[ColumnDesc], row: Row) -> Result<Self, ConversionError> {
        let mut record = Record::with_capacity(columns.len());
        for (column, value) in columns.iter().zip(row.values) {
            record.insert(column.name.clone(), value);
        }
        Ok(record)
    }
}

/// Copies row values onto the entity fields of the same name.
///
/// Names match case-insensitively. Columns without a matching field are
/// ignored and fields without a matching column keep their value.
pub fn fill_entity<E: Entity + ?Sized>(
    entity: &mut E,
    columns: &[ColumnDesc],
    row: Row,
) -> Result<(), ConversionError> {
    for (column, value) in columns.iter().zip(row.values) {
        if let Some(index) = entity.field_index(&column.name) {
            entity.set(index, value)?;
        }
    }
    Ok(())
}

/// A forward-only sequence of materialized rows.
///
/// Rows are read from the driver one at a time as the stream is consumed.
/// The stream cannot be restarted; reading the rows again requires a new
/// query. When a cancellation token is attached it is checked before every
/// row read.
pub struct RecordStream<R, T> {
    rows: Option<R>,
    kind: OperationKind,
    table: String,
    cancellation: Option<CancellationToken>,
    finished: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<R: RowStream, T: FromRow> RecordStream<R, T> {
    /// Wraps a row stream.
    pub fn new(
        rows: R,
        kind: OperationKind,
        table: &str,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        Self {
            rows: Some(rows),
            kind,
            table: table.to_string(),
            cancellation,
            finished: false,
            _marker: PhantomData,
        }
    }

    /// A sequence with no rows, returned when the trace hook cancelled the
    /// query.
    pub fn empty(kind: OperationKind, table: &str) -> Self {
        Self {
            rows: None,
            kind,
            table: table.to_string(),
            cancellation: None,
            finished: true,
            _marker: PhantomData,
        }
    }

    /// Columns of the result set.
    pub fn columns(&self) -> &[ColumnDesc] {
        match &self.rows {
            Some(rows) => rows.columns(),
            None => &[],
        }
    }

    /// Reads and converts the next row. Returns `Ok(None)` at the end of the
    /// result set and after an error.
    pub async fn try_next(&mut self) -> Result<Option<T>, DbError> {
        if self.finished {
            return Ok(None);
        }
        let result = self.read().await;
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    async fn read(&mut self) -> Result<Option<T>, DbError> {
        let Self {
            rows,
            kind,
            table,
            cancellation,
            ..
        } = self;
        let Some(rows) = rows.as_mut() else {
            return Ok(None);
        };
        let cancelled = || DbError::Cancelled {
            kind: *kind,
            table: table.clone(),
        };
        let row = match cancellation.as_ref() {
            Some(token) if token.is_cancelled() => return Err(cancelled()),
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(cancelled()),
                row = rows.next_row() => row?,
            },
            None => rows.next_row().await?,
        };
        match row {
            Some(row) => T::from_row(rows.columns(), row)
                .map(Some)
                .map_err(|e| DbError::conversion(*kind, table, e)),
            None => Ok(None),
        }
    }

    /// Reads every remaining row.
    pub async fn collect(mut self) -> Result<Vec<T>, DbError> {
        let mut out = Vec::new();
        while let Some(item) = self.try_next().await? {
            out.push(item);
        }
        Ok(out)
    }

    /// Adapts the sequence into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<T, DbError>> {
        futures_util::stream::unfold(self, |mut records| async move {
            match records.try_next().await {
                Ok(Some(item)) => Some((Ok(item), records)),
                Ok(None) => None,
                Err(e) => Some((Err(e), records)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{StreamExt, TryStreamExt};

    use super::*;
    use crate::datum::Value;
    use crate::driver::ResultSet;
    use crate::driver::memory::MemoryRows;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        id: i64,
        name: String,
        age: Option<i32>,
    }

    crate::impl_entity!(Person { id, name, age });

    fn rows() -> MemoryRows {
        MemoryRows::new(vec![
            ResultSet::new(["ID", "Name", "Extra"])
                .with_row(vec![Value::Int64(1), Value::Text("Ada".into()), Value::Int32(9)])
                .with_row(vec![Value::Int32(2), Value::Text("Bo".into()), Value::Null]),
        ])
    }

    #[tokio::test]
    async fn test_entities_match_columns_by_name() {
        let people: Vec<Person> = RecordStream::new(rows(), OperationKind::QueryAll, "people", None)
            .collect()
            .await
            .unwrap();
        assert_eq!(
            people,
            vec![
                Person {
                    id: 1,
                    name: "Ada".into(),
                    age: None
                },
                Person {
                    id: 2,
                    name: "Bo".into(),
                    age: None
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_records_keep_column_order() {
        let mut stream: RecordStream<_, Record> =
            RecordStream::new(rows(), OperationKind::QueryAll, "people", None);
        let first = stream.try_next().await.unwrap().unwrap();
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["ID", "Name", "Extra"]);
        assert_eq!(first.value("extra"), Some(&Value::Int32(9)));
        assert!(stream.try_next().await.unwrap().is_some());
        assert!(stream.try_next().await.unwrap().is_none());
        assert!(stream.try_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conversion_errors_end_the_stream() {
        let bad = MemoryRows::new(vec![
            ResultSet::new(["id"])
                .with_row(vec![Value::Text("x".into())])
                .with_row(vec![Value::Int64(2)]),
        ]);
        let items: Vec<Result<Person, DbError>> =
            RecordStream::new(bad, OperationKind::Query, "people", None)
                .into_stream()
                .collect::<Vec<_>>()
                .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(DbError::Conversion { .. })));
    }

    #[tokio::test]
    async fn test_empty_sequence() {
        let mut stream: RecordStream<MemoryRows, Record> =
            RecordStream::empty(OperationKind::QueryAll, "people");
        assert!(stream.columns().is_empty());
        assert!(stream.try_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_read() {
        let token = CancellationToken::new();
        token.cancel();
        let stream: RecordStream<_, Record> =
            RecordStream::new(rows(), OperationKind::QueryAll, "people", Some(token));
        let err = stream.into_stream().try_collect::<Vec<_>>().await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
