//! Synchronous twins of the session operations.
//!
//! [`BlockingSession`] owns a current-thread tokio runtime and drives each
//! async operation to completion on the calling thread. It must not be used
//! from inside an async context; calling it from a runtime worker panics in
//! tokio's `block_on`.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::datum::Value;
use crate::driver::Connection;
use crate::entity::Entity;
use crate::executor::FromRow;
use crate::filter::IntoFilter;
use crate::schema::SchemaField;

use super::error::DbError;
use super::options::OperationOptions;
use super::session::Session;

/// A [`Session`] with blocking methods.
///
/// ```ignore
/// let mut db = BlockingSession::new(conn)?;
/// let adults = db.count("people", QueryField::new("Age", Operator::GreaterThan, 17), &OperationOptions::new())?;
/// ```
pub struct BlockingSession<C: Connection> {
    runtime: Runtime,
    session: Session<C>,
}

impl<C: Connection> BlockingSession<C> {
    /// Wraps a default [`Session`] over `conn`.
    pub fn new(conn: C) -> std::io::Result<Self> {
        Self::from_session(Session::new(conn))
    }

    /// Wraps an existing session.
    pub fn from_session(session: Session<C>) -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime, session })
    }

    /// The wrapped session.
    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    /// The wrapped session, mutably.
    pub fn session_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }

    /// Unwraps the session.
    pub fn into_session(self) -> Session<C> {
        self.session
    }

    /// See [`Session::begin`].
    pub fn begin(&mut self) -> Result<(), DbError> {
        self.runtime.block_on(self.session.begin())
    }

    /// See [`Session::commit`].
    pub fn commit(&mut self) -> Result<(), DbError> {
        self.runtime.block_on(self.session.commit())
    }

    /// See [`Session::rollback`].
    pub fn rollback(&mut self) -> Result<(), DbError> {
        self.runtime.block_on(self.session.rollback())
    }

    /// See [`Session::schema`].
    pub fn schema(&mut self, table: &str, force_refresh: bool) -> Result<Arc<[SchemaField]>, DbError> {
        self.runtime.block_on(self.session.schema(table, force_refresh))
    }

    /// See [`Session::count`].
    pub fn count<F: IntoFilter>(
        &mut self,
        table: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.runtime
            .block_on(self.session.count(table, filter, options))
    }

    /// See [`Session::count_all`].
    pub fn count_all(&mut self, table: &str, options: &OperationOptions) -> Result<u64, DbError> {
        self.runtime.block_on(self.session.count_all(table, options))
    }

    /// See [`Session::exists`].
    pub fn exists<F: IntoFilter>(
        &mut self,
        table: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<bool, DbError> {
        self.runtime
            .block_on(self.session.exists(table, filter, options))
    }

    /// See [`Session::sum`].
    pub fn sum<F: IntoFilter>(
        &mut self,
        table: &str,
        field: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.sum(table, field, filter, options))
    }

    /// See [`Session::sum_all`].
    pub fn sum_all(
        &mut self,
        table: &str,
        field: &str,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.sum_all(table, field, options))
    }

    /// See [`Session::max`].
    pub fn max<F: IntoFilter>(
        &mut self,
        table: &str,
        field: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.max(table, field, filter, options))
    }

    /// See [`Session::max_all`].
    pub fn max_all(
        &mut self,
        table: &str,
        field: &str,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.max_all(table, field, options))
    }

    /// See [`Session::min`].
    pub fn min<F: IntoFilter>(
        &mut self,
        table: &str,
        field: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.min(table, field, filter, options))
    }

    /// See [`Session::min_all`].
    pub fn min_all(
        &mut self,
        table: &str,
        field: &str,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.min_all(table, field, options))
    }

    /// See [`Session::average`].
    pub fn average<F: IntoFilter>(
        &mut self,
        table: &str,
        field: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.average(table, field, filter, options))
    }

    /// See [`Session::average_all`].
    pub fn average_all(
        &mut self,
        table: &str,
        field: &str,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.average_all(table, field, options))
    }

    /// See [`Session::query`].
    pub fn query<T, F>(
        &mut self,
        table: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<Vec<T>, DbError>
    where
        T: FromRow + Clone + Send + Sync + 'static,
        F: IntoFilter,
    {
        self.runtime
            .block_on(self.session.query(table, filter, options))
    }

    /// See [`Session::query_all`].
    pub fn query_all<T>(&mut self, table: &str, options: &OperationOptions) -> Result<Vec<T>, DbError>
    where
        T: FromRow + Clone + Send + Sync + 'static,
    {
        self.runtime.block_on(self.session.query_all(table, options))
    }

    /// See [`Session::insert`].
    pub fn insert<E: Entity>(
        &mut self,
        table: &str,
        entity: &mut E,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.insert(table, entity, options))
    }

    /// See [`Session::merge`].
    pub fn merge<E: Entity>(
        &mut self,
        table: &str,
        entity: &mut E,
        options: &OperationOptions,
    ) -> Result<Value, DbError> {
        self.runtime
            .block_on(self.session.merge(table, entity, options))
    }

    /// See [`Session::update`].
    pub fn update<E: Entity>(
        &mut self,
        table: &str,
        entity: &E,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.runtime
            .block_on(self.session.update(table, entity, options))
    }

    /// See [`Session::update_where`].
    pub fn update_where<E: Entity, F: IntoFilter>(
        &mut self,
        table: &str,
        entity: &E,
        filter: F,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.runtime
            .block_on(self.session.update_where(table, entity, filter, options))
    }

    /// See [`Session::insert_all`].
    pub fn insert_all<E: Entity>(
        &mut self,
        table: &str,
        entities: &mut [E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.runtime
            .block_on(self.session.insert_all(table, entities, options))
    }

    /// See [`Session::merge_all`].
    pub fn merge_all<E: Entity>(
        &mut self,
        table: &str,
        entities: &mut [E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.runtime
            .block_on(self.session.merge_all(table, entities, options))
    }

    /// See [`Session::update_all`].
    pub fn update_all<E: Entity>(
        &mut self,
        table: &str,
        entities: &mut [E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.runtime
            .block_on(self.session.update_all(table, entities, options))
    }

    /// See [`Session::delete`].
    pub fn delete<F: IntoFilter>(
        &mut self,
        table: &str,
        filter: F,
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.runtime
            .block_on(self.session.delete(table, filter, options))
    }

    /// See [`Session::delete_all`].
    pub fn delete_all(&mut self, table: &str, options: &OperationOptions) -> Result<u64, DbError> {
        self.runtime.block_on(self.session.delete_all(table, options))
    }

    /// See [`Session::delete_all_entities`].
    pub fn delete_all_entities<E: Entity>(
        &mut self,
        table: &str,
        entities: &[E],
        options: &OperationOptions,
    ) -> Result<u64, DbError> {
        self.runtime
            .block_on(self.session.delete_all_entities(table, entities, options))
    }

    /// See [`Session::truncate`].
    pub fn truncate(&mut self, table: &str, options: &OperationOptions) -> Result<u64, DbError> {
        self.runtime.block_on(self.session.truncate(table, options))
    }
}
