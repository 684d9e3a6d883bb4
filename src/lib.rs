//! Batched command execution and dynamic SQL generation.
//!
//! `tabula` turns entity-level calls (insert these rows, count those,
//! update by key) into parameterized SQL, runs them over a driver
//! connection and writes generated keys back onto the entities. Batch
//! writes are split into chunks that respect the driver's parameter limit
//! and run inside one transaction.
//!
//! ```ignore
//! use tabula::{OperationOptions, Session};
//!
//! let mut session = Session::new(conn);
//! let inserted = session
//!     .insert_all("people", &mut people, &OperationOptions::new().batch_size(50))
//!     .await?;
//! let adults = session
//!     .count("people", QueryField::new("Age", Operator::GreaterThanOrEqual, 18), &OperationOptions::new())
//!     .await?;
//! ```

pub mod caches;
pub mod config;
pub mod context;
pub mod datum;
pub mod db;
pub mod driver;
pub mod entity;
pub mod executor;
pub mod filter;
pub mod result_cache;
pub mod schema;
pub mod statement;
pub mod trace;

pub use caches::Caches;
pub use config::DbSetting;
pub use datum::{FromValue, Type, Value};
pub use db::{BlockingSession, DbError, OperationOptions, Session, SessionBuilder};
pub use entity::{Entity, Record, TableMapped};
pub use executor::{FromRow, RecordStream};
pub use filter::{FilterNode, Operator, QueryField};
pub use statement::{AnsiStatementBuilder, OperationKind, OrderField, StatementBuilder};
pub use trace::{Trace, TraceAction, TracingTrace};
