//! Public surface: sessions and the operations they run.
//!
//! A [`Session`] wires one driver connection to the settings, statement
//! builder, caches and optional hooks every operation needs. Operations
//! are async methods on the session; [`BlockingSession`] offers the same
//! methods for synchronous callers.
//!
//! # Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                         Session<C>                               |
//! |                                                                  |
//! |  +-------------+  +------------------+  +----------------------+ |
//! |  | DbSetting   |  | StatementBuilder |  | Caches               | |
//! |  | (limits,    |  | (dialect SQL)    |  | (schema, statement,  | |
//! |  |  quoting)   |  |                  |  |  context)            | |
//! |  +-------------+  +------------------+  +----------------------+ |
//! |  +-------------+  +------------------+                           |
//! |  | Trace       |  | ResultCache      |   optional hooks          |
//! |  +-------------+  +------------------+                           |
//! +----------------------------+-------------------------------------+
//!                              | &mut C for the duration of one call
//!                              v
//!                   +---------------------+
//!                   | driver::Connection  |
//!                   +---------------------+
//! ```

mod blocking;
mod builder;
mod error;
mod operations;
mod options;
mod session;

pub use blocking::BlockingSession;
pub use builder::SessionBuilder;
pub use error::DbError;
pub use options::OperationOptions;
pub use session::Session;
