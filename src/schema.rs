//! Table schema metadata.
//!
//! Column metadata ([`SchemaField`]) is fetched from the driver through
//! schema introspection and cached per connection target and table in a
//! [`SchemaCache`]. Every statement the crate generates is validated
//! against these fields, and key-matched operations derive their default
//! qualifiers from them ([`resolve_qualifiers`]).

mod cache;
mod field;

pub use cache::{SchemaCache, SchemaError};
pub use field::{SchemaField, find, identity, primary_keys, resolve_qualifiers};
