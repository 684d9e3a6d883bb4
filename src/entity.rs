//! Entities: the caller-owned objects that operations read from and write keys back to.
//!
//! An [`Entity`] exposes its fields positionally. The execution context
//! resolves each bound column to a field index once, when the context is
//! compiled, and the hot path then reads and writes by index only.
//!
//! Two kinds of entities are supported:
//!
//! - Fixed record shapes: plain structs implementing [`Entity`] through the
//!   [`impl_entity!`](crate::impl_entity) macro, which generates static
//!   accessor tables.
//! - Loosely-typed rows: [`Record`], an ordered string-key map that
//!   preserves column order.

mod record;

pub use record::Record;

use std::borrow::Cow;

use crate::datum::{ConversionError, Value};

/// A named field of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityField {
    name: Cow<'static, str>,
}

impl EntityField {
    /// Creates a field with a static name (usable in `const` tables).
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    /// Creates a field with an owned name.
    pub fn owned(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
        }
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Positional field access for an entity.
///
/// Implementations must keep `fields()`, `get()` and `set()` consistent:
/// index `i` always refers to `fields()[i]`.
pub trait Entity: Send + Sync {
    /// Structural type tag. Entities sharing a tag and field list share
    /// compiled execution contexts.
    fn type_tag(&self) -> &str;

    /// Fields in declaration order.
    fn fields(&self) -> &[EntityField];

    /// Reads the field at `index`. Out-of-range indexes read as NULL.
    fn get(&self, index: usize) -> Value;

    /// Writes the field at `index`.
    fn set(&mut self, index: usize, value: Value) -> Result<(), ConversionError>;

    /// Finds a field index by name (case-insensitive).
    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields()
            .iter()
            .position(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Reads a field by name (case-insensitive).
    fn get_by_name(&self, name: &str) -> Option<Value> {
        self.field_index(name).map(|index| self.get(index))
    }
}

/// An entity with a default target table.
pub trait TableMapped: Entity {
    /// Default table name for this entity type.
    const TABLE: &'static str;
}

/// Implements [`Entity`] (and [`FromRow`](crate::executor::FromRow)) for a
/// struct by listing the fields that map to columns.
///
/// Every listed field type must implement `Clone`, `Into<Value>` and
/// [`FromValue`](crate::datum::FromValue). The struct must implement
/// `Default` so rows can be materialized into it.
///
/// ```ignore
/// #[derive(Debug, Default, Clone)]
/// struct Person {
///     id: i64,
///     name: String,
///     age: Option<i32>,
/// }
///
/// tabula::impl_entity!(Person => "people" { id, name, age });
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($ty:ident => $table:literal { $($field:ident),+ $(,)? }) => {
        $crate::impl_entity!($ty { $($field),+ });

        impl $crate::entity::TableMapped for $ty {
            const TABLE: &'static str = $table;
        }
    };
    ($ty:ident { $($field:ident),+ $(,)? }) => {
        impl $crate::entity::Entity for $ty {
            fn type_tag(&self) -> &str {
                stringify!($ty)
            }

            fn fields(&self) -> &[$crate::entity::EntityField] {
                const FIELDS: &[$crate::entity::EntityField] =
                    &[$($crate::entity::EntityField::new(stringify!($field))),+];
                FIELDS
            }

            fn get(&self, index: usize) -> $crate::datum::Value {
                const GETTERS: &[fn(&$ty) -> $crate::datum::Value] =
                    &[$(|e: &$ty| $crate::datum::Value::from(e.$field.clone())),+];
                GETTERS
                    .get(index)
                    .map_or($crate::datum::Value::Null, |getter| getter(self))
            }

            fn set(
                &mut self,
                index: usize,
                value: $crate::datum::Value,
            ) -> ::std::result::Result<(), $crate::datum::ConversionError> {
                const SETTERS: &[fn(
                    &mut $ty,
                    $crate::datum::Value,
                ) -> ::std::result::Result<(), $crate::datum::ConversionError>] = &[$(
                    |e: &mut $ty,
                     v: $crate::datum::Value|
                     -> ::std::result::Result<(), $crate::datum::ConversionError> {
                        e.$field = $crate::datum::FromValue::from_value(v)?;
                        Ok(())
                    }
                ),+];
                match SETTERS.get(index) {
                    Some(setter) => setter(self, value),
                    None => Ok(()),
                }
            }
        }

        impl $crate::executor::FromRow for $ty {
            fn from_row(
                columns: &[$crate::driver::ColumnDesc],
                row: $crate::driver::Row,
            ) -> ::std::result::Result<Self, $crate::datum::ConversionError> {
                let mut entity = <$ty as ::std::default::Default>::default();
                $crate::executor::fill_entity(&mut entity, columns, row)?;
                Ok(entity)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        id: i64,
        name: String,
        age: Option<i32>,
    }

    crate::impl_entity!(Person => "people" { id, name, age });

    #[test]
    fn test_macro_fields_and_table() {
        let person = Person::default();
        let names: Vec<&str> = person.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "name", "age"]);
        assert_eq!(person.type_tag(), "Person");
        assert_eq!(<Person as TableMapped>::TABLE, "people");
    }

    #[test]
    fn test_macro_get_set() {
        let mut person = Person {
            id: 1,
            name: "Ada".to_string(),
            age: None,
        };
        assert_eq!(person.get(0), Value::Int64(1));
        assert_eq!(person.get(1), Value::Text("Ada".into()));
        assert_eq!(person.get(2), Value::Null);
        assert_eq!(person.get(9), Value::Null);

        person.set(0, Value::Int32(42)).unwrap();
        person.set(2, Value::Int32(36)).unwrap();
        assert_eq!(person.id, 42);
        assert_eq!(person.age, Some(36));
        assert!(person.set(1, Value::Null).is_err());
    }

    #[test]
    fn test_field_lookup_is_case_insensitive() {
        let person = Person::default();
        assert_eq!(person.field_index("NAME"), Some(1));
        assert_eq!(person.field_index("missing"), None);
        assert_eq!(person.get_by_name("Id"), Some(Value::Int64(0)));
    }
}
