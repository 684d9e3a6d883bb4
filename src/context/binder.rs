//! Compiled parameter binders and key setters.

use crate::datum::{ConversionError, Value};
use crate::driver::Parameters;
use crate::entity::Entity;
use crate::statement::{parameter_name, row_suffix};

/// One bound column: where its value comes from and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BindSlot {
    /// Column name as the schema spells it.
    column: String,
    /// Entity field index resolved at compile time.
    index: usize,
}

impl BindSlot {
    fn read<E: Entity + ?Sized>(&self, entity: &E) -> Value {
        let fields = entity.fields();
        if fields
            .get(self.index)
            .is_some_and(|f| f.name().eq_ignore_ascii_case(&self.column))
        {
            return entity.get(self.index);
        }
        // Same type tag, different field order: look the field up by name.
        entity.get_by_name(&self.column).unwrap_or(Value::Null)
    }
}

/// Writes entity field values into a command's parameter set.
///
/// A binder is compiled once per entity shape, column set and batch size
/// and then reused for every call with that shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binder {
    slots: Vec<BindSlot>,
    batch_size: usize,
}

impl Binder {
    /// Compiles a binder for `columns` against the fields of `entity`.
    ///
    /// Returns the first column `entity` has no field for.
    pub(crate) fn compile<E: Entity + ?Sized>(
        entity: &E,
        columns: &[String],
        batch_size: usize,
    ) -> Result<Self, String> {
        let slots = columns
            .iter()
            .map(|column| {
                entity
                    .field_index(column)
                    .map(|index| BindSlot {
                        column: column.clone(),
                        index,
                    })
                    .ok_or_else(|| column.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            slots,
            batch_size: batch_size.max(1),
        })
    }

    /// Number of distinct parameters bound per row.
    pub fn params_per_row(&self) -> usize {
        self.slots.len()
    }

    /// Rows per command this binder was compiled for.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Column names bound per row, in binding order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.column.as_str())
    }

    /// Binds one entity with unsuffixed parameter names.
    pub fn bind<E: Entity + ?Sized>(&self, params: &mut Parameters, entity: &E) {
        for slot in &self.slots {
            params.add(parameter_name(&slot.column, None), slot.read(entity));
        }
    }

    /// Binds a chunk of entities, suffixing parameter names with the row
    /// index when the binder was compiled for more than one row.
    pub fn bind_many<E: Entity>(&self, params: &mut Parameters, entities: &[E]) {
        for (i, entity) in entities.iter().enumerate() {
            let row = row_suffix(self.batch_size, i);
            for slot in &self.slots {
                params.add(parameter_name(&slot.column, row), slot.read(entity));
            }
        }
    }
}

/// Writes a database-generated key back onto an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySetter {
    field: String,
    index: usize,
}

impl KeySetter {
    pub(crate) fn compile<E: Entity + ?Sized>(entity: &E, column: &str) -> Option<Self> {
        entity.field_index(column).map(|index| Self {
            field: column.to_string(),
            index,
        })
    }

    /// Name of the key column.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Assigns `value` to the key field. NULL is skipped and reported as
    /// `Ok(false)`.
    pub fn apply<E: Entity + ?Sized>(
        &self,
        entity: &mut E,
        value: Value,
    ) -> Result<bool, ConversionError> {
        if value.is_null() {
            return Ok(false);
        }
        let index = match entity.fields().get(self.index) {
            Some(f) if f.name().eq_ignore_ascii_case(&self.field) => self.index,
            _ => match entity.field_index(&self.field) {
                Some(index) => index,
                None => return Ok(false),
            },
        };
        entity.set(index, value)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Record;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Item {
        id: i64,
        label: String,
    }

    crate::impl_entity!(Item { id, label });

    #[test]
    fn test_bind_single_and_many() {
        let binder = Binder::compile(&Item::default(), &["Label".to_string()], 2).unwrap();
        assert_eq!(binder.params_per_row(), 1);

        let items = vec![
            Item {
                id: 1,
                label: "a".into(),
            },
            Item {
                id: 2,
                label: "b".into(),
            },
        ];
        let mut params = Parameters::new();
        binder.bind_many(&mut params, &items);
        assert_eq!(params.get("Label_0"), Some(&Value::Text("a".into())));
        assert_eq!(params.get("Label_1"), Some(&Value::Text("b".into())));

        let mut single = Parameters::new();
        binder.bind(&mut single, &items[1]);
        assert_eq!(single.get("Label"), Some(&Value::Text("b".into())));
    }

    #[test]
    fn test_missing_field_is_reported() {
        let err = Binder::compile(&Item::default(), &["color".to_string()], 1).unwrap_err();
        assert_eq!(err, "color");
    }

    #[test]
    fn test_records_with_other_field_order() {
        let template = Record::new().with("a", 1).with("b", 2);
        let binder = Binder::compile(&template, &["b".to_string()], 1).unwrap();
        let reordered = Record::new().with("b", 20).with("a", 10);
        let mut params = Parameters::new();
        binder.bind(&mut params, &reordered);
        assert_eq!(params.get("b"), Some(&Value::Int32(20)));
    }

    #[test]
    fn test_key_setter_skips_null() {
        let setter = KeySetter::compile(&Item::default(), "ID").unwrap();
        let mut item = Item::default();
        assert!(!setter.apply(&mut item, Value::Null).unwrap());
        assert_eq!(item.id, 0);
        assert!(setter.apply(&mut item, Value::Int64(41)).unwrap());
        assert_eq!(item.id, 41);
        assert!(KeySetter::compile(&Item::default(), "missing").is_none());
    }
}
