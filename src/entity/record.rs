//! Loosely-typed rows.

use crate::datum::{ConversionError, Value};

use super::{Entity, EntityField};

/// An ordered string-key map of column values.
///
/// Keys keep insertion order, which for materialized rows is the declared
/// column order of the result set. Key lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<EntityField>,
    values: Vec<Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Inserts or replaces a value, returning the previous one.
    ///
    /// A new key is appended at the end; replacing keeps the key's position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.field_index(&name) {
            Some(index) => Some(std::mem::replace(&mut self.values[index], value)),
            None => {
                self.fields.push(EntityField::owned(name));
                self.values.push(value);
                None
            }
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value for `name`.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.field_index(name).map(|index| &self.values[index])
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.field_index(name)?;
        self.fields.remove(index);
        Some(self.values.remove(index))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .map(EntityField::name)
            .zip(self.values.iter())
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(EntityField::name)
    }
}

impl Entity for Record {
    fn type_tag(&self) -> &str {
        "Record"
    }

    fn fields(&self) -> &[EntityField] {
        &self.fields
    }

    fn get(&self, index: usize) -> Value {
        self.values.get(index).cloned().unwrap_or(Value::Null)
    }

    fn set(&mut self, index: usize, value: Value) -> Result<(), ConversionError> {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let record = Record::new()
            .with("id", 1i64)
            .with("name", "Ada")
            .with("age", 36i32);
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["id", "name", "age"]);
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut record = Record::new().with("a", 1i32).with("b", 2i32);
        assert_eq!(record.insert("A", 10i32), Some(Value::Int32(1)));
        let pairs: Vec<(&str, &Value)> = record.iter().collect();
        assert_eq!(pairs[0], ("a", &Value::Int32(10)));
        assert_eq!(pairs[1], ("b", &Value::Int32(2)));
    }

    #[test]
    fn test_remove_and_lookup() {
        let mut record: Record = [("x", 1i64), ("y", 2i64)].into_iter().collect();
        assert_eq!(record.value("Y"), Some(&Value::Int64(2)));
        assert_eq!(record.remove("x"), Some(Value::Int64(1)));
        assert!(record.value("x").is_none());
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_entity_access() {
        let mut record = Record::new().with("id", Value::Null);
        assert_eq!(record.field_index("ID"), Some(0));
        record.set(0, Value::Int64(7)).unwrap();
        assert_eq!(record.get(0), Value::Int64(7));
        assert_eq!(record.get(5), Value::Null);
    }
}
