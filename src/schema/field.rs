//! Column metadata.

use std::fmt;

use crate::datum::Type;

/// Metadata for one column of a table, as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaField {
    /// Column name.
    pub name: String,
    /// 0-based column position.
    pub ordinal: u32,
    /// Column data type.
    pub data_type: Type,
    /// Whether the column accepts NULL.
    pub is_nullable: bool,
    /// Whether the column is part of the primary key.
    pub is_primary: bool,
    /// Whether the engine assigns the value on insert.
    pub is_identity: bool,
    /// Whether the column is computed by the engine and cannot be written.
    pub is_generated: bool,
    /// Declared size (character length, precision), if any.
    pub size: Option<u32>,
}

impl SchemaField {
    /// Creates a non-key, non-nullable column.
    pub fn new(name: impl Into<String>, ordinal: u32, data_type: Type) -> Self {
        Self {
            name: name.into(),
            ordinal,
            data_type,
            is_nullable: false,
            is_primary: false,
            is_identity: false,
            is_generated: false,
            size: None,
        }
    }

    /// Marks the column as part of the primary key.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Marks the column as an identity column.
    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    /// Marks the column as nullable.
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Marks the column as engine-computed.
    pub fn generated(mut self) -> Self {
        self.is_generated = true;
        self
    }

    /// Sets the declared size.
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Returns true if the column name matches `name` (case-insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Returns true if callers may supply a value for this column on insert.
    pub fn is_insertable(&self) -> bool {
        !self.is_identity && !self.is_generated
    }

    /// Returns true if callers may overwrite this column on update.
    pub fn is_updatable(&self) -> bool {
        !self.is_identity && !self.is_generated && !self.is_primary
    }
}

impl fmt::Display for SchemaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if self.is_primary {
            write!(f, " PRIMARY KEY")?;
        }
        if self.is_identity {
            write!(f, " IDENTITY")?;
        }
        if !self.is_nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// Finds a field by name (case-insensitive).
pub fn find<'a>(fields: &'a [SchemaField], name: &str) -> Option<&'a SchemaField> {
    fields.iter().find(|f| f.is_named(name))
}

/// Primary key fields in ordinal order. May be composite.
pub fn primary_keys(fields: &[SchemaField]) -> Vec<&SchemaField> {
    let mut keys: Vec<&SchemaField> = fields.iter().filter(|f| f.is_primary).collect();
    keys.sort_by_key(|f| f.ordinal);
    keys
}

/// The identity field, if the table has one.
pub fn identity(fields: &[SchemaField]) -> Option<&SchemaField> {
    fields.iter().find(|f| f.is_identity)
}

/// Resolves the qualifier fields for key-matched operations.
///
/// Explicit qualifiers always win. When none are given, the primary key is
/// used, then the identity column. Returns `None` if nothing qualifies.
pub fn resolve_qualifiers(explicit: &[String], fields: &[SchemaField]) -> Option<Vec<String>> {
    if !explicit.is_empty() {
        return Some(explicit.to_vec());
    }
    let keys = primary_keys(fields);
    if !keys.is_empty() {
        return Some(keys.into_iter().map(|f| f.name.clone()).collect());
    }
    identity(fields).map(|f| vec![f.name.clone()])
}
