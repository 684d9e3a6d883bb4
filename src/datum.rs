//! Column data types and values.
//!
//! [`Type`] is the data type tag carried by schema fields and result
//! columns, [`Value`] is a single typed column value as it travels between
//! entities, bound parameters and result rows. [`FromValue`] performs the
//! native-to-target conversion used when materializing rows and when
//! writing generated keys back onto entities.

use std::fmt;

use thiserror::Error;

/// Errors from converting a [`Value`] into a Rust type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The value's type cannot represent the requested target type.
    #[error("cannot convert {found} to {target}")]
    Incompatible {
        /// Target type name.
        target: &'static str,
        /// Display name of the source value's type.
        found: String,
    },
    /// The value is numerically out of range for the target type.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// Target type name.
        target: &'static str,
        /// Text form of the source value.
        value: String,
    },
    /// NULL was supplied where the target type has no null representation.
    #[error("unexpected NULL for {target}")]
    UnexpectedNull {
        /// Target type name.
        target: &'static str,
    },
}

/// Column data type tag.
///
/// Schema introspection reports one of these per column; result columns may
/// carry one when the driver knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// Boolean type.
    Bool,
    /// Variable-length binary string.
    Bytea,
    /// 2-byte integer.
    Int2,
    /// 4-byte integer.
    Int4,
    /// 8-byte integer.
    Int8,
    /// Single-precision floating-point.
    Float4,
    /// Double-precision floating-point.
    Float8,
    /// Variable-length string.
    Text,
    /// Variable-length string with limit.
    Varchar,
    /// Fixed-length string.
    Bpchar,
}

impl Type {
    /// Returns the SQL display name for this type (e.g., `"BOOLEAN"`, `"INTEGER"`).
    pub const fn display_name(self) -> &'static str {
        match self {
            Type::Bool => "BOOLEAN",
            Type::Bytea => "BYTEA",
            Type::Int2 => "SMALLINT",
            Type::Int4 => "INTEGER",
            Type::Int8 => "BIGINT",
            Type::Float4 => "REAL",
            Type::Float8 => "DOUBLE PRECISION",
            Type::Text => "TEXT",
            Type::Varchar => "VARCHAR",
            Type::Bpchar => "CHAR",
        }
    }

    /// Returns the fixed byte size for fixed-length types, or `None` for variable-length types.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Type::Bool => Some(1),
            Type::Int2 => Some(2),
            Type::Int4 => Some(4),
            Type::Int8 => Some(8),
            Type::Float4 => Some(4),
            Type::Float8 => Some(8),
            Type::Text | Type::Varchar | Type::Bpchar | Type::Bytea => None,
        }
    }

    /// Returns true for integer and floating-point types.
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Type::Int2 | Type::Int4 | Type::Int8 | Type::Float4 | Type::Float8
        )
    }

    /// Parses a type name as reported by schema introspection.
    ///
    /// Matching is case-insensitive and accepts the common aliases
    /// (`int`, `integer`, `int4`, `character varying`, ...). Length
    /// modifiers such as `varchar(40)` are ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let base = name.split('(').next().unwrap_or(name).trim();
        let ty = match base.to_ascii_lowercase().as_str() {
            "bool" | "boolean" | "bit" => Type::Bool,
            "bytea" | "blob" | "binary" | "varbinary" => Type::Bytea,
            "int2" | "smallint" => Type::Int2,
            "int" | "int4" | "integer" => Type::Int4,
            "int8" | "bigint" => Type::Int8,
            "float4" | "real" => Type::Float4,
            "float8" | "float" | "double" | "double precision" => Type::Float8,
            "text" | "clob" => Type::Text,
            "varchar" | "character varying" | "nvarchar" => Type::Varchar,
            "char" | "character" | "bpchar" | "nchar" => Type::Bpchar,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Bool => "boolean",
            Type::Bytea => "bytea",
            Type::Int2 => "smallint",
            Type::Int4 => "integer",
            Type::Int8 => "bigint",
            Type::Float4 => "real",
            Type::Float8 => "double precision",
            Type::Text => "text",
            Type::Varchar => "character varying",
            Type::Bpchar => "character",
        };
        write!(f, "{}", name)
    }
}

/// A typed column value.
///
/// This represents a single column value with its concrete type.
/// `Text` and `Bytea` own their buffers.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Value {
    /// SQL NULL (type is unknown/any).
    Null,
    /// Boolean (true/false).
    Boolean(bool),
    /// 16-bit signed integer (SMALLINT).
    Int16(i16),
    /// 32-bit signed integer (INTEGER).
    Int32(i32),
    /// 64-bit signed integer (BIGINT).
    Int64(i64),
    /// 32-bit floating point (REAL).
    Float32(f32),
    /// 64-bit floating point (DOUBLE PRECISION).
    Float64(f64),
    /// Variable-length text (TEXT, VARCHAR).
    Text(String),
    /// Variable-length binary (BYTEA).
    Bytea(Vec<u8>),
}

impl Value {
    /// Returns the data type for this value, or `None` for Null.
    pub fn data_type(&self) -> Option<Type> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(Type::Bool),
            Value::Int16(_) => Some(Type::Int2),
            Value::Int32(_) => Some(Type::Int4),
            Value::Int64(_) => Some(Type::Int8),
            Value::Float32(_) => Some(Type::Float4),
            Value::Float64(_) => Some(Type::Float8),
            Value::Text(_) => Some(Type::Text),
            Value::Bytea(_) => Some(Type::Bytea),
        }
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as a signed 64-bit integer when it is integral.
    ///
    /// Text holding a decimal integer is accepted as well, since some drivers
    /// report computed columns as text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(n) => Some(*n as i64),
            Value::Int32(n) => Some(*n as i64),
            Value::Int64(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value widened to `f64` when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int16(n) => Some(*n as f64),
            Value::Int32(n) => Some(*n as f64),
            Value::Int64(n) => Some(*n as f64),
            Value::Float32(n) => Some(*n as f64),
            Value::Float64(n) => Some(*n),
            _ => None,
        }
    }

    /// Name of this value's type for error messages.
    pub fn type_name(&self) -> String {
        match self.data_type() {
            Some(ty) => ty.to_string(),
            None => "null".to_string(),
        }
    }

    /// Converts this value into `T`.
    pub fn convert<T: FromValue>(self) -> Result<T, ConversionError> {
        T::from_value(self)
    }

    /// Converts this value to its text representation.
    ///
    /// Booleans render as `"t"`/`"f"`, bytea as hex with a `"\\x"` prefix,
    /// and floats via [`format_float()`].
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => (if *b { "t" } else { "f" }).to_string(),
            Value::Int16(n) => n.to_string(),
            Value::Int32(n) => n.to_string(),
            Value::Int64(n) => n.to_string(),
            Value::Float32(n) => format_float(*n as f64),
            Value::Float64(n) => format_float(*n),
            Value::Text(s) => s.clone(),
            Value::Bytea(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
                format!("\\x{}", hex)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

/// Formats a float value using the canonical special-value spellings.
fn format_float(n: f64) -> String {
    if n.is_infinite() {
        if n.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n.is_nan() {
        "NaN".to_string()
    } else {
        format!("{}", n)
    }
}

macro_rules! impl_from_native {
    ($($native:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$native> for Value {
                fn from(v: $native) -> Self {
                    Value::$variant(v)
                }
            }
        )+
    };
}

impl_from_native! {
    bool => Boolean,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => Text,
    Vec<u8> => Bytea,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a column [`Value`] into a Rust type.
///
/// Integer targets accept any integral source that fits; float targets
/// accept any numeric source. `Option<T>` maps NULL to `None`; every other
/// target rejects NULL with [`ConversionError::UnexpectedNull`].
pub trait FromValue: Sized {
    /// Converts `value` into `Self`.
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($native:ty),+ $(,)?) => {
        $(
            impl FromValue for $native {
                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    const TARGET: &str = stringify!($native);
                    if value.is_null() {
                        return Err(ConversionError::UnexpectedNull { target: TARGET });
                    }
                    let wide = value.as_i64().ok_or_else(|| ConversionError::Incompatible {
                        target: TARGET,
                        found: value.type_name(),
                    })?;
                    <$native>::try_from(wide).map_err(|_| ConversionError::OutOfRange {
                        target: TARGET,
                        value: wide.to_string(),
                    })
                }
            }
        )+
    };
}

impl_from_value_int!(i16, i32, i64, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Err(ConversionError::UnexpectedNull { target: "f64" }),
            other => other.as_f64().ok_or_else(|| ConversionError::Incompatible {
                target: "f64",
                found: other.type_name(),
            }),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|n| n as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Boolean(b) => Ok(b),
            Value::Int16(n) => Ok(n != 0),
            Value::Int32(n) => Ok(n != 0),
            Value::Int64(n) => Ok(n != 0),
            Value::Null => Err(ConversionError::UnexpectedNull { target: "bool" }),
            other => Err(ConversionError::Incompatible {
                target: "bool",
                found: other.type_name(),
            }),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null => Err(ConversionError::UnexpectedNull { target: "String" }),
            Value::Bytea(_) => Err(ConversionError::Incompatible {
                target: "String",
                found: value.type_name(),
            }),
            other => Ok(other.to_text()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytea(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            Value::Null => Err(ConversionError::UnexpectedNull { target: "Vec<u8>" }),
            other => Err(ConversionError::Incompatible {
                target: "Vec<u8>",
                found: other.type_name(),
            }),
        }
    }
}
