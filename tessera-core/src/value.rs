//! In-memory values produced by decoders and consumed by encoders.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::TypeDecl;

/// A decoded value.
///
/// There is one variant per [`SemanticKind`](crate::SemanticKind), plus
/// `Array` and `Map` for the generic trees that fallback fields hold.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// String
    String(String),
    /// i8
    I8(i8),
    /// i16
    I16(i16),
    /// i32
    I32(i32),
    /// i64
    I64(i64),
    /// u8
    U8(u8),
    /// u16
    U16(u16),
    /// u32
    U32(u32),
    /// u64
    U64(u64),
    /// f32
    F32(f32),
    /// f64
    F64(f64),
    /// Decimal
    Decimal(Decimal),
    /// Date and time without offset
    DateTime(PrimitiveDateTime),
    /// Date and time with offset
    DateTimeOffset(OffsetDateTime),
    /// UUID
    Guid(Uuid),
    /// An object of a declared type
    Record(Record),
    /// A generic array
    Array(Vec<Value>),
    /// A generic object
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::DateTime(_) => "datetime",
            Value::DateTimeOffset(_) => "datetime-offset",
            Value::Guid(_) => "guid",
            Value::Record(_) => "object",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Borrow a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get a boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer variant, if it fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::I64(v) => Some(v),
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Any integer variant, if it fits in a `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => Some(v),
            Value::I8(v) => u64::try_from(v).ok(),
            Value::I16(v) => u64::try_from(v).ok(),
            Value::I32(v) => u64::try_from(v).ok(),
            Value::I64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Any float variant, widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v.into()),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow a record.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    String => String,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    PrimitiveDateTime => DateTime,
    OffsetDateTime => DateTimeOffset,
    Uuid => Guid,
    Record => Record,
    Vec<Value> => Array,
    IndexMap<String, Value> => Map,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// An object of a declared type: the type it was built as, plus its field
/// values keyed by declared field name.
///
/// Equality compares the type identity and the field values, independent of
/// the order fields were set in.
#[derive(Clone)]
pub struct Record {
    ty: Arc<TypeDecl>,
    fields: IndexMap<String, Value>,
}

impl Record {
    /// An empty record of type `ty`.
    pub fn new(ty: &Arc<TypeDecl>) -> Self {
        Record {
            ty: Arc::clone(ty),
            fields: IndexMap::new(),
        }
    }

    /// Build from a type and prepared field values.
    pub fn from_fields(ty: &Arc<TypeDecl>, fields: IndexMap<String, Value>) -> Self {
        Record {
            ty: Arc::clone(ty),
            fields,
        }
    }

    /// Set a field and return the record, for chained construction.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Get a field by declared name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The record's concrete type.
    pub fn ty(&self) -> &Arc<TypeDecl> {
        &self.ty
    }

    /// Name of the record's concrete type.
    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    /// Fields in the order they were set.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields set.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ty.id() == other.ty.id() && self.fields == other.fields
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.type_name());
        for (name, value) in &self.fields {
            s.field(name, value);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_equality_ignores_insertion_order() {
        let ty = TypeDecl::builder("Pair").build();
        let a = Record::new(&ty).with("x", 1).with("y", "two");
        let b = Record::new(&ty).with("y", "two").with("x", 1);
        assert_eq!(a, b);

        let other = TypeDecl::builder("Pair").build();
        assert_ne!(a, Record::new(&other).with("x", 1).with("y", "two"));
    }

    #[test]
    fn integer_views_respect_range() {
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::I8(-1).as_u64(), None);
        assert_eq!(Value::U16(7).as_i64(), Some(7));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }
}
