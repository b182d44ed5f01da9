use core::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use time::macros::datetime;
use uuid::Uuid;

use crate::{TypeDecl, Value};

/// The semantic kind of a field: what a codec has to do to read or write it.
///
/// This is a closed set. Both synthesizers match on it exhaustively, so adding
/// a kind is a compile error everywhere it needs handling.
#[derive(Clone)]
pub enum SemanticKind {
    /// UTF-8 string
    String,
    /// `true` / `false`
    Bool,
    /// Signed 8-bit integer
    I8,
    /// Signed 16-bit integer
    I16,
    /// Signed 32-bit integer
    I32,
    /// Signed 64-bit integer
    I64,
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// Unsigned 64-bit integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Arbitrary-precision decimal, written as a number literal
    Decimal,
    /// Date and time without offset, written as an ISO 8601 string
    DateTime,
    /// Date and time with a UTC offset, written as an RFC 3339 string
    DateTimeOffset,
    /// UUID, written as a hyphenated string
    Guid,
    /// A nested object described by its own declaration
    Object(Arc<TypeDecl>),
    /// The description source could not classify the field; any JSON value
    /// is accepted and kept as a generic value tree.
    Fallback,
}

impl SemanticKind {
    /// Short lowercase name, used in error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            SemanticKind::String => "string",
            SemanticKind::Bool => "boolean",
            SemanticKind::I8 => "i8",
            SemanticKind::I16 => "i16",
            SemanticKind::I32 => "i32",
            SemanticKind::I64 => "i64",
            SemanticKind::U8 => "u8",
            SemanticKind::U16 => "u16",
            SemanticKind::U32 => "u32",
            SemanticKind::U64 => "u64",
            SemanticKind::F32 => "f32",
            SemanticKind::F64 => "f64",
            SemanticKind::Decimal => "decimal",
            SemanticKind::DateTime => "datetime",
            SemanticKind::DateTimeOffset => "datetime-offset",
            SemanticKind::Guid => "guid",
            SemanticKind::Object(_) => "object",
            SemanticKind::Fallback => "any",
        }
    }

    /// Returns true for kinds written as JSON number literals.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            SemanticKind::I8
                | SemanticKind::I16
                | SemanticKind::I32
                | SemanticKind::I64
                | SemanticKind::U8
                | SemanticKind::U16
                | SemanticKind::U32
                | SemanticKind::U64
                | SemanticKind::F32
                | SemanticKind::F64
                | SemanticKind::Decimal
        )
    }

    /// The nested declaration, for [`SemanticKind::Object`].
    pub fn object_decl(&self) -> Option<&Arc<TypeDecl>> {
        match self {
            SemanticKind::Object(decl) => Some(decl),
            _ => None,
        }
    }

    /// The value a pending decode slot starts out with.
    ///
    /// Nested objects and fallback fields start out null; every scalar kind
    /// starts at its zero value (`0001-01-01T00:00` for date kinds).
    pub fn default_value(&self) -> Value {
        match self {
            SemanticKind::String => Value::String(String::new()),
            SemanticKind::Bool => Value::Bool(false),
            SemanticKind::I8 => Value::I8(0),
            SemanticKind::I16 => Value::I16(0),
            SemanticKind::I32 => Value::I32(0),
            SemanticKind::I64 => Value::I64(0),
            SemanticKind::U8 => Value::U8(0),
            SemanticKind::U16 => Value::U16(0),
            SemanticKind::U32 => Value::U32(0),
            SemanticKind::U64 => Value::U64(0),
            SemanticKind::F32 => Value::F32(0.0),
            SemanticKind::F64 => Value::F64(0.0),
            SemanticKind::Decimal => Value::Decimal(Decimal::ZERO),
            SemanticKind::DateTime => Value::DateTime(datetime!(0001-01-01 0:00)),
            SemanticKind::DateTimeOffset => Value::DateTimeOffset(datetime!(0001-01-01 0:00 UTC)),
            SemanticKind::Guid => Value::Guid(Uuid::nil()),
            SemanticKind::Object(_) | SemanticKind::Fallback => Value::Null,
        }
    }

    /// Whether a non-null value has the in-memory shape this kind encodes.
    ///
    /// Object fields accept any record: polymorphic fields hold a concrete
    /// subtype of the declared type.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (SemanticKind::String, Value::String(_))
                | (SemanticKind::Bool, Value::Bool(_))
                | (SemanticKind::I8, Value::I8(_))
                | (SemanticKind::I16, Value::I16(_))
                | (SemanticKind::I32, Value::I32(_))
                | (SemanticKind::I64, Value::I64(_))
                | (SemanticKind::U8, Value::U8(_))
                | (SemanticKind::U16, Value::U16(_))
                | (SemanticKind::U32, Value::U32(_))
                | (SemanticKind::U64, Value::U64(_))
                | (SemanticKind::F32, Value::F32(_))
                | (SemanticKind::F64, Value::F64(_))
                | (SemanticKind::Decimal, Value::Decimal(_))
                | (SemanticKind::DateTime, Value::DateTime(_))
                | (SemanticKind::DateTimeOffset, Value::DateTimeOffset(_))
                | (SemanticKind::Guid, Value::Guid(_))
                | (SemanticKind::Object(_), Value::Record(_))
                | (SemanticKind::Fallback, _)
        )
    }
}

impl PartialEq for SemanticKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SemanticKind::Object(a), SemanticKind::Object(b)) => a.id() == b.id(),
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl fmt::Debug for SemanticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticKind::Object(decl) => write!(f, "Object({})", decl.name()),
            other => f.write_str(other.name()),
        }
    }
}

impl fmt::Display for SemanticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_their_kind() {
        let kinds = [
            SemanticKind::String,
            SemanticKind::Bool,
            SemanticKind::I8,
            SemanticKind::U64,
            SemanticKind::F32,
            SemanticKind::Decimal,
            SemanticKind::DateTime,
            SemanticKind::DateTimeOffset,
            SemanticKind::Guid,
        ];
        for kind in kinds {
            assert!(kind.accepts(&kind.default_value()), "{kind}");
        }
        assert!(SemanticKind::Fallback.default_value().is_null());
    }

    #[test]
    fn integers_do_not_widen() {
        assert!(!SemanticKind::I64.accepts(&Value::I32(1)));
        assert!(SemanticKind::Fallback.accepts(&Value::I32(1)));
    }
}
