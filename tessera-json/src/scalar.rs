//! Textual encodings of scalar kinds.

use std::str::FromStr;

use lexical_parse_float::FromLexical as _;
use lexical_parse_integer::FromLexical as _;
use rust_decimal::Decimal;
use tessera_core::{SemanticKind, Value};
use time::format_description::well_known::iso8601::{Config, EncodedConfig, FormattedComponents};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::NumberHint;

const DATETIME_CONFIG: EncodedConfig = Config::DEFAULT
    .set_formatted_components(FormattedComponents::DateTime)
    .encode();

/// ISO 8601 date and time, no offset.
pub(crate) const DATETIME_FORMAT: Iso8601<DATETIME_CONFIG> = Iso8601::<DATETIME_CONFIG>;

/// Parse a number literal as `kind`. `None` when the literal is not a valid
/// value of that kind, including when it is out of range.
pub(crate) fn parse_number(kind: &SemanticKind, raw: &str) -> Option<Value> {
    let bytes = raw.as_bytes();
    let value = match kind {
        SemanticKind::I8 => Value::I8(i8::from_lexical(bytes).ok()?),
        SemanticKind::I16 => Value::I16(i16::from_lexical(bytes).ok()?),
        SemanticKind::I32 => Value::I32(i32::from_lexical(bytes).ok()?),
        SemanticKind::I64 => Value::I64(i64::from_lexical(bytes).ok()?),
        SemanticKind::U8 => Value::U8(u8::from_lexical(bytes).ok()?),
        SemanticKind::U16 => Value::U16(u16::from_lexical(bytes).ok()?),
        SemanticKind::U32 => Value::U32(u32::from_lexical(bytes).ok()?),
        SemanticKind::U64 => Value::U64(u64::from_lexical(bytes).ok()?),
        SemanticKind::F32 => Value::F32(f32::from_lexical(bytes).ok().filter(|v| v.is_finite())?),
        SemanticKind::F64 => Value::F64(f64::from_lexical(bytes).ok().filter(|v| v.is_finite())?),
        SemanticKind::Decimal => Value::Decimal(
            Decimal::from_str(raw)
                .or_else(|_| Decimal::from_scientific(raw))
                .ok()?,
        ),
        _ => return None,
    };
    Some(value)
}

/// Parse a string literal as one of the string-encoded kinds.
pub(crate) fn parse_text(kind: &SemanticKind, text: &str) -> Option<Value> {
    let value = match kind {
        SemanticKind::DateTime => {
            Value::DateTime(PrimitiveDateTime::parse(text, &Iso8601::PARSING).ok()?)
        }
        SemanticKind::DateTimeOffset => {
            Value::DateTimeOffset(OffsetDateTime::parse(text, &Rfc3339).ok()?)
        }
        SemanticKind::Guid => Value::Guid(Uuid::try_parse(text).ok()?),
        _ => return None,
    };
    Some(value)
}

/// Number of unknown shape, for generic values.
///
/// Non-negative integers become `U64`, negative ones `I64`; anything that does
/// not fit, and every literal with a fraction or exponent, becomes `F64`.
/// Literals beyond the `f64` range are rejected rather than read as infinity.
pub(crate) fn parse_generic_number(raw: &str, hint: NumberHint) -> Option<Value> {
    let bytes = raw.as_bytes();
    let int = match hint {
        NumberHint::Unsigned => u64::from_lexical(bytes).ok().map(Value::U64),
        NumberHint::Signed => i64::from_lexical(bytes).ok().map(Value::I64),
        NumberHint::Float => None,
    };
    int.or_else(|| {
        f64::from_lexical(bytes)
            .ok()
            .filter(|v| v.is_finite())
            .map(Value::F64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn integers_are_range_checked() {
        assert_eq!(parse_number(&SemanticKind::U8, "255"), Some(Value::U8(255)));
        assert_eq!(parse_number(&SemanticKind::U8, "256"), None);
        assert_eq!(parse_number(&SemanticKind::I8, "-128"), Some(Value::I8(-128)));
        assert_eq!(parse_number(&SemanticKind::U32, "-1"), None);
        assert_eq!(parse_number(&SemanticKind::I32, "1.5"), None);
    }

    #[test]
    fn floats_must_stay_finite() {
        assert_eq!(parse_number(&SemanticKind::F64, "1e308"), Some(Value::F64(1e308)));
        assert_eq!(parse_number(&SemanticKind::F64, "1e400"), None);
        assert_eq!(parse_number(&SemanticKind::F64, "-1e400"), None);
        assert_eq!(parse_number(&SemanticKind::F32, "3.4e38"), Some(Value::F32(3.4e38)));
        assert_eq!(parse_number(&SemanticKind::F32, "1e39"), None);
        // underflow rounds to zero, which is still a value
        assert_eq!(parse_number(&SemanticKind::F64, "1e-400"), Some(Value::F64(0.0)));
    }

    #[test]
    fn decimals_accept_exponents() {
        assert_eq!(
            parse_number(&SemanticKind::Decimal, "12.50"),
            Some(Value::Decimal(Decimal::new(1250, 2)))
        );
        assert_eq!(
            parse_number(&SemanticKind::Decimal, "1.5e2"),
            Some(Value::Decimal(Decimal::new(150, 0)))
        );
    }

    #[test]
    fn text_kinds() {
        assert_eq!(
            parse_text(&SemanticKind::DateTime, "2024-02-29T13:45:00"),
            Some(Value::DateTime(datetime!(2024-02-29 13:45)))
        );
        assert_eq!(
            parse_text(&SemanticKind::DateTimeOffset, "2024-02-29T13:45:00+02:00"),
            Some(Value::DateTimeOffset(datetime!(2024-02-29 13:45 +2)))
        );
        assert_eq!(parse_text(&SemanticKind::Guid, "not-a-guid"), None);
        assert_eq!(
            parse_text(&SemanticKind::Guid, "67e55044-10b1-426f-9247-bb680e5fe0c8"),
            Some(Value::Guid(Uuid::from_u128(
                0x67e55044_10b1_426f_9247_bb680e5fe0c8
            )))
        );
    }

    #[test]
    fn generic_numbers() {
        assert_eq!(parse_generic_number("7", NumberHint::Unsigned), Some(Value::U64(7)));
        assert_eq!(parse_generic_number("-7", NumberHint::Signed), Some(Value::I64(-7)));
        assert_eq!(parse_generic_number("0.5", NumberHint::Float), Some(Value::F64(0.5)));
        assert_eq!(
            parse_generic_number("18446744073709551616", NumberHint::Unsigned),
            Some(Value::F64(18446744073709551616.0))
        );
        assert_eq!(parse_generic_number("1e400", NumberHint::Float), None);
        let huge = "9".repeat(400);
        assert_eq!(parse_generic_number(&huge, NumberHint::Unsigned), None);
    }
}
