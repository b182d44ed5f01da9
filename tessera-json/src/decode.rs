//! Plan-driven decoding: token dispatch into pending field slots.

use std::sync::Arc;

use indexmap::IndexMap;
use tessera_core::{ConfigError, Record, SemanticKind, TypeDecl, Value};
use tessera_plan::{CodecPlan, DecodePlan, PlanCache, ReadSlot, ReadTable};

use crate::reader::{JsonReader, Token, TokenKind, TokenReader};
use crate::scalar::{parse_generic_number, parse_number, parse_text};
use crate::{CodecOptions, DecodeError, DecodeErrorKind, Error, Result, discriminator};

/// Deepest object and array nesting the decoder follows before failing with
/// [`DecodeErrorKind::DepthLimitExceeded`].
pub const MAX_DEPTH: usize = 128;

/// Decodes JSON into [`Record`]s of one declared type.
///
/// # Example
///
/// ```
/// use tessera_core::{FieldDecl, SemanticKind, TypeDecl, Value};
/// use tessera_json::Decoder;
///
/// let point = TypeDecl::builder("Point")
///     .field(FieldDecl::new("X", SemanticKind::I32).rename("x"))
///     .field(FieldDecl::new("Y", SemanticKind::I32).rename("y"))
///     .build();
///
/// let decoder = Decoder::new(&point).unwrap();
/// let p = decoder.decode_str(r#"{"y": 2, "x": 1, "z": [3]}"#).unwrap();
/// assert_eq!(p.get("X"), Some(&Value::I32(1)));
/// assert_eq!(p.get("Y"), Some(&Value::I32(2)));
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    plan: Arc<CodecPlan>,
    options: CodecOptions,
}

impl Decoder {
    /// Plan `decl` (or fetch its cached plan) and build a decoder with default options.
    pub fn new(decl: &Arc<TypeDecl>) -> core::result::Result<Self, ConfigError> {
        Ok(Self {
            plan: PlanCache::global().get_or_plan(decl)?,
            options: CodecOptions::default(),
        })
    }

    /// Replace the codec options.
    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    /// The plan this decoder runs.
    pub fn plan(&self) -> &Arc<CodecPlan> {
        &self.plan
    }

    /// Decode one object from `reader`, leaving the reader after its closing brace.
    pub fn decode<'de, R: TokenReader<'de>>(&self, reader: &mut R) -> Result<Record> {
        decode_with_plan(reader, &self.plan, &self.options, 0)
    }

    /// Decode a complete JSON document.
    pub fn decode_str(&self, input: &str) -> Result<Record> {
        let mut reader = JsonReader::new(input);
        let record = self.decode(&mut reader)?;
        match reader.next_token()? {
            Token::Eof => Ok(record),
            _ => Err(DecodeError::new(DecodeErrorKind::TrailingCharacters, reader.span()).into()),
        }
    }
}

/// Decode one object with `plan`, discriminated or not. `depth` counts the
/// objects and arrays already open around it.
pub(crate) fn decode_with_plan<'de, R: TokenReader<'de>>(
    reader: &mut R,
    plan: &CodecPlan,
    options: &CodecOptions,
    depth: usize,
) -> Result<Record> {
    match plan.decode_plan() {
        DecodePlan::Fields(table) => decode_fields(reader, plan, table, options, depth),
        DecodePlan::Discriminated(disc) => {
            discriminator::decode_discriminated(reader, plan, disc, options, depth)
        }
    }
}

/// One level deeper, or an error once [`MAX_DEPTH`] containers are open.
fn descend<'de, R: TokenReader<'de>>(
    reader: &R,
    depth: usize,
) -> core::result::Result<usize, DecodeError> {
    if depth >= MAX_DEPTH {
        return Err(DecodeError::new(
            DecodeErrorKind::DepthLimitExceeded { limit: MAX_DEPTH },
            reader.span(),
        ));
    }
    Ok(depth + 1)
}

fn decode_fields<'de, R: TokenReader<'de>>(
    reader: &mut R,
    plan: &CodecPlan,
    table: &ReadTable,
    options: &CodecOptions,
    depth: usize,
) -> Result<Record> {
    let depth = descend(reader, depth)?;
    let token = reader.next_token()?;
    if token != Token::ObjectStart {
        return Err(DecodeError::new(
            DecodeErrorKind::ExpectedObjectStart {
                got: token.kind().describe(),
            },
            reader.span(),
        )
        .into());
    }

    let slots = table.slots();
    let mut pending: Vec<Value> = slots.iter().map(|s| s.kind.default_value()).collect();

    loop {
        match reader.next_token()? {
            Token::ObjectEnd => break,
            Token::FieldName(name) => {
                match table.lookup(&name, options.field_name_case_insensitive) {
                    Some(idx) => {
                        trace!(type_name = plan.type_name(), field = %name, "decode: field");
                        pending[idx] = read_slot(reader, &slots[idx], options, depth)?;
                    }
                    None => {
                        trace!(type_name = plan.type_name(), field = %name, "decode: skipping unknown field");
                        reader.skip_value()?;
                    }
                }
            }
            Token::Eof => {
                return Err(
                    DecodeError::new(DecodeErrorKind::MissingClosingToken, reader.span()).into(),
                );
            }
            other => {
                return Err(DecodeError::new(
                    DecodeErrorKind::ExpectedFieldName {
                        got: other.kind().describe(),
                    },
                    reader.span(),
                )
                .into());
            }
        }
    }

    // getter-only fields hold their kind's default
    let mut read = slots.iter().zip(pending);
    let mut fields = IndexMap::with_capacity(plan.descriptor().fields.len());
    for field in &plan.descriptor().fields {
        if field.read_eligible {
            if let Some((slot, value)) = read.next() {
                fields.insert(slot.name.clone(), value);
            }
        } else if field.write_eligible {
            fields.insert(field.name.clone(), field.kind.default_value());
        }
    }
    Ok(Record::from_fields(plan.decl(), fields))
}

/// Consume exactly one value for `slot`.
pub(crate) fn read_slot<'de, R: TokenReader<'de>>(
    reader: &mut R,
    slot: &ReadSlot,
    options: &CodecOptions,
    depth: usize,
) -> Result<Value> {
    let next = reader.peek_kind()?;
    if next == TokenKind::Null && (slot.nullable || slot.kind == SemanticKind::Fallback) {
        reader.next_token()?;
        return Ok(Value::Null);
    }

    match &slot.kind {
        SemanticKind::Object(_) => {
            let nested = match (&slot.nested, next) {
                (Some(nested), TokenKind::ObjectStart) => nested,
                _ => {
                    reader.next_token()?;
                    return Err(mismatch(reader, slot, next.describe().to_owned()));
                }
            };
            decode_with_plan(reader, nested, options, depth).map(Value::Record)
        }
        SemanticKind::Fallback => Ok(read_generic(reader, slot, depth)?),
        kind => {
            let token = reader.next_token()?;
            let value = match (kind, &token) {
                (SemanticKind::String, Token::String(s)) => Some(Value::String(s.to_string())),
                (SemanticKind::Bool, Token::Bool(b)) => Some(Value::Bool(*b)),
                (
                    SemanticKind::DateTime | SemanticKind::DateTimeOffset | SemanticKind::Guid,
                    Token::String(s),
                ) => parse_text(kind, s),
                (_, Token::Number { raw, .. }) if kind.is_numeric() => parse_number(kind, raw),
                (_, Token::Eof) => {
                    return Err(DecodeError::new(
                        DecodeErrorKind::UnexpectedEof { expected: "value" },
                        reader.span(),
                    )
                    .into());
                }
                _ => None,
            };
            value.ok_or_else(|| mismatch(reader, slot, describe_token(&token)))
        }
    }
}

fn mismatch<'de, R: TokenReader<'de>>(reader: &R, slot: &ReadSlot, got: String) -> Error {
    DecodeError::new(
        DecodeErrorKind::KindMismatch {
            field: slot.name.clone(),
            expected: slot.kind.name(),
            got,
        },
        reader.span(),
    )
    .into()
}

fn describe_token(token: &Token<'_>) -> String {
    match token {
        Token::String(s) => format!("string {s:?}"),
        Token::Number { raw, .. } => format!("number {raw}"),
        other => other.kind().describe().to_owned(),
    }
}

/// Decode any JSON value for `slot` into a generic tree.
fn read_generic<'de, R: TokenReader<'de>>(
    reader: &mut R,
    slot: &ReadSlot,
    depth: usize,
) -> core::result::Result<Value, DecodeError> {
    let token = reader.next_token()?;
    let value = match token {
        Token::ObjectStart => {
            let depth = descend(reader, depth)?;
            let mut map = IndexMap::new();
            loop {
                match reader.next_token()? {
                    Token::ObjectEnd => break,
                    Token::FieldName(name) => {
                        let value = read_generic(reader, slot, depth)?;
                        map.insert(name.into_owned(), value);
                    }
                    Token::Eof => {
                        return Err(DecodeError::new(
                            DecodeErrorKind::MissingClosingToken,
                            reader.span(),
                        ));
                    }
                    other => {
                        return Err(DecodeError::new(
                            DecodeErrorKind::ExpectedFieldName {
                                got: other.kind().describe(),
                            },
                            reader.span(),
                        ));
                    }
                }
            }
            Value::Map(map)
        }
        Token::ArrayStart => {
            let depth = descend(reader, depth)?;
            let mut items = Vec::new();
            loop {
                match reader.peek_kind()? {
                    TokenKind::ArrayEnd => {
                        reader.next_token()?;
                        break;
                    }
                    TokenKind::Eof => {
                        reader.next_token()?;
                        return Err(DecodeError::new(
                            DecodeErrorKind::MissingClosingToken,
                            reader.span(),
                        ));
                    }
                    _ => items.push(read_generic(reader, slot, depth)?),
                }
            }
            Value::Array(items)
        }
        Token::String(s) => Value::String(s.into_owned()),
        Token::Number { raw, hint } => parse_generic_number(raw, hint).ok_or_else(|| {
            DecodeError::new(
                DecodeErrorKind::KindMismatch {
                    field: slot.name.clone(),
                    expected: slot.kind.name(),
                    got: format!("number {raw}"),
                },
                reader.span(),
            )
        })?,
        Token::Bool(b) => Value::Bool(b),
        Token::Null => Value::Null,
        Token::Eof => {
            return Err(DecodeError::new(
                DecodeErrorKind::UnexpectedEof { expected: "value" },
                reader.span(),
            ));
        }
        Token::ObjectEnd | Token::ArrayEnd | Token::FieldName(_) => {
            return Err(DecodeError::new(
                DecodeErrorKind::UnexpectedToken {
                    got: token.kind().describe(),
                    expected: "value",
                },
                reader.span(),
            ));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::FieldDecl;

    fn decoder(decl: &Arc<TypeDecl>) -> Decoder {
        Decoder::new(decl).unwrap()
    }

    fn decode_err(decl: &Arc<TypeDecl>, input: &str) -> DecodeErrorKind {
        match decoder(decl).decode_str(input) {
            Err(Error::Decode(e)) => e.kind,
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_keep_their_defaults() {
        let decl = TypeDecl::builder("Defaults")
            .field(FieldDecl::new("Count", SemanticKind::U16))
            .field(FieldDecl::new("Label", SemanticKind::String).nullable())
            .build();
        let rec = decoder(&decl).decode_str("{}").unwrap();
        assert_eq!(rec.get("Count"), Some(&Value::U16(0)));
        assert_eq!(rec.get("Label"), Some(&Value::String(String::new())));
    }

    #[test]
    fn null_needs_a_nullable_field() {
        let decl = TypeDecl::builder("Nulls")
            .field(FieldDecl::new("A", SemanticKind::I32).nullable())
            .field(FieldDecl::new("B", SemanticKind::I32))
            .build();
        let rec = decoder(&decl).decode_str(r#"{"A": null}"#).unwrap();
        assert_eq!(rec.get("A"), Some(&Value::Null));

        assert!(matches!(
            decode_err(&decl, r#"{"B": null}"#),
            DecodeErrorKind::KindMismatch { field, got, .. } if field == "B" && got == "null"
        ));
    }

    #[test]
    fn malformed_input() {
        let decl = TypeDecl::builder("Flag")
            .field(FieldDecl::new("On", SemanticKind::Bool))
            .build();

        assert!(matches!(
            decode_err(&decl, "[]"),
            DecodeErrorKind::ExpectedObjectStart { got: "'['" }
        ));
        assert_eq!(
            decode_err(&decl, r#"{"On": true"#),
            DecodeErrorKind::MissingClosingToken
        );
        assert_eq!(
            decode_err(&decl, r#"{"On": "yes"}"#).code(),
            "json::kind_mismatch"
        );
        assert_eq!(
            decode_err(&decl, r#"{"On": true} 1"#),
            DecodeErrorKind::TrailingCharacters
        );
        assert!(decode_err(&decl, r#"{"On": tru}"#).is_malformed_input());
    }

    #[test]
    fn out_of_range_numbers_are_mismatches() {
        let decl = TypeDecl::builder("Small")
            .field(FieldDecl::new("B", SemanticKind::U8))
            .build();
        assert!(matches!(
            decode_err(&decl, r#"{"B": 300}"#),
            DecodeErrorKind::KindMismatch { got, .. } if got == "number 300"
        ));
    }

    #[test]
    fn infinite_floats_are_mismatches() {
        let decl = TypeDecl::builder("Measure")
            .field(FieldDecl::new("F", SemanticKind::F64))
            .field(FieldDecl::unclassified("X"))
            .build();
        assert!(matches!(
            decode_err(&decl, r#"{"F": 1e400}"#),
            DecodeErrorKind::KindMismatch { field, got, .. }
                if field == "F" && got == "number 1e400"
        ));
        assert!(matches!(
            decode_err(&decl, r#"{"X": [1, -1e400]}"#),
            DecodeErrorKind::KindMismatch { field, expected: "any", .. } if field == "X"
        ));
    }

    #[test]
    fn getter_only_fields_decode_to_defaults() {
        let decl = TypeDecl::builder("Stamped")
            .field(FieldDecl::new("Name", SemanticKind::String))
            .field(FieldDecl::new("Created", SemanticKind::I64).read_only())
            .field(FieldDecl::new("Secret", SemanticKind::String).write_only())
            .build();
        let rec = decoder(&decl)
            .decode_str(r#"{"Name": "n", "Created": 5, "Secret": "s"}"#)
            .unwrap();
        assert_eq!(rec.get("Created"), Some(&Value::I64(0)));
        assert_eq!(rec.get("Secret"), Some(&Value::String("s".into())));
        let names: Vec<_> = rec.fields().map(|(name, _)| name).collect();
        assert_eq!(names, ["Created", "Name", "Secret"]);
    }

    #[test]
    fn nesting_is_bounded() {
        let decl = TypeDecl::builder("Deep")
            .field(FieldDecl::unclassified("X"))
            .build();

        let levels = 200_000;
        let input = format!(r#"{{"X": {}{}}}"#, "[".repeat(levels), "]".repeat(levels));
        assert_eq!(
            decode_err(&decl, &input),
            DecodeErrorKind::DepthLimitExceeded { limit: MAX_DEPTH }
        );

        // the root object is the first level
        let fits = MAX_DEPTH - 1;
        let input = format!(r#"{{"X": {}{}}}"#, "[".repeat(fits), "]".repeat(fits));
        assert!(decoder(&decl).decode_str(&input).is_ok());
        let objects = format!("{}1{}", r#"{"a":"#.repeat(fits + 1), "}".repeat(fits + 1));
        let input = format!(r#"{{"X": {objects}}}"#);
        assert_eq!(
            decode_err(&decl, &input),
            DecodeErrorKind::DepthLimitExceeded { limit: MAX_DEPTH }
        );
    }

    #[test]
    fn fallback_fields_hold_generic_trees() {
        let decl = TypeDecl::builder("Loose")
            .field(FieldDecl::unclassified("Extra"))
            .build();
        let rec = decoder(&decl)
            .decode_str(r#"{"Extra": {"a": [1, -2, 0.5, "s", null, true]}}"#)
            .unwrap();

        let mut inner = IndexMap::new();
        inner.insert(
            "a".to_owned(),
            Value::Array(vec![
                Value::U64(1),
                Value::I64(-2),
                Value::F64(0.5),
                Value::String("s".into()),
                Value::Null,
                Value::Bool(true),
            ]),
        );
        assert_eq!(rec.get("Extra"), Some(&Value::Map(inner)));
    }
}
