//! Plan-driven encoding: ordered write steps with skip guards.

use std::sync::Arc;

use indexmap::IndexMap;
use tessera_core::{ConfigError, Record, SemanticKind, TypeDecl, Value};
use tessera_plan::{CodecPlan, PlanCache, WriteStep};
use time::format_description::well_known::Rfc3339;

use crate::scalar::DATETIME_FORMAT;
use crate::writer::{JsonWriter, TokenWriter};
use crate::{CodecOptions, EncodeError, WriterOptions};

/// Encodes [`Record`]s of one declared type.
///
/// Fields are written in planned order, whatever order the record holds them
/// in. A field the record does not hold is written as null.
///
/// # Example
///
/// ```
/// use tessera_core::{FieldDecl, Record, SemanticKind, TypeDecl};
/// use tessera_json::Encoder;
///
/// let point = TypeDecl::builder("Point")
///     .field(FieldDecl::new("X", SemanticKind::I32).rename("x"))
///     .field(FieldDecl::new("Y", SemanticKind::I32).rename("y"))
///     .build();
///
/// let p = Record::new(&point).with("Y", 2i32).with("X", 1i32);
/// let json = Encoder::new(&point).unwrap().to_string(&p).unwrap();
/// assert_eq!(json, r#"{"x":1,"y":2}"#);
/// ```
#[derive(Debug, Clone)]
pub struct Encoder {
    plan: Arc<CodecPlan>,
    options: CodecOptions,
    writer_options: WriterOptions,
}

impl Encoder {
    /// Plan `decl` (or fetch its cached plan) and build an encoder with
    /// default options.
    ///
    /// Fails with [`ConfigError::AbstractEncode`] for discriminated types.
    pub fn new(decl: &Arc<TypeDecl>) -> Result<Self, ConfigError> {
        let plan = PlanCache::global().get_or_plan(decl)?;
        plan.encode_plan()?;
        Ok(Self {
            plan,
            options: CodecOptions::default(),
            writer_options: WriterOptions::default(),
        })
    }

    /// Replace the codec options.
    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the output formatting used by [`Encoder::to_string`].
    pub fn with_writer_options(mut self, writer_options: WriterOptions) -> Self {
        self.writer_options = writer_options;
        self
    }

    /// The plan this encoder runs.
    pub fn plan(&self) -> &Arc<CodecPlan> {
        &self.plan
    }

    /// Write `record` as one object.
    pub fn encode<W: TokenWriter>(&self, record: &Record, writer: &mut W) -> Result<(), EncodeError> {
        encode_with_plan(&self.plan, record, writer, &self.options)
    }

    /// Encode `record` into a new string.
    pub fn to_string(&self, record: &Record) -> Result<String, EncodeError> {
        let mut writer = JsonWriter::with_options(self.writer_options);
        self.encode(record, &mut writer)?;
        Ok(writer.finish())
    }
}

/// Encode `record` with its own type's plan.
pub(crate) fn encode_record<W: TokenWriter>(
    record: &Record,
    writer: &mut W,
    options: &CodecOptions,
) -> Result<(), EncodeError> {
    let plan = PlanCache::global().get_or_plan(record.ty())?;
    encode_with_plan(&plan, record, writer, options)
}

fn encode_with_plan<W: TokenWriter>(
    plan: &CodecPlan,
    record: &Record,
    writer: &mut W,
    options: &CodecOptions,
) -> Result<(), EncodeError> {
    let steps = plan.encode_plan()?;
    trace!(type_name = plan.type_name(), steps = steps.len(), "encode: object");

    writer.begin_object()?;
    for step in steps {
        if step.read_only && options.ignore_read_only_properties {
            continue;
        }
        if let Some(predicate) = &step.should_serialize
            && !predicate.evaluate(record)
        {
            trace!(field = %step.name, predicate = predicate.name(), "encode: predicate skipped field");
            continue;
        }
        let value = record.get(&step.name).unwrap_or(&Value::Null);
        if step.nullable && options.ignore_null_values && value.is_null() {
            continue;
        }

        writer.field_name(&step.wire_name)?;
        write_field(plan, step, value, writer, options)?;
    }
    writer.end_object()?;
    Ok(())
}

fn write_field<W: TokenWriter>(
    plan: &CodecPlan,
    step: &WriteStep,
    value: &Value,
    writer: &mut W,
    options: &CodecOptions,
) -> Result<(), EncodeError> {
    let mismatch = || EncodeError::KindMismatch {
        type_name: plan.type_name().to_owned(),
        field: step.name.clone(),
        expected: step.kind.name(),
        got: value.kind_name(),
    };

    if value.is_null() {
        if step.nullable || step.kind == SemanticKind::Fallback {
            writer.null()?;
            return Ok(());
        }
        return Err(mismatch());
    }
    if !step.kind.accepts(value) {
        return Err(mismatch());
    }

    match (&step.kind, value) {
        (SemanticKind::Object(declared), Value::Record(nested)) => {
            // polymorphic fields hold a concrete subtype of the declared type
            if !nested.ty().is_subtype_of(declared) {
                return Err(mismatch());
            }
            match &step.nested {
                Some(nested_plan) if nested_plan.decl().id() == nested.ty().id() => {
                    encode_with_plan(nested_plan, nested, writer, options)
                }
                _ => encode_record(nested, writer, options),
            }
        }
        _ => write_value(&step.name, value, writer, options),
    }
}

/// Write a value in its natural encoding.
pub(crate) fn write_value<W: TokenWriter>(
    field: &str,
    value: &Value,
    writer: &mut W,
    options: &CodecOptions,
) -> Result<(), EncodeError> {
    let format_error = |e: time::error::Format| EncodeError::Format {
        field: field.to_owned(),
        message: e.to_string(),
    };

    match value {
        Value::Null => writer.null()?,
        Value::Bool(b) => writer.boolean(*b)?,
        Value::String(s) => writer.string(s)?,
        Value::I8(n) => writer.number(itoa::Buffer::new().format(*n))?,
        Value::I16(n) => writer.number(itoa::Buffer::new().format(*n))?,
        Value::I32(n) => writer.number(itoa::Buffer::new().format(*n))?,
        Value::I64(n) => writer.number(itoa::Buffer::new().format(*n))?,
        Value::U8(n) => writer.number(itoa::Buffer::new().format(*n))?,
        Value::U16(n) => writer.number(itoa::Buffer::new().format(*n))?,
        Value::U32(n) => writer.number(itoa::Buffer::new().format(*n))?,
        Value::U64(n) => writer.number(itoa::Buffer::new().format(*n))?,
        Value::F32(n) if n.is_finite() => writer.number(ryu::Buffer::new().format_finite(*n))?,
        Value::F64(n) if n.is_finite() => writer.number(ryu::Buffer::new().format_finite(*n))?,
        // JSON has no literal for NaN or the infinities
        Value::F32(_) | Value::F64(_) => writer.null()?,
        Value::Decimal(d) => writer.number(&d.to_string())?,
        Value::DateTime(dt) => writer.string(&dt.format(&DATETIME_FORMAT).map_err(format_error)?)?,
        Value::DateTimeOffset(dt) => writer.string(&dt.format(&Rfc3339).map_err(format_error)?)?,
        Value::Guid(g) => writer.string(g.hyphenated().encode_lower(&mut uuid::Uuid::encode_buffer()))?,
        Value::Record(record) => encode_record(record, writer, options)?,
        Value::Array(items) => {
            writer.begin_array()?;
            for item in items {
                write_value(field, item, writer, options)?;
            }
            writer.end_array()?;
        }
        Value::Map(map) => write_map(field, map, writer, options)?,
    }
    Ok(())
}

fn write_map<W: TokenWriter>(
    field: &str,
    map: &IndexMap<String, Value>,
    writer: &mut W,
    options: &CodecOptions,
) -> Result<(), EncodeError> {
    writer.begin_object()?;
    for (key, value) in map {
        writer.field_name(key)?;
        write_value(field, value, writer, options)?;
    }
    writer.end_object()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::FieldDecl;

    #[test]
    fn missing_fields_encode_as_null() {
        let decl = TypeDecl::builder("Sparse")
            .field(FieldDecl::new("A", SemanticKind::I32).nullable())
            .field(FieldDecl::new("B", SemanticKind::String).nullable())
            .build();
        let rec = Record::new(&decl).with("B", "b");
        let json = Encoder::new(&decl).unwrap().to_string(&rec).unwrap();
        assert_eq!(json, r#"{"A":null,"B":"b"}"#);
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        let decl = TypeDecl::builder("Strict")
            .field(FieldDecl::new("N", SemanticKind::I32))
            .build();
        let encoder = Encoder::new(&decl).unwrap();

        let err = encoder
            .to_string(&Record::new(&decl).with("N", "seven"))
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::KindMismatch {
                type_name: "Strict".into(),
                field: "N".into(),
                expected: "i32",
                got: "string",
            }
        );

        // absent and non-nullable
        assert_eq!(
            encoder.to_string(&Record::new(&decl)).unwrap_err().code(),
            "json::encode_kind_mismatch"
        );
    }

    #[test]
    fn non_finite_floats_become_null() {
        let decl = TypeDecl::builder("Floats")
            .field(FieldDecl::new("A", SemanticKind::F64))
            .field(FieldDecl::new("B", SemanticKind::F32))
            .build();
        let rec = Record::new(&decl)
            .with("A", f64::NAN)
            .with("B", 1.5f32);
        let json = Encoder::new(&decl).unwrap().to_string(&rec).unwrap();
        assert_eq!(json, r#"{"A":null,"B":1.5}"#);
    }

    #[test]
    fn foreign_nested_records_are_rejected() {
        let inner = TypeDecl::builder("Inner").build();
        let other = TypeDecl::builder("Other").build();
        let outer = TypeDecl::builder("Outer")
            .field(FieldDecl::new("In", SemanticKind::Object(inner)))
            .build();
        let rec = Record::new(&outer).with("In", Record::new(&other));
        assert!(matches!(
            Encoder::new(&outer).unwrap().to_string(&rec),
            Err(EncodeError::KindMismatch { field, .. }) if field == "In"
        ));
    }
}
