#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

mod decode;
mod discriminator;
mod encode;
mod error;
mod options;
mod reader;
mod scalar;
mod scanner;
mod writer;

use std::sync::Arc;

use tessera_core::{Record, TypeDecl};

pub use decode::{Decoder, MAX_DEPTH};
pub use encode::Encoder;
pub use error::{DecodeError, DecodeErrorKind, EncodeError, Error, Result, Span};
pub use options::{CodecOptions, WriterOptions};
pub use reader::{JsonCheckpoint, JsonReader, Token, TokenKind, TokenReader};
pub use scanner::{NumberHint, ScanErrorKind};
pub use writer::{JsonWriter, TokenWriter, WriteError};

/// Decode a JSON document as a record of type `decl`.
///
/// For a discriminated `decl`, the record has the concrete type the
/// discriminator selects.
pub fn from_str(decl: &Arc<TypeDecl>, input: &str, options: &CodecOptions) -> Result<Record> {
    Decoder::new(decl)?.with_options(*options).decode_str(input)
}

/// Encode a record as compact JSON, with the plan of its own type.
pub fn to_string(record: &Record, options: &CodecOptions) -> Result<String> {
    to_string_with(record, options, WriterOptions::default())
}

/// Encode a record as indented JSON, with the plan of its own type.
pub fn to_string_pretty(record: &Record, options: &CodecOptions) -> Result<String> {
    to_string_with(record, options, WriterOptions::default().pretty())
}

fn to_string_with(
    record: &Record,
    options: &CodecOptions,
    writer_options: WriterOptions,
) -> Result<String> {
    let mut writer = JsonWriter::with_options(writer_options);
    encode::encode_record(record, &mut writer, options)?;
    Ok(writer.finish())
}
