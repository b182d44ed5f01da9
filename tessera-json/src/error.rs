//! Error types for JSON decoding and encoding.

use core::fmt::{self, Display};

use tessera_core::ConfigError;

use crate::scanner::{ScanError, ScanErrorKind};
use crate::writer::WriteError;

/// Location of a token in the source, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Byte offset from the start of the input.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Span {
    /// Create a new span with the given offset and length.
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// The end offset (offset + len).
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // use half-closed notation
        write!(f, "[{}..{})", self.offset, self.end())
    }
}

/// A decode failure, with the span of the offending token.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    /// The specific kind of error
    pub kind: DecodeErrorKind,
    /// Source span where the error occurred
    pub span: Span,
}

impl DecodeError {
    /// Create a new error with span information
    pub const fn new(kind: DecodeErrorKind, span: Span) -> Self {
        DecodeError { kind, span }
    }

    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.span)
    }
}

impl std::error::Error for DecodeError {}

impl From<ScanError> for DecodeError {
    fn from(err: ScanError) -> Self {
        DecodeError::new(DecodeErrorKind::Scan(err.kind), err.span)
    }
}

/// Specific error kinds for decoding
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeErrorKind {
    /// Tokenizer error
    Scan(ScanErrorKind),
    /// A token that the JSON grammar does not allow here
    UnexpectedToken {
        /// The token that was found
        got: &'static str,
        /// What was expected instead
        expected: &'static str,
    },
    /// An object was expected, something else was found
    ExpectedObjectStart {
        /// The token that was found
        got: &'static str,
    },
    /// Inside an object, something other than a field name or `}` was found
    ExpectedFieldName {
        /// The token that was found
        got: &'static str,
    },
    /// A field value does not match the field's declared kind
    KindMismatch {
        /// Declared name of the field
        field: String,
        /// The declared kind
        expected: &'static str,
        /// What was found
        got: String,
    },
    /// Input ended inside an object or array
    MissingClosingToken,
    /// Input ended where a value was expected
    UnexpectedEof {
        /// What was expected before EOF
        expected: &'static str,
    },
    /// A polymorphic object ended without its discriminator field
    MissingDiscriminator {
        /// Polymorphic type
        type_name: String,
        /// Wire name of the discriminator
        field: String,
    },
    /// The resolver does not know the decoded discriminator value
    UnresolvedDiscriminator {
        /// Polymorphic type
        type_name: String,
        /// The decoded discriminator, debug-formatted
        value: String,
    },
    /// Something follows the root value
    TrailingCharacters,
    /// Objects and arrays nest deeper than the decoder follows
    DepthLimitExceeded {
        /// Maximum nesting depth
        limit: usize,
    },
}

impl Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::Scan(e) => write!(f, "{e}"),
            DecodeErrorKind::UnexpectedToken { got, expected } => {
                write!(f, "unexpected token: got {got}, expected {expected}")
            }
            DecodeErrorKind::ExpectedObjectStart { got } => {
                write!(f, "expected object start, got {got}")
            }
            DecodeErrorKind::ExpectedFieldName { got } => {
                write!(f, "expected field name, got {got}")
            }
            DecodeErrorKind::KindMismatch {
                field,
                expected,
                got,
            } => write!(
                f,
                "field kind mismatch: `{field}` expects {expected}, got {got}"
            ),
            DecodeErrorKind::MissingClosingToken => f.write_str("missing closing token"),
            DecodeErrorKind::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            DecodeErrorKind::MissingDiscriminator { type_name, field } => write!(
                f,
                "object of type `{type_name}` has no discriminator field `{field}`"
            ),
            DecodeErrorKind::UnresolvedDiscriminator { type_name, value } => write!(
                f,
                "discriminator value {value} does not select a subtype of `{type_name}`"
            ),
            DecodeErrorKind::TrailingCharacters => f.write_str("trailing characters after value"),
            DecodeErrorKind::DepthLimitExceeded { limit } => {
                write!(f, "nesting deeper than {limit} levels")
            }
        }
    }
}

impl DecodeErrorKind {
    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            DecodeErrorKind::Scan(_) => "json::scan",
            DecodeErrorKind::UnexpectedToken { .. } => "json::unexpected_token",
            DecodeErrorKind::ExpectedObjectStart { .. } => "json::expected_object_start",
            DecodeErrorKind::ExpectedFieldName { .. } => "json::expected_field_name",
            DecodeErrorKind::KindMismatch { .. } => "json::kind_mismatch",
            DecodeErrorKind::MissingClosingToken => "json::missing_closing_token",
            DecodeErrorKind::UnexpectedEof { .. } => "json::unexpected_eof",
            DecodeErrorKind::MissingDiscriminator { .. } => "json::missing_discriminator",
            DecodeErrorKind::UnresolvedDiscriminator { .. } => "json::unresolved_discriminator",
            DecodeErrorKind::TrailingCharacters => "json::trailing_characters",
            DecodeErrorKind::DepthLimitExceeded { .. } => "json::depth_limit_exceeded",
        }
    }

    /// Whether this is one of the malformed-input errors, as opposed to a
    /// discriminator failure.
    pub const fn is_malformed_input(&self) -> bool {
        !matches!(
            self,
            DecodeErrorKind::MissingDiscriminator { .. }
                | DecodeErrorKind::UnresolvedDiscriminator { .. }
        )
    }
}

/// An encode failure.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A record holds a value of the wrong shape for its field.
    KindMismatch {
        /// Type being encoded
        type_name: String,
        /// Declared name of the field
        field: String,
        /// The declared kind
        expected: &'static str,
        /// What the record holds
        got: &'static str,
    },
    /// A date could not be rendered in its textual encoding.
    Format {
        /// Declared name of the field
        field: String,
        /// What the formatter reported
        message: String,
    },
    /// The token writer refused a call.
    Writer(WriteError),
    /// A nested record's type could not be planned.
    Config(ConfigError),
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::KindMismatch {
                type_name,
                field,
                expected,
                got,
            } => write!(
                f,
                "field `{field}` of `{type_name}` expects {expected}, record holds {got}"
            ),
            EncodeError::Format { field, message } => {
                write!(f, "cannot format field `{field}`: {message}")
            }
            EncodeError::Writer(e) => write!(f, "writer error: {e}"),
            EncodeError::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Writer(e) => Some(e),
            EncodeError::Config(e) => Some(e),
            EncodeError::KindMismatch { .. } | EncodeError::Format { .. } => None,
        }
    }
}

impl EncodeError {
    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            EncodeError::KindMismatch { .. } => "json::encode_kind_mismatch",
            EncodeError::Format { .. } => "json::format",
            EncodeError::Writer(_) => "json::writer",
            EncodeError::Config(e) => e.code(),
        }
    }
}

impl From<WriteError> for EncodeError {
    fn from(err: WriteError) -> Self {
        EncodeError::Writer(err)
    }
}

impl From<ConfigError> for EncodeError {
    fn from(err: ConfigError) -> Self {
        EncodeError::Config(err)
    }
}

/// Any failure of the JSON entry points.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The type declaration cannot be planned.
    Config(ConfigError),
    /// The input could not be decoded.
    Decode(DecodeError),
    /// The value could not be encoded.
    Encode(EncodeError),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "{e}"),
            Error::Decode(e) => write!(f, "{e}"),
            Error::Encode(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Decode(e) => Some(e),
            Error::Encode(e) => Some(e),
        }
    }
}

impl Error {
    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            Error::Config(e) => e.code(),
            Error::Decode(e) => e.code(),
            Error::Encode(e) => e.code(),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::Decode(err)
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        // surface plan failures of nested types as configuration errors
        match err {
            EncodeError::Config(e) => Error::Config(e),
            other => Error::Encode(other),
        }
    }
}

/// Result type for JSON decoding
pub type Result<T, E = Error> = core::result::Result<T, E>;
