//! Token reader: a JSON pull parser with checkpoint/restore.

use std::borrow::Cow;

use crate::scanner::{NumberHint, RawToken, Scanner, SpannedToken};
use crate::{DecodeError, DecodeErrorKind, Span};

/// One unit of the token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'de> {
    /// `{`
    ObjectStart,
    /// `}`
    ObjectEnd,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// A key inside an object (the colon is consumed with it)
    FieldName(Cow<'de, str>),
    /// A string value
    String(Cow<'de, str>),
    /// A number value, as written
    Number {
        /// The literal text
        raw: &'de str,
        /// Shape of the literal
        hint: NumberHint,
    },
    /// `true` or `false`
    Bool(bool),
    /// `null`
    Null,
    /// End of input
    Eof,
}

/// The kind of a [`Token`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `{`
    ObjectStart,
    /// `}`
    ObjectEnd,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// Object key
    FieldName,
    /// String value
    String,
    /// Number value
    Number,
    /// Boolean value
    Bool,
    /// `null`
    Null,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Human-readable name, for error messages.
    pub const fn describe(self) -> &'static str {
        match self {
            TokenKind::ObjectStart => "'{'",
            TokenKind::ObjectEnd => "'}'",
            TokenKind::ArrayStart => "'['",
            TokenKind::ArrayEnd => "']'",
            TokenKind::FieldName => "field name",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Bool => "boolean",
            TokenKind::Null => "null",
            TokenKind::Eof => "end of input",
        }
    }
}

impl Token<'_> {
    /// The kind of this token.
    pub const fn kind(&self) -> TokenKind {
        match self {
            Token::ObjectStart => TokenKind::ObjectStart,
            Token::ObjectEnd => TokenKind::ObjectEnd,
            Token::ArrayStart => TokenKind::ArrayStart,
            Token::ArrayEnd => TokenKind::ArrayEnd,
            Token::FieldName(_) => TokenKind::FieldName,
            Token::String(_) => TokenKind::String,
            Token::Number { .. } => TokenKind::Number,
            Token::Bool(_) => TokenKind::Bool,
            Token::Null => TokenKind::Null,
            Token::Eof => TokenKind::Eof,
        }
    }
}

/// A source of tokens the decoder pulls from.
///
/// Readers report end of input as [`Token::Eof`] wherever it happens; the
/// caller decides whether that is an error.
pub trait TokenReader<'de> {
    /// Saved reader state.
    type Checkpoint: Clone;

    /// Consume the next token.
    fn next_token(&mut self) -> Result<Token<'de>, DecodeError>;

    /// Look at the kind of the next token without consuming it.
    fn peek_kind(&mut self) -> Result<TokenKind, DecodeError>;

    /// Consume one complete value, however deeply nested.
    fn skip_value(&mut self) -> Result<(), DecodeError>;

    /// Save the current position.
    fn checkpoint(&self) -> Self::Checkpoint;

    /// Rewind to a saved position; tokens after it are produced again.
    fn restore(&mut self, checkpoint: Self::Checkpoint);

    /// Span of the most recently consumed token.
    fn span(&self) -> Span;
}

#[derive(Debug, Clone, Copy)]
enum ContextState {
    Object(ObjectState),
    Array(ArrayState),
}

#[derive(Debug, Clone, Copy)]
enum ObjectState {
    KeyOrEnd,
    /// After a comma: `}` is not allowed.
    Key,
    Value,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy)]
enum ArrayState {
    ValueOrEnd,
    /// After a comma: `]` is not allowed.
    Value,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextAction {
    ObjectKey { allow_end: bool },
    ObjectValue,
    ObjectComma,
    ArrayValue { allow_end: bool },
    ArrayComma,
    RootValue,
    RootFinished,
}

/// Mutable reader state that can be saved and restored.
#[derive(Debug, Clone)]
struct ReaderState<'de> {
    scanner: Scanner,
    /// Stack tracking nested containers.
    stack: Vec<ContextState>,
    /// Token produced by `peek_kind`, not yet handed out.
    peeked: Option<(Token<'de>, Span)>,
    /// Whether the root value has started.
    root_started: bool,
    /// Whether the root value has fully completed.
    root_complete: bool,
    last_span: Span,
}

/// Saved [`JsonReader`] position.
#[derive(Debug, Clone)]
pub struct JsonCheckpoint<'de>(ReaderState<'de>);

/// JSON token reader over a complete input string.
///
/// Commas and colons are validated and swallowed; object keys come out as
/// [`Token::FieldName`]. Anything but whitespace after the root value is a
/// [`DecodeErrorKind::TrailingCharacters`] error.
#[derive(Debug, Clone)]
pub struct JsonReader<'de> {
    input: &'de str,
    state: ReaderState<'de>,
}

impl<'de> JsonReader<'de> {
    /// Create a reader positioned before the root value.
    pub fn new(input: &'de str) -> Self {
        Self {
            input,
            state: ReaderState {
                scanner: Scanner::new(),
                stack: Vec::new(),
                peeked: None,
                root_started: false,
                root_complete: false,
                last_span: Span::default(),
            },
        }
    }

    /// The whole input.
    pub fn input(&self) -> &'de str {
        self.input
    }

    fn consume_token(&mut self) -> Result<SpannedToken, DecodeError> {
        Ok(self.state.scanner.next_token(self.input.as_bytes())?)
    }

    fn expect_colon(&mut self) -> Result<(), DecodeError> {
        let token = self.consume_token()?;
        match token.token {
            RawToken::Colon => Ok(()),
            RawToken::Eof => Err(DecodeError::new(
                DecodeErrorKind::MissingClosingToken,
                token.span,
            )),
            _ => Err(unexpected(&token, "':'")),
        }
    }

    fn parse_value_start(&mut self, token: SpannedToken) -> Result<(Token<'de>, Span), DecodeError> {
        self.state.root_started = true;

        let span = token.span;
        let out = match token.token {
            RawToken::ObjectStart => {
                self.state
                    .stack
                    .push(ContextState::Object(ObjectState::KeyOrEnd));
                return Ok((Token::ObjectStart, span));
            }
            RawToken::ArrayStart => {
                self.state
                    .stack
                    .push(ContextState::Array(ArrayState::ValueOrEnd));
                return Ok((Token::ArrayStart, span));
            }
            RawToken::String {
                start,
                end,
                has_escapes,
            } => Token::String(crate::scanner::decode_string(
                self.input,
                start,
                end,
                has_escapes,
            )?),
            RawToken::Number { start, end, hint } => Token::Number {
                raw: self.number_text(start, end, span)?,
                hint,
            },
            RawToken::True => Token::Bool(true),
            RawToken::False => Token::Bool(false),
            RawToken::Null => Token::Null,
            RawToken::Eof => return Ok((Token::Eof, span)),
            RawToken::ObjectEnd | RawToken::ArrayEnd | RawToken::Comma | RawToken::Colon => {
                return Err(unexpected(&token, "value"));
            }
        };
        self.finish_value_in_parent();
        Ok((out, span))
    }

    fn number_text(&self, start: usize, end: usize, span: Span) -> Result<&'de str, DecodeError> {
        self.input.get(start..end).ok_or(DecodeError::new(
            DecodeErrorKind::Scan(crate::ScanErrorKind::InvalidUtf8),
            span,
        ))
    }

    fn finish_value_in_parent(&mut self) {
        if let Some(context) = self.state.stack.last_mut() {
            match context {
                ContextState::Object(state) => *state = ObjectState::CommaOrEnd,
                ContextState::Array(state) => *state = ArrayState::CommaOrEnd,
            }
        } else if self.state.root_started {
            self.state.root_complete = true;
        }
    }

    fn close_container(&mut self, token: Token<'de>, span: Span) -> (Token<'de>, Span) {
        self.state.stack.pop();
        self.finish_value_in_parent();
        (token, span)
    }

    fn determine_action(&self) -> NextAction {
        if let Some(context) = self.state.stack.last() {
            match context {
                ContextState::Object(state) => match state {
                    ObjectState::KeyOrEnd => NextAction::ObjectKey { allow_end: true },
                    ObjectState::Key => NextAction::ObjectKey { allow_end: false },
                    ObjectState::Value => NextAction::ObjectValue,
                    ObjectState::CommaOrEnd => NextAction::ObjectComma,
                },
                ContextState::Array(state) => match state {
                    ArrayState::ValueOrEnd => NextAction::ArrayValue { allow_end: true },
                    ArrayState::Value => NextAction::ArrayValue { allow_end: false },
                    ArrayState::CommaOrEnd => NextAction::ArrayComma,
                },
            }
        } else if self.state.root_complete {
            NextAction::RootFinished
        } else {
            NextAction::RootValue
        }
    }

    fn produce(&mut self) -> Result<(Token<'de>, Span), DecodeError> {
        loop {
            match self.determine_action() {
                NextAction::ObjectKey { allow_end } => {
                    let token = self.consume_token()?;
                    let span = token.span;
                    match token.token {
                        RawToken::ObjectEnd if allow_end => {
                            return Ok(self.close_container(Token::ObjectEnd, span));
                        }
                        RawToken::String {
                            start,
                            end,
                            has_escapes,
                        } => {
                            let name = crate::scanner::decode_string(
                                self.input,
                                start,
                                end,
                                has_escapes,
                            )?;
                            self.expect_colon()?;
                            if let Some(ContextState::Object(state)) = self.state.stack.last_mut() {
                                *state = ObjectState::Value;
                            }
                            return Ok((Token::FieldName(name), span));
                        }
                        RawToken::Eof => return Ok((Token::Eof, span)),
                        _ if allow_end => return Err(unexpected(&token, "field name or '}'")),
                        _ => return Err(unexpected(&token, "field name")),
                    }
                }
                NextAction::ObjectValue | NextAction::RootValue => {
                    let token = self.consume_token()?;
                    return self.parse_value_start(token);
                }
                NextAction::ObjectComma => {
                    let token = self.consume_token()?;
                    let span = token.span;
                    match token.token {
                        RawToken::Comma => {
                            if let Some(ContextState::Object(state)) = self.state.stack.last_mut() {
                                *state = ObjectState::Key;
                            }
                            continue;
                        }
                        RawToken::ObjectEnd => return Ok(self.close_container(Token::ObjectEnd, span)),
                        RawToken::Eof => return Ok((Token::Eof, span)),
                        _ => return Err(unexpected(&token, "',' or '}'")),
                    }
                }
                NextAction::ArrayValue { allow_end } => {
                    let token = self.consume_token()?;
                    let span = token.span;
                    match token.token {
                        RawToken::ArrayEnd if allow_end => {
                            return Ok(self.close_container(Token::ArrayEnd, span));
                        }
                        _ => return self.parse_value_start(token),
                    }
                }
                NextAction::ArrayComma => {
                    let token = self.consume_token()?;
                    let span = token.span;
                    match token.token {
                        RawToken::Comma => {
                            if let Some(ContextState::Array(state)) = self.state.stack.last_mut() {
                                *state = ArrayState::Value;
                            }
                            continue;
                        }
                        RawToken::ArrayEnd => return Ok(self.close_container(Token::ArrayEnd, span)),
                        RawToken::Eof => return Ok((Token::Eof, span)),
                        _ => return Err(unexpected(&token, "',' or ']'")),
                    }
                }
                NextAction::RootFinished => {
                    let token = self.consume_token()?;
                    return match token.token {
                        RawToken::Eof => Ok((Token::Eof, token.span)),
                        _ => Err(DecodeError::new(
                            DecodeErrorKind::TrailingCharacters,
                            token.span,
                        )),
                    };
                }
            }
        }
    }
}

impl<'de> TokenReader<'de> for JsonReader<'de> {
    type Checkpoint = JsonCheckpoint<'de>;

    fn next_token(&mut self) -> Result<Token<'de>, DecodeError> {
        let (token, span) = match self.state.peeked.take() {
            Some(peeked) => peeked,
            None => self.produce()?,
        };
        self.state.last_span = span;
        Ok(token)
    }

    fn peek_kind(&mut self) -> Result<TokenKind, DecodeError> {
        if let Some((token, _)) = &self.state.peeked {
            return Ok(token.kind());
        }
        let peeked = self.produce()?;
        let kind = peeked.0.kind();
        self.state.peeked = Some(peeked);
        Ok(kind)
    }

    fn skip_value(&mut self) -> Result<(), DecodeError> {
        let first = self.next_token()?;
        match first {
            Token::ObjectStart | Token::ArrayStart => {
                let mut depth = 1usize;
                while depth > 0 {
                    match self.next_token()? {
                        Token::ObjectStart | Token::ArrayStart => depth += 1,
                        Token::ObjectEnd | Token::ArrayEnd => depth -= 1,
                        Token::Eof => {
                            return Err(DecodeError::new(
                                DecodeErrorKind::MissingClosingToken,
                                self.span(),
                            ));
                        }
                        _ => {}
                    }
                }
                trace!(span = %self.span(), "reader: skipped container");
                Ok(())
            }
            Token::Eof => Err(DecodeError::new(
                DecodeErrorKind::UnexpectedEof { expected: "value" },
                self.span(),
            )),
            Token::ObjectEnd | Token::ArrayEnd | Token::FieldName(_) => Err(DecodeError::new(
                DecodeErrorKind::UnexpectedToken {
                    got: first.kind().describe(),
                    expected: "value",
                },
                self.span(),
            )),
            Token::String(_) | Token::Number { .. } | Token::Bool(_) | Token::Null => Ok(()),
        }
    }

    fn checkpoint(&self) -> Self::Checkpoint {
        JsonCheckpoint(self.state.clone())
    }

    fn restore(&mut self, checkpoint: Self::Checkpoint) {
        self.state = checkpoint.0;
    }

    fn span(&self) -> Span {
        self.state.last_span
    }
}

fn unexpected(token: &SpannedToken, expected: &'static str) -> DecodeError {
    let got = match token.token {
        RawToken::ObjectStart => "'{'",
        RawToken::ObjectEnd => "'}'",
        RawToken::ArrayStart => "'['",
        RawToken::ArrayEnd => "']'",
        RawToken::Colon => "':'",
        RawToken::Comma => "','",
        RawToken::Null => "null",
        RawToken::True | RawToken::False => "boolean",
        RawToken::String { .. } => "string",
        RawToken::Number { .. } => "number",
        RawToken::Eof => "end of input",
    };
    DecodeError::new(DecodeErrorKind::UnexpectedToken { got, expected }, token.span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut reader = JsonReader::new(input);
        let mut out = Vec::new();
        loop {
            let token = reader.next_token().unwrap();
            out.push(token.kind());
            if token == Token::Eof {
                return out;
            }
        }
    }

    #[test]
    fn keys_come_out_as_field_names() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"{"a": [1, "x"], "b": {"c": null}}"#),
            [
                ObjectStart,
                FieldName,
                ArrayStart,
                Number,
                String,
                ArrayEnd,
                FieldName,
                ObjectStart,
                FieldName,
                Null,
                ObjectEnd,
                ObjectEnd,
                Eof
            ]
        );
    }

    #[test]
    fn restore_replays_tokens() {
        let mut reader = JsonReader::new(r#"{"kind": 1, "x": true}"#);
        let cp = reader.checkpoint();
        assert_eq!(reader.next_token().unwrap(), Token::ObjectStart);
        assert_eq!(reader.next_token().unwrap(), Token::FieldName("kind".into()));
        reader.skip_value().unwrap();
        assert_eq!(reader.peek_kind().unwrap(), TokenKind::FieldName);

        reader.restore(cp);
        assert_eq!(reader.next_token().unwrap(), Token::ObjectStart);
        assert_eq!(reader.next_token().unwrap(), Token::FieldName("kind".into()));
        assert_eq!(
            reader.next_token().unwrap(),
            Token::Number {
                raw: "1",
                hint: NumberHint::Unsigned
            }
        );
    }

    #[test]
    fn skips_nested_values() {
        let mut reader = JsonReader::new(r#"{"skip": {"a": [1, {"b": []}]}, "keep": 2}"#);
        reader.next_token().unwrap();
        reader.next_token().unwrap();
        reader.skip_value().unwrap();
        assert_eq!(reader.next_token().unwrap(), Token::FieldName("keep".into()));
    }

    #[test]
    fn syntax_errors() {
        let mut reader = JsonReader::new(r#"{"a" 1}"#);
        reader.next_token().unwrap();
        let err = reader.next_token().unwrap_err();
        assert_eq!(err.code(), "json::unexpected_token");

        let mut reader = JsonReader::new("[1 2]");
        reader.next_token().unwrap();
        reader.next_token().unwrap();
        assert!(reader.next_token().is_err());

        let mut reader = JsonReader::new(r#"{"a": 1,}"#);
        assert!(reader.skip_value().is_err());
        let mut reader = JsonReader::new("[1,]");
        assert!(reader.skip_value().is_err());

        let mut reader = JsonReader::new("{} x");
        reader.skip_value().unwrap();
        assert_eq!(
            reader.next_token().unwrap_err().kind,
            DecodeErrorKind::Scan(crate::ScanErrorKind::UnexpectedChar('x'))
        );

        let mut reader = JsonReader::new("{} {}");
        reader.skip_value().unwrap();
        assert_eq!(
            reader.next_token().unwrap_err().kind,
            DecodeErrorKind::TrailingCharacters
        );
    }

    #[test]
    fn eof_inside_a_container_is_a_token() {
        let mut reader = JsonReader::new(r#"{"a": 1"#);
        reader.next_token().unwrap();
        reader.next_token().unwrap();
        reader.next_token().unwrap();
        assert_eq!(reader.next_token().unwrap(), Token::Eof);

        let mut reader = JsonReader::new(r#"[{"a": [1"#);
        assert_eq!(
            reader.skip_value().unwrap_err().kind,
            DecodeErrorKind::MissingClosingToken
        );
    }
}
