//! Low-level JSON scanner that finds token boundaries without materializing strings.
//!
//! String content is returned as indices plus a `has_escapes` flag; escapes are
//! only decoded when the reader hands a string to the decoder. Skipped values
//! therefore cost a boundary scan and nothing else.

use core::str;
use std::borrow::Cow;

use crate::Span;

/// Token kinds with minimal data: strings and numbers are indices into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawToken {
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    Colon,
    Comma,
    Null,
    True,
    False,
    /// Indices exclude the quotes.
    String {
        start: usize,
        end: usize,
        has_escapes: bool,
    },
    Number {
        start: usize,
        end: usize,
        hint: NumberHint,
    },
    Eof,
}

/// Hint about number format to guide parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberHint {
    /// Unsigned integer (no sign, no decimal, no exponent)
    Unsigned,
    /// Signed integer (has `-` prefix, no decimal, no exponent)
    Signed,
    /// Floating point (has `.` or `e`/`E`)
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SpannedToken {
    pub token: RawToken,
    pub span: Span,
}

/// Scanner error
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanError {
    pub kind: ScanErrorKind,
    pub span: Span,
}

/// Types of scanner errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// Unexpected character
    UnexpectedChar(char),
    /// Unexpected end of input (with context)
    UnexpectedEof(&'static str),
    /// Invalid UTF-8, or an escape that does not encode a scalar value
    InvalidUtf8,
}

impl core::fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ScanErrorKind::UnexpectedChar(c) => write!(f, "unexpected character '{c}'"),
            ScanErrorKind::UnexpectedEof(ctx) => write!(f, "unexpected end of input {ctx}"),
            ScanErrorKind::InvalidUtf8 => f.write_str("invalid UTF-8 sequence"),
        }
    }
}

pub(crate) type ScanResult = Result<SpannedToken, ScanError>;

/// JSON scanner over a complete buffer.
///
/// The scanner is just a position, so cloning it is a checkpoint.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scanner {
    pos: usize,
}

impl Scanner {
    pub(crate) const fn new() -> Self {
        Self { pos: 0 }
    }

    /// Scan the next token from the buffer.
    pub(crate) fn next_token(&mut self, buf: &[u8]) -> ScanResult {
        self.skip_whitespace(buf);

        let start = self.pos;
        let Some(&byte) = buf.get(self.pos) else {
            return Ok(SpannedToken {
                token: RawToken::Eof,
                span: Span::new(self.pos, 0),
            });
        };

        let punct = match byte {
            b'{' => Some(RawToken::ObjectStart),
            b'}' => Some(RawToken::ObjectEnd),
            b'[' => Some(RawToken::ArrayStart),
            b']' => Some(RawToken::ArrayEnd),
            b':' => Some(RawToken::Colon),
            b',' => Some(RawToken::Comma),
            _ => None,
        };
        if let Some(token) = punct {
            self.pos += 1;
            return Ok(SpannedToken {
                token,
                span: Span::new(start, 1),
            });
        }

        match byte {
            b'"' => self.scan_string(buf, start),
            b'-' | b'0'..=b'9' => self.scan_number(buf, start),
            b't' => self.scan_literal(buf, start, b"true", RawToken::True),
            b'f' => self.scan_literal(buf, start, b"false", RawToken::False),
            b'n' => self.scan_literal(buf, start, b"null", RawToken::Null),
            _ => Err(ScanError {
                kind: ScanErrorKind::UnexpectedChar(byte as char),
                span: Span::new(start, 1),
            }),
        }
    }

    fn skip_whitespace(&mut self, buf: &[u8]) {
        let mut pos = self.pos;
        while let Some(&b) = buf.get(pos) {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => pos += 1,
                _ => break,
            }
        }
        self.pos = pos;
    }

    /// Scan a string, finding its boundaries and noting if it has escapes.
    fn scan_string(&mut self, buf: &[u8], start: usize) -> ScanResult {
        // Skip opening quote
        self.pos += 1;
        let content_start = self.pos;
        let mut has_escapes = false;

        while let Some(&byte) = buf.get(self.pos) {
            match byte {
                b'"' => {
                    let content_end = self.pos;
                    self.pos += 1;
                    return Ok(SpannedToken {
                        token: RawToken::String {
                            start: content_start,
                            end: content_end,
                            has_escapes,
                        },
                        span: Span::new(start, self.pos - start),
                    });
                }
                b'\\' => {
                    has_escapes = true;
                    // the escaped byte can never close the string; \uXXXX
                    // digits are checked when the string is decoded
                    self.pos += 2;
                }
                _ => self.pos += 1,
            }
        }

        Err(ScanError {
            kind: ScanErrorKind::UnexpectedEof("in string"),
            span: Span::new(start, buf.len() - start),
        })
    }

    /// Scan a number, finding its boundaries and determining its type hint.
    fn scan_number(&mut self, buf: &[u8], start: usize) -> ScanResult {
        let mut hint = NumberHint::Unsigned;
        let mut pos = self.pos;

        if buf.get(pos) == Some(&b'-') {
            hint = NumberHint::Signed;
            pos += 1;
        }

        let digits_start = pos;
        pos = skip_digits(buf, pos);
        if pos == digits_start {
            return Err(ScanError {
                kind: ScanErrorKind::UnexpectedChar(buf.get(pos).map_or('?', |&b| b as char)),
                span: Span::new(pos, 1),
            });
        }

        // Check for decimal part
        if buf.get(pos) == Some(&b'.') {
            hint = NumberHint::Float;
            pos = skip_digits(buf, pos + 1);
        }

        // Check for exponent
        if matches!(buf.get(pos), Some(b'e' | b'E')) {
            hint = NumberHint::Float;
            pos += 1;
            if matches!(buf.get(pos), Some(b'+' | b'-')) {
                pos += 1;
            }
            pos = skip_digits(buf, pos);
        }

        self.pos = pos;
        Ok(SpannedToken {
            token: RawToken::Number {
                start,
                end: pos,
                hint,
            },
            span: Span::new(start, pos - start),
        })
    }

    /// Scan a literal keyword (true, false, null)
    fn scan_literal(
        &mut self,
        buf: &[u8],
        start: usize,
        expected: &'static [u8],
        token: RawToken,
    ) -> ScanResult {
        for &want in expected {
            match buf.get(self.pos) {
                Some(&b) if b == want => self.pos += 1,
                Some(&b) => {
                    return Err(ScanError {
                        kind: ScanErrorKind::UnexpectedChar(b as char),
                        span: Span::new(self.pos, 1),
                    });
                }
                None => {
                    return Err(ScanError {
                        kind: ScanErrorKind::UnexpectedEof("in literal"),
                        span: Span::new(start, self.pos - start),
                    });
                }
            }
        }

        Ok(SpannedToken {
            token,
            span: Span::new(start, expected.len()),
        })
    }
}

fn skip_digits(buf: &[u8], mut pos: usize) -> usize {
    while buf.get(pos).is_some_and(u8::is_ascii_digit) {
        pos += 1;
    }
    pos
}

// =============================================================================
// String decoding utilities (second pass)
// =============================================================================

/// Decode a JSON string, borrowing from the input when it has no escapes.
pub(crate) fn decode_string(
    input: &str,
    start: usize,
    end: usize,
    has_escapes: bool,
) -> Result<Cow<'_, str>, ScanError> {
    if has_escapes {
        return decode_string_owned(input.as_bytes(), start, end).map(Cow::Owned);
    }
    input
        .get(start..end)
        .map(Cow::Borrowed)
        .ok_or(ScanError {
            kind: ScanErrorKind::InvalidUtf8,
            span: Span::new(start, end - start),
        })
}

/// Decode a JSON string from a buffer, handling escape sequences.
fn decode_string_owned(buf: &[u8], start: usize, end: usize) -> Result<String, ScanError> {
    let slice = &buf[start..end];
    let mut result = String::with_capacity(end - start);
    let mut i = 0;

    while i < slice.len() {
        let byte = slice[i];
        if byte != b'\\' {
            // copy the run of unescaped bytes in one go
            let run_end = slice[i..]
                .iter()
                .position(|&b| b == b'\\')
                .map_or(slice.len(), |p| i + p);
            let run = str::from_utf8(&slice[i..run_end]).map_err(|_| ScanError {
                kind: ScanErrorKind::InvalidUtf8,
                span: Span::new(start + i, run_end - i),
            })?;
            result.push_str(run);
            i = run_end;
            continue;
        }

        i += 1;
        let Some(&escaped) = slice.get(i) else {
            return Err(ScanError {
                kind: ScanErrorKind::UnexpectedEof("in escape sequence"),
                span: Span::new(start + i - 1, 1),
            });
        };

        match escaped {
            b'"' => result.push('"'),
            b'\\' => result.push('\\'),
            b'/' => result.push('/'),
            b'b' => result.push('\x08'),
            b'f' => result.push('\x0c'),
            b'n' => result.push('\n'),
            b'r' => result.push('\r'),
            b't' => result.push('\t'),
            b'u' => {
                i += 1;
                let code_unit = read_hex4(slice, i, start)?;
                i += 4;

                // Check for surrogate pairs
                let code_point = if (0xD800..=0xDBFF).contains(&code_unit) {
                    // High surrogate - expect \uXXXX to follow
                    if slice.get(i) != Some(&b'\\') || slice.get(i + 1) != Some(&b'u') {
                        return Err(ScanError {
                            kind: ScanErrorKind::InvalidUtf8,
                            span: Span::new(start + i - 6, 6),
                        });
                    }
                    i += 2;
                    let low_unit = read_hex4(slice, i, start)?;
                    i += 4;

                    if !(0xDC00..=0xDFFF).contains(&low_unit) {
                        return Err(ScanError {
                            kind: ScanErrorKind::InvalidUtf8,
                            span: Span::new(start + i - 4, 4),
                        });
                    }

                    let high = u32::from(code_unit);
                    let low = u32::from(low_unit);
                    0x10000 + ((high & 0x3FF) << 10) + (low & 0x3FF)
                } else {
                    u32::from(code_unit)
                };

                // lone low surrogates land here too
                let c = char::from_u32(code_point).ok_or(ScanError {
                    kind: ScanErrorKind::InvalidUtf8,
                    span: Span::new(start + i - 4, 4),
                })?;
                result.push(c);
                continue;
            }
            other => {
                return Err(ScanError {
                    kind: ScanErrorKind::UnexpectedChar(other as char),
                    span: Span::new(start + i - 1, 2),
                });
            }
        }
        i += 1;
    }

    Ok(result)
}

fn read_hex4(slice: &[u8], at: usize, base: usize) -> Result<u16, ScanError> {
    let hex = slice
        .get(at..at + 4)
        .and_then(|h| str::from_utf8(h).ok())
        .ok_or(ScanError {
            kind: ScanErrorKind::UnexpectedEof("in unicode escape"),
            span: Span::new(base + at, slice.len().saturating_sub(at)),
        })?;
    // from_str_radix alone would take a leading sign
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ScanError {
            kind: ScanErrorKind::UnexpectedChar(bad),
            span: Span::new(base + at, 4),
        });
    }
    u16::from_str_radix(hex, 16).map_err(|_| ScanError {
        kind: ScanErrorKind::UnexpectedChar(hex.chars().next().unwrap_or('?')),
        span: Span::new(base + at, 4),
    })
}
