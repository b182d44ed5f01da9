//! Token writer: the sink the encoder emits into.

use crate::WriterOptions;

/// Raised when writer calls are not properly nested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteError {
    msg: &'static str,
}

impl WriteError {
    /// Create an error with a static message.
    pub const fn new(msg: &'static str) -> Self {
        Self { msg }
    }
}

impl core::fmt::Display for WriteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.msg)
    }
}

impl std::error::Error for WriteError {}

/// A sink for JSON tokens.
///
/// Values written inside an object must each be preceded by
/// [`field_name`](TokenWriter::field_name).
pub trait TokenWriter {
    /// `{`
    fn begin_object(&mut self) -> Result<(), WriteError>;
    /// A key inside an object.
    fn field_name(&mut self, name: &str) -> Result<(), WriteError>;
    /// `}`
    fn end_object(&mut self) -> Result<(), WriteError>;
    /// `[`
    fn begin_array(&mut self) -> Result<(), WriteError>;
    /// `]`
    fn end_array(&mut self) -> Result<(), WriteError>;
    /// A string literal; the writer escapes it.
    fn string(&mut self, value: &str) -> Result<(), WriteError>;
    /// A pre-formatted number literal, written verbatim.
    fn number(&mut self, literal: &str) -> Result<(), WriteError>;
    /// `true` or `false`
    fn boolean(&mut self, value: bool) -> Result<(), WriteError>;
    /// `null`
    fn null(&mut self) -> Result<(), WriteError>;
}

#[derive(Debug, Clone, Copy)]
enum Ctx {
    Object { first: bool, has_key: bool },
    Array { first: bool },
}

/// JSON writer with configurable formatting options.
#[derive(Debug)]
pub struct JsonWriter {
    out: String,
    stack: Vec<Ctx>,
    options: WriterOptions,
}

impl JsonWriter {
    /// Create a new writer with default (compact) options.
    pub fn new() -> Self {
        Self::with_options(WriterOptions::default())
    }

    /// Create a new writer with the given options.
    pub const fn with_options(options: WriterOptions) -> Self {
        Self {
            out: String::new(),
            stack: Vec::new(),
            options,
        }
    }

    /// Consume the writer and return the output.
    pub fn finish(self) -> String {
        self.out
    }

    /// Current nesting depth (for indentation).
    const fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Write a newline and indentation if in pretty mode.
    fn write_indent(&mut self) {
        if self.options.pretty {
            self.out.push('\n');
            for _ in 0..self.depth() {
                self.out.push_str(self.options.indent);
            }
        }
    }

    fn before_value(&mut self) -> Result<(), WriteError> {
        match self.stack.last_mut() {
            Some(Ctx::Array { first }) => {
                if !*first {
                    self.out.push(',');
                }
                *first = false;
                self.write_indent();
            }
            Some(Ctx::Object { has_key, .. }) => {
                if !*has_key {
                    return Err(WriteError::new("value written in an object without a field name"));
                }
                *has_key = false;
            }
            None => {}
        }
        Ok(())
    }

    fn write_json_string(&mut self, s: &str) {
        self.out.push('"');
        let mut plain = 0;
        for (i, c) in s.char_indices() {
            let escaped = match c {
                '"' => "\\\"",
                '\\' => "\\\\",
                '\n' => "\\n",
                '\r' => "\\r",
                '\t' => "\\t",
                '\u{08}' => "\\b",
                '\u{0C}' => "\\f",
                c if c.is_ascii_control() => "",
                _ => continue,
            };
            self.out.push_str(&s[plain..i]);
            if escaped.is_empty() {
                self.write_unicode_escape(c);
            } else {
                self.out.push_str(escaped);
            }
            plain = i + c.len_utf8();
        }
        self.out.push_str(&s[plain..]);
        self.out.push('"');
    }

    fn write_unicode_escape(&mut self, c: char) {
        let code_point = c as u32;
        let to_hex = |d: u32| char::from_digit(d & 0xF, 16).unwrap_or('0');
        self.out.push_str("\\u");
        for shift in [12, 8, 4, 0] {
            self.out.push(to_hex(code_point >> shift));
        }
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenWriter for JsonWriter {
    fn begin_object(&mut self) -> Result<(), WriteError> {
        self.before_value()?;
        self.out.push('{');
        self.stack.push(Ctx::Object {
            first: true,
            has_key: false,
        });
        Ok(())
    }

    fn field_name(&mut self, name: &str) -> Result<(), WriteError> {
        match self.stack.last_mut() {
            Some(Ctx::Object { first, has_key }) => {
                if *has_key {
                    return Err(WriteError::new("field_name called twice without a value"));
                }
                if !*first {
                    self.out.push(',');
                }
                *first = false;
                *has_key = true;
                self.write_indent();
                self.write_json_string(name);
                self.out.push(':');
                if self.options.pretty {
                    self.out.push(' ');
                }
                Ok(())
            }
            _ => Err(WriteError::new("field_name called outside of an object")),
        }
    }

    fn end_object(&mut self) -> Result<(), WriteError> {
        match self.stack.last() {
            Some(&Ctx::Object {
                first,
                has_key: false,
            }) => {
                self.stack.pop();
                // Only add newline/indent before closing brace if object was non-empty
                if !first {
                    self.write_indent();
                }
                self.out.push('}');
                Ok(())
            }
            _ => Err(WriteError::new(
                "end_object called without matching begin_object",
            )),
        }
    }

    fn begin_array(&mut self) -> Result<(), WriteError> {
        self.before_value()?;
        self.out.push('[');
        self.stack.push(Ctx::Array { first: true });
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), WriteError> {
        match self.stack.last() {
            Some(&Ctx::Array { first }) => {
                self.stack.pop();
                if !first {
                    self.write_indent();
                }
                self.out.push(']');
                Ok(())
            }
            _ => Err(WriteError::new(
                "end_array called without matching begin_array",
            )),
        }
    }

    fn string(&mut self, value: &str) -> Result<(), WriteError> {
        self.before_value()?;
        self.write_json_string(value);
        Ok(())
    }

    fn number(&mut self, literal: &str) -> Result<(), WriteError> {
        self.before_value()?;
        self.out.push_str(literal);
        Ok(())
    }

    fn boolean(&mut self, value: bool) -> Result<(), WriteError> {
        self.before_value()?;
        self.out.push_str(if value { "true" } else { "false" });
        Ok(())
    }

    fn null(&mut self) -> Result<(), WriteError> {
        self.before_value()?;
        self.out.push_str("null");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_strings() {
        let mut w = JsonWriter::new();
        w.string("a\"b\\c\n\u{1}é").unwrap();
        assert_eq!(w.finish(), r#""a\"b\\c\n\u0001é""#);
    }

    #[test]
    fn pretty_output_indents_nested_containers() {
        let mut w = JsonWriter::with_options(WriterOptions::new().pretty());
        w.begin_object().unwrap();
        w.field_name("a").unwrap();
        w.begin_array().unwrap();
        w.number("1").unwrap();
        w.number("2").unwrap();
        w.end_array().unwrap();
        w.field_name("b").unwrap();
        w.begin_object().unwrap();
        w.end_object().unwrap();
        w.end_object().unwrap();
        assert_eq!(w.finish(), "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": {}\n}");
    }

    #[test]
    fn rejects_values_without_keys() {
        let mut w = JsonWriter::new();
        w.begin_object().unwrap();
        assert!(w.boolean(true).is_err());
        assert!(JsonWriter::new().end_array().is_err());
    }

    #[test]
    fn mismatched_close_leaves_nesting_intact() {
        let mut w = JsonWriter::new();
        w.begin_object().unwrap();
        w.field_name("a").unwrap();
        w.begin_array().unwrap();
        assert!(w.end_object().is_err());
        w.end_array().unwrap();
        assert!(w.end_array().is_err());
        w.end_object().unwrap();
        assert_eq!(w.finish(), r#"{"a":[]}"#);
    }
}
