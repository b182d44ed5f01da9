/// Global codec options, shared by decoding and encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
    /// Omit nullable fields whose value is null (default: false)
    pub ignore_null_values: bool,

    /// Omit read-only fields when encoding (default: false)
    pub ignore_read_only_properties: bool,

    /// Fall back to case-insensitive field matching when decoding (default: false)
    pub field_name_case_insensitive: bool,
}

impl CodecOptions {
    /// Create new default options.
    pub const fn new() -> Self {
        Self {
            ignore_null_values: false,
            ignore_read_only_properties: false,
            field_name_case_insensitive: false,
        }
    }

    /// Omit nullable fields whose value is null.
    pub const fn ignore_null_values(mut self) -> Self {
        self.ignore_null_values = true;
        self
    }

    /// Omit read-only fields when encoding.
    pub const fn ignore_read_only_properties(mut self) -> Self {
        self.ignore_read_only_properties = true;
        self
    }

    /// Match field names case-insensitively when no exact match exists.
    pub const fn field_name_case_insensitive(mut self) -> Self {
        self.field_name_case_insensitive = true;
        self
    }
}

/// Output formatting for [`JsonWriter`](crate::JsonWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Whether to pretty-print with indentation (default: false)
    pub pretty: bool,

    /// Indentation string for pretty-printing (default: "  ")
    pub indent: &'static str,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl WriterOptions {
    /// Create new default options (compact output).
    pub const fn new() -> Self {
        Self {
            pretty: false,
            indent: "  ",
        }
    }

    /// Enable pretty-printing with default indentation.
    pub const fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Set a custom indentation string (implies pretty-printing).
    pub const fn indent(mut self, indent: &'static str) -> Self {
        self.indent = indent;
        self.pretty = true;
        self
    }
}
