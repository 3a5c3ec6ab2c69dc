//! Configuration for the parser and stringifier.

use crate::string::JsString;
use crate::value::{Value, WrapperMethods};

/// Longest property name (in code units) interned through the name pool.
pub const DEFAULT_POOLED_NAME_MAX_LEN: usize = 32;

/// Upper bound for indentation: at most 10 spaces or 10 code units of text.
pub const MAX_INDENT: usize = 10;

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Unescaped property names up to this length are interned per document.
    /// `0` disables pooling.
    pub pooled_name_max_len: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            pooled_name_max_len: DEFAULT_POOLED_NAME_MAX_LEN,
        }
    }
}

/// Stringifier configuration.
#[derive(Default, Clone, Copy)]
pub struct StringifyOptions<'a> {
    /// Resolves `toJSON` on the wrapper types of booleans, numbers and strings.
    pub wrapper_methods: Option<&'a dyn WrapperMethods>,
}

/// Resolved indentation unit. Empty means compact output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Indent(JsString);

impl Indent {
    /// Resolve the `indent` argument of `stringify`.
    ///
    /// - Numbers are truncated toward zero and clamped to `[0, 10]` spaces (`NaN` → 0)
    /// - Strings keep at most 10 code units
    /// - `Undefined` and `Null` disable pretty-printing
    /// - Anything else is converted to a string and used verbatim
    pub fn resolve(value: &Value) -> Indent {
        match value {
            Value::Undefined | Value::Null => Indent::default(),
            Value::Number(n) => {
                let count = if n.is_nan() {
                    0
                } else {
                    n.trunc().clamp(0.0, MAX_INDENT as f64) as usize
                };
                Indent::spaces(count)
            }
            Value::Str(s) => Indent(s.truncate_units(MAX_INDENT)),
            other => Indent(other.to_js_string()),
        }
    }

    pub fn spaces(count: usize) -> Indent {
        Indent(JsString::from(" ".repeat(count.min(MAX_INDENT))))
    }

    pub fn is_pretty(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn units(&self) -> &[u16] {
        self.0.as_units()
    }
}
