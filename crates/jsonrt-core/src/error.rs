//! Error types for JSON parsing and stringification.

use std::fmt;
use thiserror::Error;

/// Error raised by a host callback (reviver, replacer, `toJSON`, accessor).
///
/// The codec never inspects or wraps the payload; it is handed back to the
/// caller exactly as the callback produced it.
pub type HostError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during `parse` or `stringify`.
#[derive(Error, Debug)]
pub enum JsonError {
    /// The input text was not well-formed JSON.
    /// Includes the 1-based line number where the error was detected.
    #[error("SyntaxError: {message} (line {line})")]
    Syntax { message: SyntaxMessage, line: usize },

    /// The replacer argument was neither a list, a function, nor absent.
    #[error("TypeError: replacer must be an array or a function")]
    InvalidReplacer,

    /// A container was reached again while it was still open on the current path.
    #[error("TypeError: cannot serialize a cyclic structure")]
    CyclicStructure,

    /// A host callback failed; the original error is carried unchanged.
    #[error("{0}")]
    Host(HostError),

    /// Conversion to `serde_json::Value` failed (e.g. nesting beyond serde_json's limit).
    #[error("serde_json interop error: {0}")]
    Interop(#[from] serde_json::Error),
}

impl JsonError {
    /// The syntax message code, if this is a [`JsonError::Syntax`].
    pub fn syntax_message(&self) -> Option<SyntaxMessage> {
        match self {
            JsonError::Syntax { message, .. } => Some(*message),
            _ => None,
        }
    }

    /// The line number of a syntax error.
    pub fn line(&self) -> Option<usize> {
        match self {
            JsonError::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Recover the host error raised by a callback.
    pub fn into_host(self) -> Option<HostError> {
        match self {
            JsonError::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for JsonError {
    fn from(err: HostError) -> Self {
        JsonError::Host(err)
    }
}

/// Message codes carried by [`JsonError::Syntax`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxMessage {
    /// The runtime passed its "no input" sentinel instead of text.
    NullInput,
    /// The root value was complete but more non-whitespace content followed.
    ExpectedEndOfString,
    /// The text ended inside a value.
    UnexpectedEndOfString,
    /// `}` appeared where an array had to be closed.
    ArrayClosedWithBrace,
    /// `]` appeared where an object had to be closed.
    ObjectClosedWithBracket,
    /// After `{`: neither `}` nor a property name.
    ExpectedCloseOrName,
    /// After a member or element: neither a closing bracket nor `,`.
    ExpectedCloseOrComma,
    /// A value was expected.
    ExpectedLiteralOrOpenBracket,
    InvalidNumber,
    /// A raw code unit below U+0020 inside a string literal.
    IllegalControlCharacter,
    /// `\u` not followed by four hex digits.
    InvalidUnicodeEscape,
    IllegalEscapeSequence,
    /// After `,` in an object: no property name.
    NameExpected,
    ColonExpected,
}

impl fmt::Display for SyntaxMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SyntaxMessage::NullInput => "JSON input is null",
            SyntaxMessage::ExpectedEndOfString => "unexpected content after the end of the JSON value",
            SyntaxMessage::UnexpectedEndOfString => "unexpected end of JSON input",
            SyntaxMessage::ArrayClosedWithBrace => "array closed with '}', expected ']'",
            SyntaxMessage::ObjectClosedWithBracket => "object closed with ']', expected '}'",
            SyntaxMessage::ExpectedCloseOrName => "expected '}' or a property name",
            SyntaxMessage::ExpectedCloseOrComma => "expected ',' or a closing bracket",
            SyntaxMessage::ExpectedLiteralOrOpenBracket => "expected a value",
            SyntaxMessage::InvalidNumber => "invalid number",
            SyntaxMessage::IllegalControlCharacter => "control character in string literal",
            SyntaxMessage::InvalidUnicodeEscape => "invalid \\u escape sequence",
            SyntaxMessage::IllegalEscapeSequence => "illegal escape sequence",
            SyntaxMessage::NameExpected => "property name expected",
            SyntaxMessage::ColonExpected => "':' expected after property name",
        };
        f.write_str(text)
    }
}

/// Convenience alias used throughout jsonrt-core.
pub type Result<T> = std::result::Result<T, JsonError>;
