//! UTF-16 string type shared by values, property names, parser input and
//! stringifier output.
//!
//! JSON escapes address 16-bit code units, so `"\uD800"` is a legal one-unit
//! string even though it is not valid Unicode. `JsString` stores code units
//! directly and only converts to Rust `String` (lossily) at the edges.

use std::fmt;
use std::rc::Rc;

/// Immutable, reference-counted sequence of UTF-16 code units.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Rc<[u16]>);

impl JsString {
    pub fn new() -> Self {
        JsString(Rc::from(Vec::new()))
    }

    pub fn from_units(units: &[u16]) -> Self {
        JsString(Rc::from(units))
    }

    pub fn as_units(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to a Rust string, replacing lone surrogates with U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    /// Keep at most `max` code units.
    pub fn truncate_units(&self, max: usize) -> JsString {
        if self.len() <= max {
            self.clone()
        } else {
            JsString::from_units(&self.0[..max])
        }
    }
}

impl Default for JsString {
    fn default() -> Self {
        JsString::new()
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.encode_utf16().collect::<Vec<u16>>().into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString::from(s.as_str())
    }
}

impl From<Vec<u16>> for JsString {
    fn from(units: Vec<u16>) -> Self {
        JsString(units.into())
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.iter().copied().eq(other.encode_utf16())
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in char::decode_utf16(self.0.iter().copied()) {
            fmt::Write::write_char(f, ch.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}
