//! JSON text → [`Value`] parser.
//!
//! The parser is a finite state machine over UTF-16 code units. Nesting is
//! tracked on an explicit stack of [`ParseFrame`]s instead of the native call
//! stack, so arbitrarily deep input costs heap, not stack.
//!
//! # Key design decisions
//!
//! - **Shared accumulation buffer**: children of every open container are
//!   appended to one `members` buffer. A frame only remembers where its own
//!   children begin (`base`); closing it drains `members[base..]`.
//! - **Strict numbers**: the JSON-only restrictions (no `+`, no leading zeros,
//!   digit after `-` and `.`) are checked here; digit scanning is delegated to
//!   [`scan_number`], whose consumed length is trusted.
//! - **Name pool**: short property names without escapes are interned per
//!   document, keyed by the exact span of input, so repeated keys share one
//!   allocation.
//! - **Reviver on close**: when a reviver is supplied, a container's members
//!   are revived as it closes (after their own children), and the root is
//!   revived last under the key `""` of a synthetic holder.

use crate::error::{JsonError, Result, SyntaxMessage};
use crate::numconv::{is_digit, scan_number};
use crate::options::ParseOptions;
use crate::string::JsString;
use crate::value::{Function, List, Object, Value};
use std::collections::HashMap;

const QUOTE: u16 = b'"' as u16;
const BACKSLASH: u16 = b'\\' as u16;

/// Parse JSON text, optionally threading every value through `reviver`.
pub fn parse(text: &str, reviver: Option<&Function>) -> Result<Value> {
    let units: Vec<u16> = text.encode_utf16().collect();
    Parser::new(&units).parse(reviver)
}

/// Parse JSON text given as UTF-16 code units.
pub fn parse_utf16(text: &[u16], reviver: Option<&Function>) -> Result<Value> {
    Parser::new(text).parse(reviver)
}

/// Runtime entry point: `Null`/`Undefined` is the "no input" sentinel and fails
/// immediately; other non-string values are converted to text first.
pub fn parse_value(text: &Value, reviver: Option<&Function>) -> Result<Value> {
    match text {
        Value::Undefined | Value::Null => {
            tracing::debug!("JSON parse called without input");
            Err(JsonError::Syntax {
                message: SyntaxMessage::NullInput,
                line: 1,
            })
        }
        Value::Str(s) => parse_utf16(s.as_units(), reviver),
        other => parse_utf16(other.to_js_string().as_units(), reviver),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ObjectOrArrayOrLiteral,
    PropertyName,
    FirstMemberOrEnd,
    FirstElementOrEnd,
    NextMemberOrEnd,
    NextElementOrEnd,
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    List,
    Object,
}

/// One open `{` or `[`.
///
/// The stack depth always equals the bracket nesting depth of the consumed
/// prefix, and `members[base..]` holds exactly this container's children.
#[derive(Debug)]
struct ParseFrame {
    /// Name the finished container is stored under in its parent object.
    name: Option<JsString>,
    kind: ContainerKind,
    base: usize,
}

/// Single-use parser state. Create one per document.
pub struct Parser<'a> {
    text: &'a [u16],
    pos: usize,
    line: usize,
    options: ParseOptions,
    stack: Vec<ParseFrame>,
    members: Vec<(Option<JsString>, Value)>,
    pending_name: Option<JsString>,
    root: Option<Value>,
    names: HashMap<&'a [u16], JsString>,
    pooled_hits: usize,
    scratch: Vec<u16>,
    reviver: Option<Function>,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a [u16]) -> Self {
        Self::with_options(text, ParseOptions::default())
    }

    pub fn with_options(text: &'a [u16], options: ParseOptions) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            options,
            stack: Vec::new(),
            members: Vec::new(),
            pending_name: None,
            root: None,
            names: HashMap::new(),
            pooled_hits: 0,
            scratch: Vec::new(),
            reviver: None,
        }
    }

    /// Run the state machine to completion.
    ///
    /// The first error aborts parsing; no partial tree is returned.
    pub fn parse(mut self, reviver: Option<&Function>) -> Result<Value> {
        self.reviver = reviver.cloned();
        let mut state = State::ObjectOrArrayOrLiteral;

        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                if state == State::EndOfInput {
                    break;
                }
                return Err(self.error(SyntaxMessage::UnexpectedEndOfString));
            };

            state = match state {
                State::ObjectOrArrayOrLiteral => self.value_start(c)?,
                State::FirstMemberOrEnd => match c {
                    b'}' => self.close_container()?,
                    b']' => return Err(self.error(SyntaxMessage::ObjectClosedWithBracket)),
                    b'"' => self.member_name()?,
                    _ => return Err(self.error(SyntaxMessage::ExpectedCloseOrName)),
                },
                State::PropertyName => match c {
                    b'"' => self.member_name()?,
                    _ => return Err(self.error(SyntaxMessage::NameExpected)),
                },
                State::FirstElementOrEnd => match c {
                    b']' => self.close_container()?,
                    b'}' => return Err(self.error(SyntaxMessage::ArrayClosedWithBrace)),
                    _ => self.value_start(c)?,
                },
                State::NextMemberOrEnd => match c {
                    b',' => {
                        self.pos += 1;
                        State::PropertyName
                    }
                    b'}' => self.close_container()?,
                    b']' => return Err(self.error(SyntaxMessage::ObjectClosedWithBracket)),
                    _ => return Err(self.error(SyntaxMessage::ExpectedCloseOrComma)),
                },
                State::NextElementOrEnd => match c {
                    b',' => {
                        self.pos += 1;
                        State::ObjectOrArrayOrLiteral
                    }
                    b']' => self.close_container()?,
                    b'}' => return Err(self.error(SyntaxMessage::ArrayClosedWithBrace)),
                    _ => return Err(self.error(SyntaxMessage::ExpectedCloseOrComma)),
                },
                State::EndOfInput => return Err(self.error(SyntaxMessage::ExpectedEndOfString)),
            };
        }

        let root = self.root.take().unwrap_or_default();
        tracing::debug!(
            "Parsed JSON document: {} code units, {} lines, {} pooled name reuses",
            self.text.len(),
            self.line,
            self.pooled_hits
        );

        match &self.reviver {
            Some(reviver) => {
                let holder = Object::from_entries([("", root.clone())]);
                Ok(reviver.call(&Value::Object(holder), &[Value::str(""), root])?)
            }
            None => Ok(root),
        }
    }

    /// Current code unit narrowed to ASCII; non-ASCII units map to `0xFF`,
    /// which no grammar rule accepts outside string literals.
    fn peek(&self) -> Option<u8> {
        self.text
            .get(self.pos)
            .map(|&u| if u < 0x80 { u as u8 } else { 0xFF })
    }

    fn skip_whitespace(&mut self) {
        while let Some(&u) = self.text.get(self.pos) {
            match u {
                0x20 | 0x09 | 0x0D => {}
                0x0A => self.line += 1,
                _ => break,
            }
            self.pos += 1;
        }
    }

    fn error(&self, message: SyntaxMessage) -> JsonError {
        tracing::debug!("JSON syntax error at line {}: {}", self.line, message);
        JsonError::Syntax {
            message,
            line: self.line,
        }
    }

    /// Dispatch on the first code unit of a value.
    fn value_start(&mut self, c: u8) -> Result<State> {
        match c {
            b'{' => Ok(self.open_container(ContainerKind::Object)),
            b'[' => Ok(self.open_container(ContainerKind::List)),
            b'"' => {
                let s = self.read_string()?;
                self.accept(Value::Str(s))
            }
            b't' => {
                let v = self.read_literal("true", Value::Bool(true))?;
                self.accept(v)
            }
            b'f' => {
                let v = self.read_literal("false", Value::Bool(false))?;
                self.accept(v)
            }
            b'n' => {
                let v = self.read_literal("null", Value::Null)?;
                self.accept(v)
            }
            b'-' | b'+' | b'.' | b'0'..=b'9' => {
                let v = self.read_number()?;
                self.accept(v)
            }
            _ => Err(self.error(SyntaxMessage::ExpectedLiteralOrOpenBracket)),
        }
    }

    fn open_container(&mut self, kind: ContainerKind) -> State {
        self.pos += 1;
        self.stack.push(ParseFrame {
            name: self.pending_name.take(),
            kind,
            base: self.members.len(),
        });
        match kind {
            ContainerKind::Object => State::FirstMemberOrEnd,
            ContainerKind::List => State::FirstElementOrEnd,
        }
    }

    /// Build the innermost container from its accumulated children and hand it
    /// to its parent (or make it the root).
    fn close_container(&mut self) -> Result<State> {
        self.pos += 1;
        let Some(frame) = self.stack.pop() else {
            return Err(self.error(SyntaxMessage::ExpectedEndOfString));
        };

        let value = match frame.kind {
            ContainerKind::List => {
                let items: Vec<Value> = self.members.drain(frame.base..).map(|(_, v)| v).collect();
                let list = List::from_vec(items);
                if let Some(reviver) = &self.reviver {
                    revive_list(reviver, &list)?;
                }
                Value::List(list)
            }
            ContainerKind::Object => {
                let object = Object::new();
                for (name, value) in self.members.drain(frame.base..) {
                    object.set(name.unwrap_or_default(), value);
                }
                if let Some(reviver) = &self.reviver {
                    revive_object(reviver, &object)?;
                }
                Value::Object(object)
            }
        };

        self.pending_name = frame.name;
        self.accept(value)
    }

    /// Install a finished value: as the root when no container is open,
    /// otherwise as the next child of the innermost container.
    fn accept(&mut self, value: Value) -> Result<State> {
        let Some(top) = self.stack.last() else {
            self.root = Some(value);
            return Ok(State::EndOfInput);
        };
        let next = match top.kind {
            ContainerKind::Object => State::NextMemberOrEnd,
            ContainerKind::List => State::NextElementOrEnd,
        };
        self.members.push((self.pending_name.take(), value));
        Ok(next)
    }

    /// `"name"` followed by `:`; leaves the name pending for the member value.
    fn member_name(&mut self) -> Result<State> {
        let name = self.read_property_name()?;
        self.skip_whitespace();
        match self.peek() {
            Some(b':') => {
                self.pos += 1;
                self.pending_name = Some(name);
                Ok(State::ObjectOrArrayOrLiteral)
            }
            None => Err(self.error(SyntaxMessage::UnexpectedEndOfString)),
            Some(_) => Err(self.error(SyntaxMessage::ColonExpected)),
        }
    }

    /// Read a property name through the name pool when it is short and has no
    /// escapes; otherwise fall back to the general string reader.
    fn read_property_name(&mut self) -> Result<JsString> {
        let limit = self.options.pooled_name_max_len;
        if limit > 0 {
            let text: &'a [u16] = self.text;
            let start = self.pos + 1;
            let mut i = start;
            while i < text.len() && i - start <= limit {
                let u = text[i];
                if u == QUOTE {
                    let span = &text[start..i];
                    let name = match self.names.get(span) {
                        Some(name) => {
                            self.pooled_hits += 1;
                            name.clone()
                        }
                        None => {
                            let name = JsString::from_units(span);
                            self.names.insert(span, name.clone());
                            name
                        }
                    };
                    self.pos = i + 1;
                    return Ok(name);
                }
                if u == BACKSLASH || u < 0x20 {
                    break;
                }
                i += 1;
            }
        }
        self.read_string()
    }

    /// Read a string literal starting at the opening quote.
    fn read_string(&mut self) -> Result<JsString> {
        self.pos += 1;
        let start = self.pos;

        // Escape-free strings are copied straight out of the input.
        loop {
            match self.text.get(self.pos).copied() {
                None => return Err(self.error(SyntaxMessage::UnexpectedEndOfString)),
                Some(QUOTE) => {
                    let s = JsString::from_units(&self.text[start..self.pos]);
                    self.pos += 1;
                    return Ok(s);
                }
                Some(BACKSLASH) => break,
                Some(u) if u < 0x20 => {
                    return Err(self.error(SyntaxMessage::IllegalControlCharacter))
                }
                Some(_) => self.pos += 1,
            }
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(&self.text[start..self.pos]);
        loop {
            match self.text.get(self.pos).copied() {
                None => return Err(self.error(SyntaxMessage::UnexpectedEndOfString)),
                Some(QUOTE) => {
                    self.pos += 1;
                    return Ok(JsString::from_units(&self.scratch));
                }
                Some(BACKSLASH) => {
                    let unit = self.read_escape()?;
                    self.scratch.push(unit);
                }
                Some(u) if u < 0x20 => {
                    return Err(self.error(SyntaxMessage::IllegalControlCharacter))
                }
                Some(u) => {
                    self.scratch.push(u);
                    self.pos += 1;
                }
            }
        }
    }

    /// Decode one escape sequence starting at the backslash. `\uXXXX` yields
    /// a single code unit; surrogate pairs are not combined.
    fn read_escape(&mut self) -> Result<u16> {
        let Some(&marker) = self.text.get(self.pos + 1) else {
            return Err(self.error(SyntaxMessage::UnexpectedEndOfString));
        };
        let unit = match u8::try_from(marker).unwrap_or(0) {
            b'b' => 0x08,
            b'f' => 0x0C,
            b'n' => 0x0A,
            b'r' => 0x0D,
            b't' => 0x09,
            b'"' => QUOTE,
            b'\\' => BACKSLASH,
            b'/' => u16::from(b'/'),
            b'u' => {
                let digits = self.text.get(self.pos + 2..self.pos + 6);
                let unit = digits.and_then(|d| {
                    d.iter().try_fold(0u16, |acc, &u| {
                        char::from_u32(u32::from(u))
                            .and_then(|c| c.to_digit(16))
                            .map(|h| acc * 16 + h as u16)
                    })
                });
                match unit {
                    Some(unit) => {
                        self.pos += 6;
                        return Ok(unit);
                    }
                    None => return Err(self.error(SyntaxMessage::InvalidUnicodeEscape)),
                }
            }
            _ => return Err(self.error(SyntaxMessage::IllegalEscapeSequence)),
        };
        self.pos += 2;
        Ok(unit)
    }

    /// Match `true`/`false`/`null` exactly, as a whole token.
    fn read_literal(&mut self, word: &str, value: Value) -> Result<Value> {
        let expected = word.as_bytes();
        let end = self.pos + expected.len();
        let available = &self.text[self.pos..end.min(self.text.len())];
        let prefix_matches = available
            .iter()
            .zip(expected)
            .all(|(&u, &b)| u == u16::from(b));

        if !prefix_matches {
            return Err(self.error(SyntaxMessage::ExpectedLiteralOrOpenBracket));
        }
        if available.len() < expected.len() {
            return Err(self.error(SyntaxMessage::UnexpectedEndOfString));
        }
        if matches!(self.text.get(end), Some(&u) if u < 0x80 && (u as u8).is_ascii_alphanumeric()) {
            return Err(self.error(SyntaxMessage::ExpectedLiteralOrOpenBracket));
        }
        self.pos = end;
        Ok(value)
    }

    fn read_number(&mut self) -> Result<Value> {
        let start = self.pos;
        let mut i = start;
        if self.text.get(i) == Some(&u16::from(b'-')) {
            i += 1;
        }
        match self.text.get(i).copied() {
            Some(u) if is_digit(u) => {
                let leading_zero = u == u16::from(b'0');
                if leading_zero && matches!(self.text.get(i + 1), Some(&n) if is_digit(n)) {
                    return Err(self.error(SyntaxMessage::InvalidNumber));
                }
            }
            _ => return Err(self.error(SyntaxMessage::InvalidNumber)),
        }

        let Some((value, consumed)) = scan_number(&self.text[start..]) else {
            return Err(self.error(SyntaxMessage::InvalidNumber));
        };
        let end = start + consumed;

        let span = &self.text[start..end];
        if let Some(dot) = span.iter().position(|&u| u == u16::from(b'.')) {
            if !matches!(span.get(dot + 1), Some(&u) if is_digit(u)) {
                return Err(self.error(SyntaxMessage::InvalidNumber));
            }
        }
        if matches!(self.text.get(end), Some(&u) if u == u16::from(b'.') || u == u16::from(b'e') || u == u16::from(b'E'))
        {
            return Err(self.error(SyntaxMessage::InvalidNumber));
        }

        self.pos = end;
        Ok(Value::Number(value))
    }
}

/// Revive each member of a freshly built object, with the object itself as
/// the receiver. `Undefined` deletes the member.
fn revive_object(reviver: &Function, object: &Object) -> Result<()> {
    let holder = Value::Object(object.clone());
    for key in object.keys() {
        let value = object.get_key(&key).unwrap_or_default();
        let revived = reviver.call(&holder, &[Value::Str(key.clone()), value])?;
        if revived.is_undefined() {
            object.remove(&key);
        } else {
            object.set(key, revived);
        }
    }
    Ok(())
}

/// Revive each element of a freshly built list. Each call gets a holder
/// exposing just that index; `Undefined` is stored, keeping the slot.
fn revive_list(reviver: &Function, list: &List) -> Result<()> {
    for index in 0..list.len() {
        let key = JsString::from(index.to_string());
        let value = list.get(index);
        let holder = Object::from_entries([(key.clone(), value.clone())]);
        let revived = reviver.call(&Value::Object(holder), &[Value::Str(key), value])?;
        list.set(index, revived);
    }
    Ok(())
}
