//! [`Value`] → JSON text stringifier.
//!
//! The object graph is walked depth-first with an explicit stack of
//! [`StringifyFrame`]s. Each step of the loop is one of:
//!
//! - **Visit**: apply `toJSON`, then the replacer function, classify the
//!   result, and either emit a scalar or enter a container
//! - **Next**: advance the innermost frame's cursor to its next child, or
//!   leave the frame when the cursor is exhausted
//! - **End**: the root is finished
//!
//! Entering a container registers its identity in the path set; leaving
//! removes it. Meeting an identity that is already on the path is a cycle.
//! An object reached twice through sibling branches is simply written twice.
//!
//! # Key design decisions
//!
//! - **Snapshot cursors**: an object's declared members and dynamic property
//!   names are captured when it is entered. Values are read when their turn
//!   comes, so callbacks see up-to-date siblings, and a property removed in
//!   the meantime is skipped instead of invalidating the walk.
//! - **Omitted vs. null**: `Undefined` and callables are dropped from objects
//!   (no key, no comma) but written as `null` inside lists, so list indexes
//!   are preserved.
//! - **One output buffer**: fragments are appended to a single owned UTF-16
//!   buffer that belongs to this call only.

use crate::error::{JsonError, Result};
use crate::numconv::number_to_string;
use crate::options::{Indent, StringifyOptions};
use crate::string::JsString;
use crate::value::{Function, List, MemberDescriptor, Object, PrimitiveKind, Value, WrapperMethods};
use std::collections::HashSet;

const TO_JSON: &str = "toJSON";

/// Serialize `value` to JSON text.
///
/// `replacer` may be a list of allowed property names, a function applied to
/// every key/value pair, or `Undefined`/`Null`. `indent` is resolved with
/// [`Indent::resolve`]. Returns `Ok(None)` when the root itself is omitted
/// (it is `Undefined` or callable after `toJSON` and the replacer).
pub fn stringify(value: &Value, replacer: &Value, indent: &Value) -> Result<Option<JsString>> {
    Stringifier::new(replacer, indent)?.stringify(value)
}

enum Container {
    List(List),
    Object(Object),
}

impl Container {
    fn identity(&self) -> usize {
        match self {
            Container::List(list) => list.identity(),
            Container::Object(object) => object.identity(),
        }
    }

    fn as_value(&self) -> Value {
        match self {
            Container::List(list) => Value::List(list.clone()),
            Container::Object(object) => Value::Object(object.clone()),
        }
    }
}

enum Cursor {
    Index(usize),
    Members {
        declared: Vec<MemberDescriptor>,
        next_declared: usize,
        dynamic: Vec<JsString>,
        next_dynamic: usize,
    },
}

/// One open container on the traversal stack.
struct StringifyFrame {
    container: Container,
    cursor: Cursor,
    /// Children actually written; distinguishes `{}` from a filtered-out object.
    written: usize,
}

/// A key/value pair waiting to be visited, with the receiver for callbacks.
struct Pending {
    key: JsString,
    holder: Value,
    value: Value,
}

enum Step {
    Visit(Pending),
    Next,
    End,
}

/// Single-use stringifier state. Create one per call.
pub struct Stringifier<'o> {
    replacer: Option<Function>,
    allowed: Option<HashSet<JsString>>,
    indent: Indent,
    wrapper_methods: Option<&'o dyn WrapperMethods>,
    /// `toJSON` of each primitive wrapper type, resolved on first use.
    wrapper_to_json: [Option<Option<Function>>; 3],
    stack: Vec<StringifyFrame>,
    path: HashSet<usize>,
    out: Vec<u16>,
    root_omitted: bool,
}

impl<'o> Stringifier<'o> {
    pub fn new(replacer: &Value, indent: &Value) -> Result<Self> {
        Self::with_options(replacer, indent, StringifyOptions::default())
    }

    /// Resolve the replacer and indent arguments. Fails with
    /// [`JsonError::InvalidReplacer`] before any traversal happens.
    pub fn with_options(replacer: &Value, indent: &Value, options: StringifyOptions<'o>) -> Result<Self> {
        let (replacer, allowed) = match replacer {
            Value::Undefined | Value::Null => (None, None),
            Value::Function(function) => (Some(function.clone()), None),
            Value::List(list) => (None, Some(allowed_names(list))),
            _ => {
                tracing::debug!("Rejected replacer that is neither a list nor a function");
                return Err(JsonError::InvalidReplacer);
            }
        };

        Ok(Self {
            replacer,
            allowed,
            indent: Indent::resolve(indent),
            wrapper_methods: options.wrapper_methods,
            wrapper_to_json: [None, None, None],
            stack: Vec::new(),
            path: HashSet::new(),
            out: Vec::new(),
            root_omitted: false,
        })
    }

    /// Walk `value` and return the JSON text. No partial output on error.
    pub fn stringify(mut self, value: &Value) -> Result<Option<JsString>> {
        let holder = Object::from_entries([("", value.clone())]);
        let mut step = Step::Visit(Pending {
            key: JsString::new(),
            holder: Value::Object(holder),
            value: value.clone(),
        });

        loop {
            step = match step {
                Step::Visit(pending) => self.visit(pending)?,
                Step::Next => self.next()?,
                Step::End => break,
            };
        }

        if self.root_omitted {
            tracing::debug!("Stringify root was omitted");
            return Ok(None);
        }
        tracing::debug!("Stringified JSON: {} code units", self.out.len());
        Ok(Some(JsString::from(self.out)))
    }

    fn visit(&mut self, pending: Pending) -> Result<Step> {
        let Pending { key, holder, value } = pending;

        let value = self.apply_to_json(&key, value)?;
        let value = match &self.replacer {
            Some(replacer) => replacer.call(&holder, &[Value::Str(key.clone()), value])?,
            None => value,
        };

        let in_list = matches!(
            self.stack.last(),
            Some(StringifyFrame {
                container: Container::List(_),
                ..
            })
        );

        if (value.is_undefined() || value.is_callable()) && !in_list {
            if self.stack.is_empty() {
                self.root_omitted = true;
                return Ok(Step::End);
            }
            return Ok(Step::Next);
        }

        self.begin_entry(&key, in_list);
        match value {
            Value::Undefined | Value::Null | Value::Function(_) => self.push_ascii("null"),
            Value::Bool(b) => self.push_ascii(if b { "true" } else { "false" }),
            Value::Number(n) if n.is_finite() => self.push_ascii(&number_to_string(n)),
            Value::Number(_) => self.push_ascii("null"),
            Value::Str(s) => self.write_quoted(&s),
            Value::List(list) => return self.enter(Container::List(list)),
            Value::Object(object) => return self.enter(Container::Object(object)),
        }

        Ok(if self.stack.is_empty() { Step::End } else { Step::Next })
    }

    /// Replace `value` with the result of its `toJSON(key)` if it has one.
    ///
    /// Objects resolve `toJSON` on every visit (host method, then dynamic
    /// property). Primitives resolve it once per wrapper kind. A `List` holds
    /// only indexed elements and has no named members to look up, so lists
    /// and `Undefined`/`Null` are never dispatched.
    fn apply_to_json(&mut self, key: &JsString, value: Value) -> Result<Value> {
        let method = match &value {
            Value::Object(object) => object.lookup_method(TO_JSON),
            other => match PrimitiveKind::of(other) {
                Some(kind) => self.wrapper_to_json(kind),
                None => None,
            },
        };
        match method {
            Some(method) => Ok(method.call(&value, &[Value::Str(key.clone())])?),
            None => Ok(value),
        }
    }

    fn wrapper_to_json(&mut self, kind: PrimitiveKind) -> Option<Function> {
        let wrapper_methods = self.wrapper_methods;
        self.wrapper_to_json[kind.slot()]
            .get_or_insert_with(|| wrapper_methods.and_then(|w| w.method(kind, TO_JSON)))
            .clone()
    }

    /// Separator, line break and (for object members) the key, ahead of a
    /// child that is definitely being written.
    fn begin_entry(&mut self, key: &JsString, in_list: bool) {
        let depth = self.stack.len();
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        if frame.written > 0 {
            self.out.push(u16::from(b','));
        }
        frame.written += 1;

        if self.indent.is_pretty() {
            self.newline(depth);
        }
        if !in_list {
            self.write_quoted(key);
            self.out.push(u16::from(b':'));
            if self.indent.is_pretty() {
                self.out.push(u16::from(b' '));
            }
        }
    }

    fn enter(&mut self, container: Container) -> Result<Step> {
        if !self.path.insert(container.identity()) {
            tracing::debug!("Cyclic structure detected at depth {}", self.stack.len());
            return Err(JsonError::CyclicStructure);
        }

        let cursor = match &container {
            Container::List(_) => {
                self.out.push(u16::from(b'['));
                Cursor::Index(0)
            }
            Container::Object(object) => {
                self.out.push(u16::from(b'{'));
                Cursor::Members {
                    declared: object
                        .declared_members()
                        .into_iter()
                        .filter(MemberDescriptor::is_serializable)
                        .collect(),
                    next_declared: 0,
                    dynamic: object.keys(),
                    next_dynamic: 0,
                }
            }
        };

        self.stack.push(StringifyFrame {
            container,
            cursor,
            written: 0,
        });
        Ok(Step::Next)
    }

    /// Advance the innermost frame to its next child, or leave it.
    fn next(&mut self) -> Result<Step> {
        let allowed = &self.allowed;
        let Some(frame) = self.stack.last_mut() else {
            return Ok(Step::End);
        };
        let holder = frame.container.as_value();

        match (&frame.container, &mut frame.cursor) {
            (Container::List(list), Cursor::Index(next)) => {
                if *next < list.len() {
                    let index = *next;
                    *next += 1;
                    return Ok(Step::Visit(Pending {
                        key: JsString::from(index.to_string()),
                        holder,
                        value: list.get(index),
                    }));
                }
            }
            (
                Container::Object(object),
                Cursor::Members {
                    declared,
                    next_declared,
                    dynamic,
                    next_dynamic,
                },
            ) => {
                while let Some(member) = declared.get(*next_declared) {
                    *next_declared += 1;
                    let key = JsString::from(member.name.as_str());
                    if !is_allowed(allowed, &key) {
                        continue;
                    }
                    let value = object.read_member(member)?;
                    return Ok(Step::Visit(Pending { key, holder, value }));
                }
                while let Some(key) = dynamic.get(*next_dynamic) {
                    *next_dynamic += 1;
                    if !is_allowed(allowed, key) {
                        continue;
                    }
                    // Removed by a callback since the object was entered.
                    let Some(value) = object.get_key(key) else {
                        continue;
                    };
                    return Ok(Step::Visit(Pending {
                        key: key.clone(),
                        holder,
                        value,
                    }));
                }
            }
            _ => {}
        }

        self.leave()
    }

    fn leave(&mut self) -> Result<Step> {
        let Some(frame) = self.stack.pop() else {
            return Ok(Step::End);
        };
        self.path.remove(&frame.container.identity());

        if frame.written > 0 && self.indent.is_pretty() {
            self.newline(self.stack.len());
        }
        let close = match frame.container {
            Container::List(_) => b']',
            Container::Object(_) => b'}',
        };
        self.out.push(u16::from(close));

        Ok(if self.stack.is_empty() { Step::End } else { Step::Next })
    }

    fn newline(&mut self, depth: usize) {
        self.out.push(u16::from(b'\n'));
        for _ in 0..depth {
            self.out.extend_from_slice(self.indent.units());
        }
    }

    fn push_ascii(&mut self, s: &str) {
        self.out.extend(s.bytes().map(u16::from));
    }

    /// Quote and escape a string. Surrogates are copied as-is.
    fn write_quoted(&mut self, s: &JsString) {
        self.out.push(u16::from(b'"'));
        for &unit in s.as_units() {
            match unit {
                0x22 => self.push_ascii("\\\""),
                0x5C => self.push_ascii("\\\\"),
                0x08 => self.push_ascii("\\b"),
                0x0C => self.push_ascii("\\f"),
                0x0A => self.push_ascii("\\n"),
                0x0D => self.push_ascii("\\r"),
                0x09 => self.push_ascii("\\t"),
                u if u < 0x20 => self.push_ascii(&format!("\\u{u:04x}")),
                u => self.out.push(u),
            }
        }
        self.out.push(u16::from(b'"'));
    }
}

/// Allowed property names from a replacer list: strings and numbers, in
/// order, duplicates ignored.
fn allowed_names(list: &List) -> HashSet<JsString> {
    let mut allowed = HashSet::new();
    for item in list.to_vec() {
        match &item {
            Value::Str(s) => {
                allowed.insert(s.clone());
            }
            Value::Number(_) => {
                allowed.insert(item.to_js_string());
            }
            _ => {}
        }
    }
    allowed
}

fn is_allowed(allowed: &Option<HashSet<JsString>>, key: &JsString) -> bool {
    allowed.as_ref().is_none_or(|set| set.contains(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact(value: &Value) -> String {
        stringify(value, &Value::Undefined, &Value::Undefined)
            .unwrap()
            .unwrap()
            .to_string()
    }

    #[test]
    fn escapes_control_characters_in_lowercase_hex() {
        let value = Value::str("a\u{1}\u{1f}\"\\/");
        assert_eq!(compact(&value), r#""a\u0001\u001f\"\\/""#);
    }

    #[test]
    fn lone_surrogate_is_copied_through() {
        let value = Value::Str(JsString::from(vec![0xD83D]));
        let out = stringify(&value, &Value::Null, &Value::Null).unwrap().unwrap();
        assert_eq!(out.as_units(), &[0x22, 0xD83D, 0x22]);
    }

    #[test]
    fn filtered_object_closes_without_newline() {
        let object = Object::from_entries([("a", Value::Undefined)]);
        let out = stringify(&Value::Object(object), &Value::Null, &Value::from(2)).unwrap().unwrap();
        assert_eq!(out, "{}");
    }

    #[test]
    fn path_set_is_empty_after_success() {
        let shared = Value::List(List::from_vec(vec![Value::from(1)]));
        let root = Value::List(List::from_vec(vec![shared.clone(), shared]));
        let mut stringifier = Stringifier::new(&Value::Null, &Value::Null).unwrap();
        let mut step = stringifier.enter(Container::List(root.as_list().unwrap().clone())).unwrap();
        while !matches!(step, Step::End) {
            step = match step {
                Step::Visit(pending) => stringifier.visit(pending).unwrap(),
                Step::Next => stringifier.next().unwrap(),
                Step::End => unreachable!(),
            };
        }
        assert!(stringifier.path.is_empty());
        assert_eq!(JsString::from(stringifier.out), "[[1],[1]]");
    }
}
