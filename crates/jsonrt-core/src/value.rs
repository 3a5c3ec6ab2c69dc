//! Host value model consumed by the parser and stringifier.
//!
//! A [`Value`] is either a primitive, an index-addressed [`List`], an
//! [`Object`], or a callable [`Function`]. Objects carry two member sources:
//! members declared by a host type (see [`HostObject`]) and dynamically
//! attached properties kept in insertion order. Lists and objects are shared
//! handles with identity, so a graph built from them may contain cycles.
//!
//! # Key design decisions
//!
//! - **Snapshot reads**: every accessor clones values out and releases the
//!   interior borrow before returning, so host callbacks invoked by the codec
//!   can freely mutate the containers being walked.
//! - **Iterative teardown**: dropping a deeply nested list/object tree is done
//!   with an explicit work list instead of recursive `Drop`, keeping native
//!   stack usage flat for attacker-controlled nesting depth.
//! - **Ordered properties without `IndexMap`**: `PropertyMap` is a
//!   `Vec<(JsString, Value)>` plus a position index.

use crate::error::HostError;
use crate::numconv::number_to_string;
use crate::string::JsString;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::mem;
use std::rc::Rc;

/// Any datum the codec can read or produce.
#[derive(Clone, Default)]
pub enum Value {
    /// The runtime's "undefined" sentinel.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(JsString),
    List(List),
    Object(Object),
    Function(Function),
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(JsString::from(s))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_js_str(&self) -> Option<&JsString> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Generic value-to-string conversion (`String(value)` in the runtime).
    ///
    /// Lists join their elements with `,`; nested containers inside a list are
    /// rendered by their tag rather than expanded.
    pub fn to_js_string(&self) -> JsString {
        match self {
            Value::Str(s) => s.clone(),
            Value::List(list) => {
                let mut units = Vec::new();
                for (i, item) in list.to_vec().iter().enumerate() {
                    if i > 0 {
                        units.push(u16::from(b','));
                    }
                    match item {
                        Value::Undefined | Value::Null => {}
                        Value::List(_) | Value::Object(_) | Value::Function(_) => {
                            units.extend(JsString::from(item.tag().as_str()).as_units())
                        }
                        other => units.extend(other.to_js_string().as_units()),
                    }
                }
                JsString::from(units)
            }
            other => JsString::from(other.tag().as_str()),
        }
    }

    fn tag(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::Str(s) => s.to_string_lossy(),
            Value::List(_) => "[object Array]".to_string(),
            Value::Object(object) => format!("[object {}]", object.type_name()),
            Value::Function(_) => "function Function() {}".to_string(),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality. Containers compare by content (identity short-cuts
    /// the comparison); functions compare by identity.
    ///
    /// Walks an explicit work list, so nesting depth costs heap rather than
    /// native stack. A pair of containers already under comparison is assumed
    /// equal when met again, which makes cyclic graphs terminate.
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self.clone(), other.clone())];
        let mut visited: HashSet<(usize, usize)> = HashSet::new();

        while let Some((a, b)) = pending.pop() {
            match (&a, &b) {
                (Value::List(x), Value::List(y)) => {
                    if x.ptr_eq(y) || !visited.insert((x.identity(), y.identity())) {
                        continue;
                    }
                    let (xs, ys) = (x.to_vec(), y.to_vec());
                    if xs.len() != ys.len() {
                        return false;
                    }
                    pending.extend(xs.into_iter().zip(ys));
                }
                (Value::Object(x), Value::Object(y)) => {
                    if x.ptr_eq(y) || !visited.insert((x.identity(), y.identity())) {
                        continue;
                    }
                    if x.host().is_some() || y.host().is_some() {
                        return false;
                    }
                    let (xs, ys) = (x.properties(), y.properties());
                    if xs.len() != ys.len() {
                        return false;
                    }
                    for ((kx, vx), (ky, vy)) in xs.into_iter().zip(ys) {
                        if kx != ky {
                            return false;
                        }
                        pending.push((vx, vy));
                    }
                }
                _ => {
                    if !scalar_eq(&a, &b) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
        _ => false,
    }
}

enum DebugItem {
    Value(Value),
    Text(&'static str),
    Key(JsString),
    Leave(usize),
}

impl fmt::Debug for Value {
    /// Renders without native recursion. A container met again while it is
    /// still open is printed as `[...]` or `{...}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = vec![DebugItem::Value(self.clone())];
        let mut path: HashSet<usize> = HashSet::new();

        while let Some(item) = pending.pop() {
            let value = match item {
                DebugItem::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                DebugItem::Key(key) => {
                    write!(f, "{key:?}: ")?;
                    continue;
                }
                DebugItem::Leave(identity) => {
                    path.remove(&identity);
                    continue;
                }
                DebugItem::Value(value) => value,
            };

            match value {
                Value::Undefined => f.write_str("undefined")?,
                Value::Null => f.write_str("null")?,
                Value::Bool(b) => write!(f, "{b}")?,
                Value::Number(n) => f.write_str(&number_to_string(n))?,
                Value::Str(s) => write!(f, "{s:?}")?,
                Value::Function(_) => f.write_str("function")?,
                Value::List(list) => {
                    if !path.insert(list.identity()) {
                        f.write_str("[...]")?;
                        continue;
                    }
                    f.write_str("[")?;
                    pending.push(DebugItem::Leave(list.identity()));
                    pending.push(DebugItem::Text("]"));
                    for (i, item) in list.to_vec().into_iter().enumerate().rev() {
                        pending.push(DebugItem::Value(item));
                        if i > 0 {
                            pending.push(DebugItem::Text(", "));
                        }
                    }
                }
                Value::Object(object) => {
                    if let Some(host) = object.host() {
                        write!(f, "{} ", host.type_name())?;
                    }
                    if !path.insert(object.identity()) {
                        f.write_str("{...}")?;
                        continue;
                    }
                    f.write_str("{")?;
                    pending.push(DebugItem::Leave(object.identity()));
                    pending.push(DebugItem::Text("}"));
                    for (i, (key, item)) in object.properties().into_iter().enumerate().rev() {
                        pending.push(DebugItem::Value(item));
                        pending.push(DebugItem::Key(key));
                        if i > 0 {
                            pending.push(DebugItem::Text(", "));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(JsString::from(s))
    }
}

impl From<JsString> for Value {
    fn from(s: JsString) -> Self {
        Value::Str(s)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(function)
    }
}

// ============================================================================
// Lists
// ============================================================================

/// Shared, growable, index-addressed sequence of values.
#[derive(Clone, Default)]
pub struct List(Rc<ListData>);

#[derive(Default)]
struct ListData {
    items: RefCell<Vec<Value>>,
}

impl List {
    pub fn new() -> Self {
        List::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        List(Rc::new(ListData {
            items: RefCell::new(items),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, or `Undefined` past the end.
    pub fn get(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    pub fn push(&self, value: Value) {
        self.0.items.borrow_mut().push(value);
    }

    /// Store `value` at `index`, growing the list with `Undefined` if needed.
    pub fn set(&self, index: usize, value: Value) {
        let mut items = self.0.items.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Comparable token identifying this allocation.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::List(self.clone()), f)
    }
}

impl Drop for ListData {
    fn drop(&mut self) {
        dismantle(mem::take(self.items.get_mut()));
    }
}

// ============================================================================
// Objects
// ============================================================================

/// Shared object: an optional host part plus dynamically attached properties.
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

struct ObjectData {
    host: Option<Box<dyn HostObject>>,
    properties: RefCell<PropertyMap>,
}

impl Object {
    /// A plain object with no declared members.
    pub fn new() -> Self {
        Object(Rc::new(ObjectData {
            host: None,
            properties: RefCell::new(PropertyMap::default()),
        }))
    }

    /// An instance of a host type; declared members come from `host`.
    pub fn with_host(host: impl HostObject + 'static) -> Self {
        Object(Rc::new(ObjectData {
            host: Some(Box::new(host)),
            properties: RefCell::new(PropertyMap::default()),
        }))
    }

    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<JsString>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let object = Object::new();
        for (key, value) in entries {
            object.set(key, value);
        }
        object
    }

    pub fn type_name(&self) -> &str {
        self.0.host.as_ref().map_or("Object", |h| h.type_name())
    }

    pub fn host(&self) -> Option<&dyn HostObject> {
        self.0.host.as_deref()
    }

    /// Dynamic property lookup.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_key(&JsString::from(key))
    }

    pub fn get_key(&self, key: &JsString) -> Option<Value> {
        self.0.properties.borrow().get(key).cloned()
    }

    /// Attach or overwrite a dynamic property. Overwriting keeps its position.
    pub fn set(&self, key: impl Into<JsString>, value: Value) {
        self.0.properties.borrow_mut().insert(key.into(), value);
    }

    pub fn remove(&self, key: &JsString) -> Option<Value> {
        self.0.properties.borrow_mut().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of dynamic properties.
    pub fn len(&self) -> usize {
        self.0.properties.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the dynamic property names in insertion order.
    pub fn keys(&self) -> Vec<JsString> {
        self.0.properties.borrow().keys()
    }

    /// Snapshot of the dynamic properties in insertion order.
    pub fn properties(&self) -> Vec<(JsString, Value)> {
        self.0.properties.borrow().entries.clone()
    }

    /// Declared members of the host type, in declaration order.
    pub fn declared_members(&self) -> Vec<MemberDescriptor> {
        self.0.host
            .as_ref()
            .map(|h| h.declared_members())
            .unwrap_or_default()
    }

    pub fn read_member(&self, member: &MemberDescriptor) -> Result<Value, HostError> {
        match &self.0.host {
            Some(host) => host.read_member(member),
            None => Ok(Value::Undefined),
        }
    }

    /// Resolve a method: the host type first, then a dynamic property holding a function.
    pub fn lookup_method(&self, name: &str) -> Option<Function> {
        if let Some(method) = self.0.host.as_ref().and_then(|h| h.method(name)) {
            return Some(method);
        }
        match self.get(name) {
            Some(Value::Function(function)) => Some(function),
            _ => None,
        }
    }

    /// Comparable token identifying this allocation.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::Object(self.clone()), f)
    }
}

impl Drop for ObjectData {
    fn drop(&mut self) {
        let entries = mem::take(&mut self.properties.get_mut().entries);
        dismantle(entries.into_iter().map(|(_, value)| value).collect());
    }
}

/// Release a container's children without recursing through nested containers.
///
/// Children that are the last handle to their allocation are emptied into the
/// work list before being dropped, so each `Drop` sees an empty container.
fn dismantle(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::List(list) => {
                if let Ok(mut data) = Rc::try_unwrap(list.0) {
                    pending.append(data.items.get_mut());
                }
            }
            Value::Object(object) => {
                if let Ok(mut data) = Rc::try_unwrap(object.0) {
                    let entries = mem::take(&mut data.properties.get_mut().entries);
                    pending.extend(entries.into_iter().map(|(_, value)| value));
                }
            }
            _ => {}
        }
    }
}

/// Insertion-ordered property store with unique keys.
#[derive(Default, Clone)]
pub struct PropertyMap {
    entries: Vec<(JsString, Value)>,
    index: HashMap<JsString, usize>,
}

impl PropertyMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &JsString) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Last write wins; an existing key keeps its original position.
    pub fn insert(&mut self, key: JsString, value: Value) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn remove(&mut self, key: &JsString) -> Option<Value> {
        let position = self.index.remove(key)?;
        let (_, value) = self.entries.remove(position);
        for (k, _) in &self.entries[position..] {
            if let Some(i) = self.index.get_mut(k) {
                *i -= 1;
            }
        }
        Some(value)
    }

    pub fn keys(&self) -> Vec<JsString> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }
}

// ============================================================================
// Host types
// ============================================================================

/// Member source for objects backed by a host type.
///
/// Implementors describe the members their type declares and how to read them;
/// dynamic properties are handled by [`Object`] itself.
pub trait HostObject {
    /// Class name used by `to_js_string` and `Debug`.
    fn type_name(&self) -> &str;

    /// Declared members in declaration order.
    fn declared_members(&self) -> Vec<MemberDescriptor> {
        Vec::new()
    }

    /// Read a declared member (field, constant, or get-accessor).
    fn read_member(&self, member: &MemberDescriptor) -> Result<Value, HostError> {
        let _ = member;
        Ok(Value::Undefined)
    }

    /// Resolve a method declared by the type, e.g. `toJSON`.
    fn method(&self, name: &str) -> Option<Function> {
        let _ = name;
        None
    }
}

/// Metadata for one declared member of a host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub name: String,
    pub kind: MemberKind,
    pub visibility: Visibility,
    pub access: Access,
    pub is_static: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Constant,
    Field,
    Accessor,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    NonPublic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl MemberDescriptor {
    fn new(name: &str, kind: MemberKind, access: Access, is_static: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            visibility: Visibility::Public,
            access,
            is_static,
        }
    }

    pub fn field(name: &str) -> Self {
        Self::new(name, MemberKind::Field, Access::ReadWrite, false)
    }

    pub fn constant(name: &str) -> Self {
        Self::new(name, MemberKind::Constant, Access::ReadOnly, false)
    }

    pub fn getter(name: &str) -> Self {
        Self::new(name, MemberKind::Accessor, Access::ReadOnly, false)
    }

    pub fn setter(name: &str) -> Self {
        Self::new(name, MemberKind::Accessor, Access::WriteOnly, false)
    }

    pub fn accessor(name: &str) -> Self {
        Self::new(name, MemberKind::Accessor, Access::ReadWrite, false)
    }

    pub fn method(name: &str) -> Self {
        Self::new(name, MemberKind::Method, Access::ReadOnly, false)
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Public, readable instance data: constants, fields, and get-accessors.
    /// Static members belong to the type, not the instance, and are skipped.
    pub fn is_serializable(&self) -> bool {
        self.visibility == Visibility::Public
            && self.access != Access::WriteOnly
            && self.kind != MemberKind::Method
            && !self.is_static
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Signature of a callable host value: `(this, arguments) -> result`.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value, HostError>;

/// Shared callable host value.
#[derive(Clone)]
pub struct Function(Rc<NativeFn>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, HostError> + 'static,
    {
        Function(Rc::new(f))
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, HostError> {
        (self.0)(this, args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("function")
    }
}

/// Wrapper types of primitives that may carry methods such as `toJSON`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Boolean,
    Number,
    String,
}

impl PrimitiveKind {
    pub(crate) fn of(value: &Value) -> Option<PrimitiveKind> {
        match value {
            Value::Bool(_) => Some(PrimitiveKind::Boolean),
            Value::Number(_) => Some(PrimitiveKind::Number),
            Value::Str(_) => Some(PrimitiveKind::String),
            _ => None,
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            PrimitiveKind::Boolean => 0,
            PrimitiveKind::Number => 1,
            PrimitiveKind::String => 2,
        }
    }
}

/// Host-side method resolution for the wrapper types of primitives.
pub trait WrapperMethods {
    fn method(&self, kind: PrimitiveKind, name: &str) -> Option<Function>;
}
