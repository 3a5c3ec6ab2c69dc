use jsonrt_core::{
    stringify, Function, HostError, HostObject, List, MemberDescriptor, Object, Value,
};
use std::cell::Cell;
use std::rc::Rc;

/// A host type with one member of every kind the stringifier has to classify.
struct Point {
    x: f64,
    y: f64,
    reads: Rc<Cell<usize>>,
}

impl Point {
    fn new(x: f64, y: f64) -> Self {
        Point {
            x,
            y,
            reads: Rc::default(),
        }
    }
}

impl HostObject for Point {
    fn type_name(&self) -> &str {
        "Point"
    }

    fn declared_members(&self) -> Vec<MemberDescriptor> {
        vec![
            MemberDescriptor::constant("DIMENSIONS"),
            MemberDescriptor::field("x"),
            MemberDescriptor::field("y"),
            MemberDescriptor::getter("length"),
            MemberDescriptor::setter("scale"),
            MemberDescriptor::field("cache").non_public(),
            MemberDescriptor::method("toString"),
            MemberDescriptor::field("origin").as_static(),
        ]
    }

    fn read_member(&self, member: &MemberDescriptor) -> Result<Value, HostError> {
        self.reads.set(self.reads.get() + 1);
        Ok(match member.name.as_str() {
            "DIMENSIONS" => Value::from(2),
            "x" => Value::Number(self.x),
            "y" => Value::Number(self.y),
            "length" => Value::Number((self.x * self.x + self.y * self.y).sqrt()),
            "origin" => Value::str("zero"),
            other => return Err(format!("unreadable member {other}").into()),
        })
    }
}

/// A host type whose only getter fails.
struct Faulty;

impl HostObject for Faulty {
    fn type_name(&self) -> &str {
        "Faulty"
    }

    fn declared_members(&self) -> Vec<MemberDescriptor> {
        vec![MemberDescriptor::getter("broken")]
    }

    fn read_member(&self, _member: &MemberDescriptor) -> Result<Value, HostError> {
        Err("getter exploded".into())
    }
}

/// A host type that serializes itself through a declared `toJSON` method.
struct Date {
    iso: &'static str,
}

impl HostObject for Date {
    fn type_name(&self) -> &str {
        "Date"
    }

    fn declared_members(&self) -> Vec<MemberDescriptor> {
        vec![MemberDescriptor::method("toJSON")]
    }

    fn method(&self, name: &str) -> Option<Function> {
        let iso = self.iso;
        (name == "toJSON").then(|| Function::new(move |_, _| Ok(Value::str(iso))))
    }
}

fn compact(value: &Value) -> String {
    stringify(value, &Value::Null, &Value::Null)
        .unwrap()
        .unwrap()
        .to_string()
}

// ============================================================================
// Declared Members
// ============================================================================

#[test]
fn only_public_readable_members_are_written() {
    let point = Object::with_host(Point::new(3.0, 4.0));
    assert_eq!(
        compact(&Value::Object(point)),
        r#"{"DIMENSIONS":2,"x":3,"y":4,"length":5}"#
    );
}

#[test]
fn declared_members_precede_dynamic_properties() {
    let point = Object::with_host(Point::new(1.0, 0.0));
    point.set("label", Value::str("p"));
    point.set("extra", Value::Bool(true));
    assert_eq!(
        compact(&Value::Object(point)),
        r#"{"DIMENSIONS":2,"x":1,"y":0,"length":1,"label":"p","extra":true}"#
    );
}

#[test]
fn replacer_list_applies_to_declared_members() {
    let point = Object::with_host(Point::new(1.0, 2.0));
    point.set("label", Value::str("p"));
    let allow = Value::List(List::from_vec(vec![Value::str("label"), Value::str("y")]));
    let out = stringify(&Value::Object(point), &allow, &Value::Null).unwrap().unwrap();
    assert_eq!(out, r#"{"y":2,"label":"p"}"#);
}

#[test]
fn filtered_members_are_never_read() {
    let host = Point::new(1.0, 1.0);
    let reads = host.reads.clone();
    let point = Object::with_host(host);
    let allow = Value::List(List::from_vec(vec![Value::str("x")]));
    stringify(&Value::Object(point), &allow, &Value::Null).unwrap();
    assert_eq!(reads.get(), 1);
}

/// A host type with a per-instance counter and a class-wide one.
struct Counter;

impl HostObject for Counter {
    fn type_name(&self) -> &str {
        "Counter"
    }

    fn declared_members(&self) -> Vec<MemberDescriptor> {
        vec![
            MemberDescriptor::field("count"),
            MemberDescriptor::field("instances").as_static(),
            MemberDescriptor::constant("LIMIT").as_static(),
            MemberDescriptor::constant("step"),
        ]
    }

    fn read_member(&self, member: &MemberDescriptor) -> Result<Value, HostError> {
        Ok(match member.name.as_str() {
            "count" => Value::from(1),
            "instances" => Value::from(99),
            "LIMIT" => Value::from(1000),
            "step" => Value::from(5),
            other => return Err(format!("unreadable member {other}").into()),
        })
    }
}

#[test]
fn static_members_are_not_written() {
    let counter = Object::with_host(Counter);
    assert_eq!(compact(&Value::Object(counter)), r#"{"count":1,"step":5}"#);
}

#[test]
fn getter_failure_propagates() {
    let value = Value::List(List::from_vec(vec![Value::Object(Object::with_host(Faulty))]));
    let err = stringify(&value, &Value::Null, &Value::Null).unwrap_err();
    assert_eq!(err.to_string(), "getter exploded");
    assert!(err.into_host().is_some());
}

#[test]
fn host_objects_nest_with_indentation() {
    let point = Object::with_host(Point::new(0.0, 0.0));
    let value = Value::Object(Object::from_entries([("at", Value::Object(point))]));
    let out = stringify(&value, &Value::Null, &Value::from(1)).unwrap().unwrap();
    assert_eq!(
        out.to_string(),
        "{\n \"at\": {\n  \"DIMENSIONS\": 2,\n  \"x\": 0,\n  \"y\": 0,\n  \"length\": 0\n }\n}"
    );
}

// ============================================================================
// Host Methods
// ============================================================================

#[test]
fn declared_to_json_method_is_used() {
    let date = Object::with_host(Date { iso: "2024-01-02T03:04:05Z" });
    let value = Value::Object(Object::from_entries([("created", Value::Object(date))]));
    assert_eq!(compact(&value), r#"{"created":"2024-01-02T03:04:05Z"}"#);
}

#[test]
fn host_method_takes_precedence_over_dynamic_to_json() {
    let date = Object::with_host(Date { iso: "host" });
    date.set("toJSON", Value::Function(Function::new(|_, _| Ok(Value::str("dynamic")))));
    assert_eq!(compact(&Value::Object(date)), r#""host""#);
}

#[test]
fn type_name_shows_in_string_conversion() {
    let point = Value::Object(Object::with_host(Point::new(0.0, 0.0)));
    assert_eq!(point.to_js_string(), "[object Point]");
    assert_eq!(Value::Object(Object::new()).to_js_string(), "[object Object]");
}
