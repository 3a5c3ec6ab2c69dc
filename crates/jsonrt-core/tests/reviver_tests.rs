use jsonrt_core::{parse, Function, HostError, JsonError, List, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn key_of(args: &[Value]) -> String {
    args[0].to_js_string().to_string_lossy()
}

/// Reviver that records every key it sees, in call order, and returns the value unchanged.
fn recording() -> (Function, Rc<RefCell<Vec<String>>>) {
    let seen: Rc<RefCell<Vec<String>>> = Rc::default();
    let log = seen.clone();
    let reviver = Function::new(move |_, args| {
        log.borrow_mut().push(key_of(args));
        Ok(args[1].clone())
    });
    (reviver, seen)
}

#[derive(Debug)]
struct Rejected(String);

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rejected {}", self.0)
    }
}

impl std::error::Error for Rejected {}

// ============================================================================
// Delete vs. Preserve
// ============================================================================

#[test]
fn undefined_deletes_object_member() {
    let reviver = Function::new(|_, args| {
        if key_of(args) == "b" {
            Ok(Value::Undefined)
        } else {
            Ok(args[1].clone())
        }
    });
    let value = parse(r#"{"a":1,"b":2}"#, Some(&reviver)).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert_eq!(object.get("a"), Some(Value::Number(1.0)));
    assert!(!object.contains_key("b"));
}

#[test]
fn undefined_keeps_list_slot() {
    let reviver = Function::new(|_, args| {
        if key_of(args) == "1" {
            Ok(Value::Undefined)
        } else {
            Ok(args[1].clone())
        }
    });
    let value = parse("[1,2,3]", Some(&reviver)).unwrap();
    let list = value.as_list().unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(
        list.to_vec(),
        vec![Value::Number(1.0), Value::Undefined, Value::Number(3.0)]
    );
}

#[test]
fn undefined_root_is_returned() {
    let reviver = Function::new(|_, _| Ok(Value::Undefined));
    assert_eq!(parse(r#"{"a":[1]}"#, Some(&reviver)).unwrap(), Value::Undefined);
}

// ============================================================================
// Traversal Order and Receivers
// ============================================================================

#[test]
fn children_are_revived_before_their_container() {
    let (reviver, seen) = recording();
    parse(r#"{"a":{"b":1,"c":[true]},"d":null}"#, Some(&reviver)).unwrap();
    let seen = seen.borrow();
    let position = |key: &str| seen.iter().position(|k| k == key).unwrap();
    assert!(position("b") < position("a"));
    assert!(position("c") < position("a"));
    assert!(position("0") < position("c"));
    assert!(position("a") < position(""));
    assert!(position("d") < position(""));
    assert_eq!(seen.last().map(String::as_str), Some(""));
    assert_eq!(seen.len(), 6);
}

#[test]
fn scalar_root_is_revived_under_empty_key() {
    let reviver = Function::new(|this, args| {
        assert_eq!(key_of(args), "");
        let holder = this.as_object().expect("holder object");
        assert_eq!(holder.get(""), Some(args[1].clone()));
        Ok(Value::str("revived"))
    });
    assert_eq!(parse("42", Some(&reviver)).unwrap(), Value::str("revived"));
}

#[test]
fn revived_values_replace_originals() {
    let reviver = Function::new(|_, args| {
        Ok(match &args[1] {
            Value::Number(n) => Value::Number(n * 10.0),
            other => other.clone(),
        })
    });
    let value = parse(r#"{"a":1,"b":[2,{"c":3}]}"#, Some(&reviver)).unwrap();
    let expected = parse(r#"{"a":10,"b":[20,{"c":30}]}"#, None).unwrap();
    assert_eq!(value, expected);
}

#[test]
fn object_member_receiver_is_the_parent_object() {
    let reviver = Function::new(|this, args| {
        let key = key_of(args);
        if key == "b" {
            let parent = this.as_object().expect("parent object");
            // "a" was revived first and its replacement is visible here.
            return Ok(parent.get("a").unwrap_or_default());
        }
        if key == "a" {
            return Ok(Value::str("A"));
        }
        Ok(args[1].clone())
    });
    let value = parse(r#"{"a":1,"b":2}"#, Some(&reviver)).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.get("b"), Some(Value::str("A")));
}

#[test]
fn list_element_receiver_exposes_only_that_index() {
    let reviver = Function::new(|this, args| {
        let key = key_of(args);
        if let Ok(index) = key.parse::<usize>() {
            let holder = this.as_object().expect("element holder");
            assert_eq!(holder.len(), 1);
            assert_eq!(holder.get(&index.to_string()), Some(args[1].clone()));
        }
        Ok(args[1].clone())
    });
    let value = parse(r#"["x","y"]"#, Some(&reviver)).unwrap();
    assert_eq!(value.as_list().map(List::len), Some(2));
}

#[test]
fn reviver_sees_already_revived_children() {
    let reviver = Function::new(|_, args| {
        if key_of(args) == "inner" {
            let inner = args[1].as_object().expect("inner object");
            assert_eq!(inner.get("n"), Some(Value::str("changed")));
        }
        if key_of(args) == "n" {
            return Ok(Value::str("changed"));
        }
        Ok(args[1].clone())
    });
    parse(r#"{"inner":{"n":0}}"#, Some(&reviver)).unwrap();
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn reviver_error_propagates_unchanged() {
    let reviver = Function::new(|_, args| {
        if key_of(args) == "bad" {
            return Err(Box::new(Rejected("bad".into())) as HostError);
        }
        Ok(args[1].clone())
    });
    let err = parse(r#"{"ok":1,"bad":2}"#, Some(&reviver)).unwrap_err();
    assert_eq!(err.to_string(), "rejected bad");
    let host = err.into_host().expect("host error");
    assert_eq!(host.downcast_ref::<Rejected>().map(|r| r.0.as_str()), Some("bad"));
}

#[test]
fn syntax_error_wins_over_reviver() {
    let (reviver, seen) = recording();
    let err = parse(r#"{"a":[1,2}"#, Some(&reviver)).unwrap_err();
    assert!(matches!(err, JsonError::Syntax { .. }));
    assert!(!seen.borrow().contains(&String::new()));
}

#[test]
fn reviver_may_reenter_parse() {
    let reviver = Function::new(|_, args| {
        if let Value::Str(text) = &args[1] {
            return Ok(parse(&text.to_string_lossy(), None)?);
        }
        Ok(args[1].clone())
    });
    let value = parse(r#"{"nested":"[1,{\"x\":true}]"}"#, Some(&reviver)).unwrap();
    let nested = value.as_object().unwrap().get("nested").unwrap();
    assert_eq!(nested, parse(r#"[1,{"x":true}]"#, None).unwrap());
}
