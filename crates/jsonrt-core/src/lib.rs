//! # jsonrt-core
//!
//! JSON codec for a dynamic-language runtime: a strict parser that turns JSON
//! text into runtime [`Value`]s and a stringifier that turns live value graphs
//! (including host objects with declared members) back into JSON text.
//!
//! Both directions replace recursion with an explicit stack of frames, so
//! native stack usage stays flat no matter how deeply the input text or the
//! object graph is nested.
//!
//! ## Quick start
//!
//! ```rust
//! use jsonrt_core::{parse, stringify, Value};
//!
//! let value = parse(r#"{"name":"Alice","scores":[95,87,92]}"#, None).unwrap();
//! let text = stringify(&value, &Value::Undefined, &Value::Undefined).unwrap().unwrap();
//! assert_eq!(text, r#"{"name":"Alice","scores":[95,87,92]}"#);
//!
//! // Pretty-printing with a numeric indent (clamped to 10)
//! let pretty = stringify(&value, &Value::Null, &Value::from(2)).unwrap().unwrap();
//! assert!(pretty.to_string().starts_with("{\n  \"name\": \"Alice\""));
//! ```
//!
//! ## Modules
//!
//! - [`parser`]: JSON text → `Value`, with optional reviver
//! - [`stringifier`]: `Value` → JSON text, with replacer, `toJSON`, indentation, cycle detection
//! - [`value`]: host value model (`Value`, `List`, `Object`, `HostObject`, `Function`)
//! - [`string`]: `JsString`, the UTF-16 string type
//! - [`numconv`]: number ⇄ string conversion
//! - [`options`]: parser/stringifier configuration and indent resolution
//! - [`interop`]: conversions to and from `serde_json::Value`
//! - [`error`]: error types for parse/stringify failures

pub mod error;
pub mod interop;
pub mod numconv;
pub mod options;
pub mod parser;
pub mod string;
pub mod stringifier;
pub mod value;

pub use error::{HostError, JsonError, SyntaxMessage};
pub use interop::to_serde_json;
pub use options::{Indent, ParseOptions, StringifyOptions};
pub use parser::{parse, parse_utf16, parse_value, Parser};
pub use string::JsString;
pub use stringifier::{stringify, Stringifier};
pub use value::{
    Access, Function, HostObject, List, MemberDescriptor, MemberKind, Object, PrimitiveKind,
    Value, Visibility, WrapperMethods,
};
