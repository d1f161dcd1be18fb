//! Field values
//!
//! [`Value`] is the dynamically-typed value stored in item fields and in
//! resolved mappings. [`Inheritable`] wraps a stored field so that "take
//! this from the ancestor chain" is a variant rather than a magic string.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wire form of [`Inheritable::Inherit`]
pub const INHERIT: &str = "<<inherit>>";

/// An ordered string-keyed mapping of values (resolved mappings, dict fields)
pub type Mapping = IndexMap<String, Value>;

/// A field value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(Mapping),
}

impl Value {
    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// List contents, if this is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Dict contents, if this is a dict
    pub fn as_dict(&self) -> Option<&Mapping> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Integer contents, if this is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Python-style truthiness: null, false, zero and empty values are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(map) => !map.is_empty(),
        }
    }

    /// Render as the string form a setter would accept back
    ///
    /// Lists join with single spaces, dicts become `key=value` pairs.
    pub fn to_input_string(&self) -> String {
        match self {
            Value::List(items) => items
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" "),
            Value::Dict(map) => map
                .iter()
                .map(|(k, v)| match v {
                    Value::Null => k.clone(),
                    v => format!("{}={}", k, v),
                })
                .collect::<Vec<_>>()
                .join(" "),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(_) | Value::Dict(_) => write!(f, "{}", self.to_input_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Dict(map)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Dict(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// A stored field: either a concrete value or "inherit from the parent"
#[derive(Debug, Clone, PartialEq)]
pub enum Inheritable<T> {
    /// Resolve from the ancestor chain (or settings) at blend time
    Inherit,
    /// A value set on this item
    Value(T),
}

impl<T> Inheritable<T> {
    /// Whether this slot inherits
    pub fn is_inherit(&self) -> bool {
        matches!(self, Inheritable::Inherit)
    }

    /// The concrete value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            Inheritable::Inherit => None,
            Inheritable::Value(v) => Some(v),
        }
    }
}

impl Inheritable<Value> {
    /// Parse raw setter input; only the literal marker string means inherit
    pub fn from_raw(raw: Value) -> Self {
        match raw {
            Value::Str(s) if s == INHERIT => Inheritable::Inherit,
            v => Inheritable::Value(v),
        }
    }

    /// Concrete string contents, if any
    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }
}

impl<T: Serialize> Serialize for Inheritable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Inheritable::Inherit => serializer.serialize_str(INHERIT),
            Inheritable::Value(v) => v.serialize(serializer),
        }
    }
}

impl<T> From<T> for Inheritable<T> {
    fn from(v: T) -> Self {
        Inheritable::Value(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::Bool(true).is_truthy());
    }

    #[test]
    fn test_input_string() {
        let list = Value::from(vec!["a", "b", "c"]);
        assert_eq!(list.to_input_string(), "a b c");

        let mut map = Mapping::new();
        map.insert("quiet".to_string(), Value::Null);
        map.insert("console".to_string(), Value::from("ttyS0"));
        assert_eq!(Value::Dict(map).to_input_string(), "quiet console=ttyS0");
    }

    #[test]
    fn test_inherit_serializes_as_marker() {
        let slot: Inheritable<Value> = Inheritable::Inherit;
        assert_eq!(serde_json::to_string(&slot).unwrap(), "\"<<inherit>>\"");

        let slot = Inheritable::Value(Value::Int(3));
        assert_eq!(serde_json::to_string(&slot).unwrap(), "3");
    }

    #[test]
    fn test_from_raw() {
        assert!(Inheritable::from_raw(Value::from(INHERIT)).is_inherit());
        assert_eq!(
            Inheritable::from_raw(Value::from("inherit")),
            Inheritable::Value(Value::from("inherit"))
        );
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({"a": 1, "b": [true, "x"], "c": 1.5, "d": null});
        let value = Value::from(json);
        let map = value.as_dict().unwrap();
        assert_eq!(map["a"], Value::Int(1));
        assert_eq!(map["b"], Value::List(vec![Value::Bool(true), Value::from("x")]));
        assert_eq!(map["c"], Value::Float(1.5));
        assert_eq!(map["d"], Value::Null);
    }

    #[test]
    fn test_float_display() {
        assert_eq!(Value::Float(5.0).to_string(), "5");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }
}
