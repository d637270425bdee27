//! Runtime values and their types.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Semantic type of a value, event-data field or action input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
    /// Host value passed through without inspection.
    Constant,
}

impl ValueType {
    /// Returns the value an action input receives when the call site omits it.
    ///
    /// `Constant` inputs have no zero value.
    pub fn zero(&self) -> Option<Value> {
        match self {
            ValueType::String => Some(Value::Str(String::new())),
            ValueType::Int => Some(Value::Int(0)),
            ValueType::Float => Some(Value::Float(0.0)),
            ValueType::Bool => Some(Value::Bool(false)),
            ValueType::Constant => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Constant => "constant",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "str" => Ok(ValueType::String),
            "int" | "integer" => Ok(ValueType::Int),
            "float" => Ok(ValueType::Float),
            "bool" | "boolean" => Ok(ValueType::Bool),
            "constant" => Ok(ValueType::Constant),
            other => Err(format!("unknown value type '{}'", other)),
        }
    }
}

/// Opaque host value.
///
/// Equality is identity: two `Opaque`s are equal only if they share the same
/// allocation.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Opaque(..)")
    }
}

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Opaque(Opaque),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Str(_) => ValueType::String,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
            Value::Opaque(_) => ValueType::Constant,
        }
    }

    /// Wraps an arbitrary host value as an opaque constant.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Opaque::new(value))
    }

    /// Converts a JSON value.
    ///
    /// Booleans, integers that fit in `i64`, floating-point numbers and
    /// strings map to the matching variant. Anything else, including integers
    /// outside the `i64` range, is kept as an opaque constant holding the JSON
    /// value.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None if n.is_f64() => n
                    .as_f64()
                    .map(Value::Float)
                    .unwrap_or_else(|| Value::opaque(json.clone())),
                None => Value::opaque(json.clone()),
            },
            other => Value::opaque(other.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Opaque(o) => o.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Opaque(_) => f.write_str("<constant>"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Opaque> for Value {
    fn from(o: Opaque) -> Self {
        Value::Opaque(o)
    }
}

macro_rules! int_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Int(i64::from(i))
                }
            }
        )*
    };
}

int_from!(i8, i16, i32, i64, u8, u16, u32);

// Values outside the i64 range become opaque constants holding the original.
macro_rules! int_try_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    match i64::try_from(i) {
                        Ok(i) => Value::Int(i),
                        Err(_) => Value::opaque(i),
                    }
                }
            }
        )*
    };
}

int_try_from!(u64, isize, usize);

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f64::from(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// Event-data carried by an emitted event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(BTreeMap<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds a payload from a JSON object. Returns `None` for other JSON
    /// values.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        json.as_object().map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect()
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_types() {
        assert_eq!(Value::from("x").value_type(), ValueType::String);
        assert_eq!(Value::from(3u8).value_type(), ValueType::Int);
        assert_eq!(Value::from(3.0f32).value_type(), ValueType::Float);
        assert_eq!(Value::from(true).value_type(), ValueType::Bool);
        assert_eq!(Value::opaque(vec![1, 2]).value_type(), ValueType::Constant);
    }

    #[test]
    fn test_no_numeric_coercion() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::from(1i32), Value::Int(1));
        assert_eq!(Value::from(1u64), Value::Int(1));
    }

    #[test]
    fn test_opaque_identity() {
        let a = Opaque::new(String::from("device"));
        let b = a.clone();
        let c = Opaque::new(String::from("device"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.downcast_ref::<String>().map(String::as_str), Some("device"));
        assert!(a.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(ValueType::Int.zero(), Some(Value::Int(0)));
        assert_eq!(ValueType::String.zero(), Some(Value::Str(String::new())));
        assert_eq!(ValueType::Bool.zero(), Some(Value::Bool(false)));
        assert_eq!(ValueType::Float.zero(), Some(Value::Float(0.0)));
        assert_eq!(ValueType::Constant.zero(), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&json!(true)), Value::Bool(true));
        assert_eq!(Value::from_json(&json!(7)), Value::Int(7));
        assert_eq!(Value::from_json(&json!(7.5)), Value::Float(7.5));
        assert_eq!(Value::from_json(&json!("s")), Value::Str("s".to_string()));

        let big = Value::from_json(&json!(u64::MAX));
        assert_eq!(big.value_type(), ValueType::Constant);
        assert_eq!(big.downcast_ref::<serde_json::Value>(), Some(&json!(u64::MAX)));
        assert_eq!(Value::from_json(&json!(i64::MIN)), Value::Int(i64::MIN));

        let obj = Value::from_json(&json!({"a": 1}));
        assert_eq!(obj.value_type(), ValueType::Constant);
        assert_eq!(obj.downcast_ref::<serde_json::Value>(), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_unsigned_out_of_range() {
        assert_eq!(Value::from(i64::MAX as u64), Value::Int(i64::MAX));
        assert_eq!(Value::from(3usize), Value::Int(3));

        let big = Value::from(u64::MAX);
        assert_eq!(big.value_type(), ValueType::Constant);
        assert_eq!(big.downcast_ref::<u64>(), Some(&u64::MAX));
    }

    #[test]
    fn test_payload_from_json() {
        let payload = Payload::from_json(&json!({"event": 1, "name": "x"})).unwrap();
        assert_eq!(payload.get("event"), Some(&Value::Int(1)));
        assert_eq!(payload.len(), 2);
        assert!(Payload::from_json(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_payload_builder() {
        let payload = Payload::new().with("x", 1).with("y", "s");
        assert_eq!(payload.get("x"), Some(&Value::Int(1)));
        assert_eq!(payload.get("y"), Some(&Value::Str("s".to_string())));
        assert!(payload.get("z").is_none());
    }

    #[test]
    fn test_value_type_serde() {
        assert_eq!(serde_json::to_string(&ValueType::Int).unwrap(), "\"int\"");
        let parsed: ValueType = serde_json::from_str("\"constant\"").unwrap();
        assert_eq!(parsed, ValueType::Constant);
        assert_eq!("Integer".parse::<ValueType>(), Ok(ValueType::Int));
        assert!("list".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("a").to_string(), "\"a\"");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::opaque(1u8).to_string(), "<constant>");
    }
}
