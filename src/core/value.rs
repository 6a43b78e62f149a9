use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field map of a structured value.
pub type Fields = BTreeMap<String, Value>;

/// Payload stored under a key or as a list member.
///
/// The storage engine never interprets payloads beyond their shape: scalars are
/// replaced on update, objects are shallow-merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Array(Vec<Value>),
    Object(Fields),
}

/// Coarse shape of a [`Value`], which decides how an update is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    Sequence,
    Structured,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean(_) => "BOOLEAN",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Array(_) => "ARRAY",
            Self::Object(_) => "OBJECT",
        }
    }

    pub fn shape(&self) -> ValueShape {
        match self {
            Self::Null | Self::Boolean(_) | Self::Integer(_) | Self::Float(_) | Self::Text(_) => {
                ValueShape::Scalar
            }
            Self::Array(_) => ValueShape::Sequence,
            Self::Object(_) => ValueShape::Structured,
        }
    }

    /// Apply `patch` on top of `self`.
    ///
    /// Two objects merge field by field with the patch winning; any other pair
    /// resolves to the patch.
    pub fn apply_patch(self, patch: Value) -> Value {
        match (self.shape(), patch.shape()) {
            (ValueShape::Structured, ValueShape::Structured) => {
                let mut base = self.into_object().unwrap_or_default();
                base.extend(patch.into_object().unwrap_or_default());
                Self::Object(base)
            }
            _ => patch,
        }
    }

    pub fn into_object(self) -> Option<Fields> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Fields> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Field lookup on an object; `None` for every other shape.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_object().and_then(|fields| fields.get(field))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Build an object from `(field, value)` pairs.
    pub fn object<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                *i as f64 == *f
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            other => write!(f, "{}", serde_json::Value::from(other.clone())),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Self::Object(fields)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::from(i),
            // Non-finite floats have no JSON form
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_eq!(Value::Integer(2), Value::Float(2.0));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Text("1".into()), Value::Integer(1));
    }

    #[test]
    fn test_shapes() {
        assert_eq!(Value::Null.shape(), ValueShape::Scalar);
        assert_eq!(Value::from("s").shape(), ValueShape::Scalar);
        assert_eq!(Value::Array(vec![]).shape(), ValueShape::Sequence);
        assert_eq!(Value::object([("a", 1)]).shape(), ValueShape::Structured);
    }

    #[test]
    fn test_patch_scalar_replaces() {
        let merged = Value::from("old").apply_patch(Value::from(7));
        assert_eq!(merged, Value::Integer(7));

        let merged = Value::Null.apply_patch(Value::object([("a", 1)]));
        assert_eq!(merged, Value::object([("a", 1)]));
    }

    #[test]
    fn test_patch_object_merges() {
        let base = Value::object([("a", Value::from(1)), ("b", Value::from("keep"))]);
        let merged = base.apply_patch(Value::object([("a", 2), ("c", 3)]));

        assert_eq!(merged.get("a"), Some(&Value::Integer(2)));
        assert_eq!(merged.get("b"), Some(&Value::from("keep")));
        assert_eq!(merged.get("c"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_patch_object_with_scalar_replaces() {
        let merged = Value::object([("a", 1)]).apply_patch(Value::from(false));
        assert_eq!(merged, Value::Boolean(false));
    }

    #[test]
    fn test_patch_array_replaces() {
        let base = Value::Array(vec![Value::from(1), Value::from(2)]);
        let merged = base.apply_patch(Value::Array(vec![Value::from(3)]));
        assert_eq!(merged, Value::Array(vec![Value::from(3)]));
    }

    #[test]
    fn test_json_bridge() {
        let value = Value::from(json!({"name": "x", "n": 3, "f": 1.5, "tags": ["a"]}));
        assert_eq!(value.get("n"), Some(&Value::Integer(3)));
        assert_eq!(value.get("f"), Some(&Value::Float(1.5)));

        let back: serde_json::Value = value.into();
        assert_eq!(back["tags"][0], json!("a"));
    }

    #[test]
    fn test_serde_untagged() {
        let value: Value = serde_json::from_str(r#"{"k": [1, 2.5, null, true]}"#).unwrap();
        let items = value.get("k").and_then(Value::as_array).unwrap();
        assert_eq!(items[0], Value::Integer(1));
        assert_eq!(items[1], Value::Float(2.5));
        assert!(items[2].is_null());
        assert_eq!(items[3].as_bool(), Some(true));
    }
}
