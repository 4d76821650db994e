//! Runtime values flowing through a plan
//!
//! A [`Value`] is the dynamic counterpart of a [`Shape`](crate::Shape):
//! records for products, variants for coproducts, and so on. Records carry
//! one entry per readable accessor, so evaluated zero-argument methods sit
//! next to plain fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A concrete value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Unit,
    Bool(bool),
    /// Any signed integer tag
    Int(i64),
    /// Any unsigned integer tag
    UInt(u64),
    /// Either float tag
    Float(f64),
    Char(char),
    Str(String),
    /// Product value, keyed by accessor name
    Record(IndexMap<String, Value>),
    /// Coproduct value
    Variant { name: String, payload: Box<Value> },
    /// Optional container; `None` is the absent value
    Opt(Option<Box<Value>>),
    /// Sequence container
    Seq(Vec<Value>),
    /// Map container
    Map(IndexMap<String, Value>),
    /// Value of a type the engine treats as atomic
    Opaque(serde_json::Value),
}

impl Value {
    /// Build a record from `(name, value)` pairs, preserving order
    #[must_use]
    pub fn record<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Record(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a map from `(key, value)` pairs, preserving order
    #[must_use]
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Variant with payload
    #[inline]
    #[must_use]
    pub fn variant(name: impl Into<String>, payload: Value) -> Self {
        Self::Variant {
            name: name.into(),
            payload: Box::new(payload),
        }
    }

    /// Variant with empty payload
    #[inline]
    #[must_use]
    pub fn unit_variant(name: impl Into<String>) -> Self {
        Self::variant(name, Self::Unit)
    }

    /// Present optional
    #[inline]
    #[must_use]
    pub fn some(value: Value) -> Self {
        Self::Opt(Some(Box::new(value)))
    }

    /// Absent optional
    #[inline]
    #[must_use]
    pub const fn none() -> Self {
        Self::Opt(None)
    }

    /// String value
    #[inline]
    #[must_use]
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Look up a record entry
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Record(entries) => entries.get(name),
            _ => None,
        }
    }

    /// Integer payload widened to `i128`
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Int(i) => Some(i128::from(*i)),
            Self::UInt(u) => Some(i128::from(*u)),
            _ => None,
        }
    }

    /// Name of the value's kind, for mismatch reports
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::Str(_) => "string",
            Self::Record(_) => "record",
            Self::Variant { .. } => "variant",
            Self::Opt(_) => "optional",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "map",
            Self::Opaque(_) => "opaque",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Self::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        Self::Opt(opt.map(|v| Box::new(v.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_preserves_order() {
        let v = Value::record([("b", Value::from(1)), ("a", Value::from(2))]);
        let Value::Record(entries) = &v else {
            panic!("expected record");
        };
        let keys: Vec<_> = entries.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(v.get("a"), Some(&Value::Int(2)));
        assert_eq!(v.get("missing"), None);
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(Some("x")), Value::some(Value::str("x")));
        assert_eq!(Value::from(None::<i64>), Value::none());
    }

    #[test]
    fn integer_widening_view() {
        assert_eq!(Value::Int(-3).as_i128(), Some(-3));
        assert_eq!(Value::UInt(u64::MAX).as_i128(), Some(i128::from(u64::MAX)));
        assert_eq!(Value::str("3").as_i128(), None);
    }

    #[test]
    fn serde_round_trip_of_nested_value() {
        let v = Value::record([
            ("id", Value::UInt(7)),
            ("shape", Value::variant("Circle", Value::record([("r", Value::Float(1.5))]))),
            ("tags", Value::Seq(vec![Value::str("a")])),
            ("nick", Value::none()),
        ]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
