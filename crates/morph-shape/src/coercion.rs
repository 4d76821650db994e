//! Scalar coercion table
//!
//! A fixed, explicit registry of `(source tag, target tag) → converter`
//! entries. Pairs the table does not list have no coercion: the planner
//! requires an override for them or reports `UnsupportedCoercion`.
//!
//! Planning only proves that an entry exists. Narrowing and parsing entries
//! can still fail on a concrete value, which surfaces at execution time.

use crate::tag::ValueTag;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Converter selected from the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// Integer to integer, range-checked when narrowing
    IntResize,
    /// Integer to float
    IntToFloat,
    /// Float to float, range-checked when narrowing
    FloatResize,
    /// String to bool, integer, float or char
    Parse,
    /// Any scalar to string
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagMatcher {
    Integer,
    Float,
    Exact(ValueTag),
    /// Any tag except `Unit`
    Scalar,
}

impl TagMatcher {
    fn matches(self, tag: ValueTag) -> bool {
        match self {
            Self::Integer => tag.is_integer(),
            Self::Float => tag.is_float(),
            Self::Exact(t) => t == tag,
            Self::Scalar => tag != ValueTag::Unit,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CoercionRule {
    from: TagMatcher,
    to: TagMatcher,
    coercion: Coercion,
}

const COERCION_TABLE: &[CoercionRule] = &[
    CoercionRule {
        from: TagMatcher::Integer,
        to: TagMatcher::Integer,
        coercion: Coercion::IntResize,
    },
    CoercionRule {
        from: TagMatcher::Integer,
        to: TagMatcher::Float,
        coercion: Coercion::IntToFloat,
    },
    CoercionRule {
        from: TagMatcher::Float,
        to: TagMatcher::Float,
        coercion: Coercion::FloatResize,
    },
    CoercionRule {
        from: TagMatcher::Exact(ValueTag::String),
        to: TagMatcher::Integer,
        coercion: Coercion::Parse,
    },
    CoercionRule {
        from: TagMatcher::Exact(ValueTag::String),
        to: TagMatcher::Float,
        coercion: Coercion::Parse,
    },
    CoercionRule {
        from: TagMatcher::Exact(ValueTag::String),
        to: TagMatcher::Exact(ValueTag::Bool),
        coercion: Coercion::Parse,
    },
    CoercionRule {
        from: TagMatcher::Exact(ValueTag::String),
        to: TagMatcher::Exact(ValueTag::Char),
        coercion: Coercion::Parse,
    },
    CoercionRule {
        from: TagMatcher::Scalar,
        to: TagMatcher::Exact(ValueTag::String),
        coercion: Coercion::Render,
    },
];

/// Look up the converter for two distinct tags
///
/// Identical tags copy directly and are not listed; this returns `None`
/// for them.
#[must_use]
pub fn coercion_for(from: ValueTag, to: ValueTag) -> Option<Coercion> {
    if from == to {
        return None;
    }
    COERCION_TABLE
        .iter()
        .find(|rule| rule.from.matches(from) && rule.to.matches(to))
        .map(|rule| rule.coercion)
}

impl Coercion {
    /// Whether applying this converter between the two tags can fail
    #[must_use]
    pub fn is_fallible(self, from: ValueTag, to: ValueTag) -> bool {
        match self {
            Self::IntResize => match (from.int_range(), to.int_range()) {
                (Some((flo, fhi)), Some((tlo, thi))) => flo < tlo || fhi > thi,
                _ => true,
            },
            Self::FloatResize => from == ValueTag::F64 && to == ValueTag::F32,
            Self::Parse => true,
            Self::IntToFloat | Self::Render => false,
        }
    }

    /// Convert a value of tag `from` into tag `to`
    ///
    /// # Errors
    /// Returns error if the value is out of range for `to`, does not parse,
    /// or is not a value of tag `from` at all.
    pub fn apply(self, value: &Value, from: ValueTag, to: ValueTag) -> Result<Value, CoercionError> {
        match self {
            Self::IntResize => {
                let n = value.as_i128().ok_or_else(|| mismatch(from, value))?;
                int_in_range(n, from, to)
            }
            Self::IntToFloat => {
                let n = value.as_i128().ok_or_else(|| mismatch(from, value))?;
                #[allow(clippy::cast_precision_loss)]
                let f = n as f64;
                Ok(Value::Float(if to == ValueTag::F32 {
                    f64::from(f as f32)
                } else {
                    f
                }))
            }
            Self::FloatResize => {
                let Value::Float(f) = value else {
                    return Err(mismatch(from, value));
                };
                float_in_range(*f, from, to)
            }
            Self::Parse => {
                let Value::Str(s) = value else {
                    return Err(mismatch(from, value));
                };
                parse(s, to)
            }
            Self::Render => render(value).ok_or_else(|| mismatch(from, value)),
        }
    }
}

fn mismatch(expected: ValueTag, found: &Value) -> CoercionError {
    CoercionError::Mismatch {
        expected,
        found: found.kind_name(),
    }
}

fn int_in_range(n: i128, from: ValueTag, to: ValueTag) -> Result<Value, CoercionError> {
    let out_of_range = || CoercionError::OutOfRange {
        from,
        to,
        value: n.to_string(),
    };
    let (lo, hi) = to.int_range().ok_or_else(out_of_range)?;
    if n < lo || n > hi {
        return Err(out_of_range());
    }
    if to.is_unsigned() {
        u64::try_from(n).map(Value::UInt).map_err(|_| out_of_range())
    } else {
        i64::try_from(n).map(Value::Int).map_err(|_| out_of_range())
    }
}

fn float_in_range(f: f64, from: ValueTag, to: ValueTag) -> Result<Value, CoercionError> {
    if to == ValueTag::F32 && f.is_finite() && f.abs() > f64::from(f32::MAX) {
        return Err(CoercionError::OutOfRange {
            from,
            to,
            value: f.to_string(),
        });
    }
    Ok(Value::Float(f))
}

fn parse(input: &str, to: ValueTag) -> Result<Value, CoercionError> {
    let failed = || CoercionError::Parse {
        to,
        input: input.to_string(),
    };
    let trimmed = input.trim();
    match to {
        ValueTag::Bool => trimmed.parse().map(Value::Bool).map_err(|_| failed()),
        ValueTag::Char => {
            let mut chars = input.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(failed()),
            }
        }
        ValueTag::F32 | ValueTag::F64 => {
            let f: f64 = trimmed.parse().map_err(|_| failed())?;
            float_in_range(f, ValueTag::String, to)
        }
        tag if tag.is_integer() => {
            let n: i128 = trimmed.parse().map_err(|_| failed())?;
            int_in_range(n, ValueTag::String, to)
        }
        _ => Err(failed()),
    }
}

fn render(value: &Value) -> Option<Value> {
    let s = match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Char(c) => c.to_string(),
        Value::Str(s) => s.clone(),
        _ => return None,
    };
    Some(Value::Str(s))
}

/// Value-level coercion failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    /// Value does not fit the target tag
    #[error("{value} is out of range for {to} (from {from})")]
    OutOfRange {
        from: ValueTag,
        to: ValueTag,
        value: String,
    },

    /// String does not parse as the target tag
    #[error("cannot parse {input:?} as {to}")]
    Parse { to: ValueTag, input: String },

    /// Value is not of the planned source tag
    #[error("expected {expected} value, found {found}")]
    Mismatch {
        expected: ValueTag,
        found: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lookup() {
        assert_eq!(
            coercion_for(ValueTag::I32, ValueTag::I64),
            Some(Coercion::IntResize)
        );
        assert_eq!(
            coercion_for(ValueTag::U8, ValueTag::F64),
            Some(Coercion::IntToFloat)
        );
        assert_eq!(
            coercion_for(ValueTag::String, ValueTag::I32),
            Some(Coercion::Parse)
        );
        assert_eq!(
            coercion_for(ValueTag::Bool, ValueTag::String),
            Some(Coercion::Render)
        );
        assert_eq!(coercion_for(ValueTag::I32, ValueTag::I32), None);
        assert_eq!(coercion_for(ValueTag::Bool, ValueTag::I32), None);
        assert_eq!(coercion_for(ValueTag::F64, ValueTag::I64), None);
        assert_eq!(coercion_for(ValueTag::Unit, ValueTag::String), None);
    }

    #[test]
    fn widening_is_infallible() {
        assert!(!Coercion::IntResize.is_fallible(ValueTag::I32, ValueTag::I64));
        assert!(!Coercion::IntResize.is_fallible(ValueTag::U16, ValueTag::I32));
        assert!(Coercion::IntResize.is_fallible(ValueTag::I64, ValueTag::I32));
        assert!(Coercion::IntResize.is_fallible(ValueTag::I8, ValueTag::U64));
        assert!(Coercion::FloatResize.is_fallible(ValueTag::F64, ValueTag::F32));
        assert!(!Coercion::FloatResize.is_fallible(ValueTag::F32, ValueTag::F64));
    }

    #[test]
    fn narrowing_checks_range() {
        let c = Coercion::IntResize;
        assert_eq!(
            c.apply(&Value::Int(100), ValueTag::I64, ValueTag::I8),
            Ok(Value::Int(100))
        );
        assert!(matches!(
            c.apply(&Value::Int(300), ValueTag::I64, ValueTag::I8),
            Err(CoercionError::OutOfRange { .. })
        ));
        assert!(matches!(
            c.apply(&Value::Int(-1), ValueTag::I32, ValueTag::U32),
            Err(CoercionError::OutOfRange { .. })
        ));
        assert_eq!(
            c.apply(&Value::Int(5), ValueTag::I32, ValueTag::U32),
            Ok(Value::UInt(5))
        );
    }

    #[test]
    fn parse_reports_input() {
        let err = Coercion::Parse
            .apply(&Value::str("abc"), ValueTag::String, ValueTag::I32)
            .unwrap_err();
        assert_eq!(
            err,
            CoercionError::Parse {
                to: ValueTag::I32,
                input: "abc".into()
            }
        );
        assert_eq!(
            Coercion::Parse.apply(&Value::str(" 42 "), ValueTag::String, ValueTag::I32),
            Ok(Value::Int(42))
        );
        assert!(matches!(
            Coercion::Parse.apply(&Value::str("99999999999"), ValueTag::String, ValueTag::I32),
            Err(CoercionError::OutOfRange { .. })
        ));
        assert_eq!(
            Coercion::Parse.apply(&Value::str("true"), ValueTag::String, ValueTag::Bool),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn render_and_float() {
        assert_eq!(
            Coercion::Render.apply(&Value::Int(7), ValueTag::I64, ValueTag::String),
            Ok(Value::str("7"))
        );
        assert_eq!(
            Coercion::IntToFloat.apply(&Value::Int(3), ValueTag::I32, ValueTag::F64),
            Ok(Value::Float(3.0))
        );
        assert!(matches!(
            Coercion::FloatResize.apply(&Value::Float(1e300), ValueTag::F64, ValueTag::F32),
            Err(CoercionError::OutOfRange { .. })
        ));
    }

    #[test]
    fn wrong_runtime_value_is_mismatch() {
        assert!(matches!(
            Coercion::IntResize.apply(&Value::str("1"), ValueTag::I32, ValueTag::I64),
            Err(CoercionError::Mismatch { .. })
        ));
    }
}
