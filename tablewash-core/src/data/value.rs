//! Scalar cell values.

use crate::data::schema::ColumnType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single cell. Serializes untagged: `null`, `42`, `4.5`, `"IT"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value; `None` for nulls and strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The column type this value belongs to, `None` for null.
    pub fn dtype(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(ColumnType::Integer),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Str(_) => Some(ColumnType::String),
        }
    }

    /// Convert into `dtype` if the conversion loses nothing.
    ///
    /// Integers widen to floats; floats with no fractional part narrow to
    /// integers. Strings never convert to or from numbers.
    pub fn coerce_to(&self, dtype: ColumnType) -> Option<Value> {
        match (self, dtype) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Int(i), ColumnType::Integer) => Some(Value::Int(*i)),
            (Value::Int(i), ColumnType::Float) => Some(Value::Float(*i as f64)),
            (Value::Float(f), ColumnType::Float) => Some(Value::Float(*f)),
            (Value::Float(f), ColumnType::Integer)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Some(Value::Int(*f as i64))
            }
            (Value::Str(s), ColumnType::String) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }

    /// Parse a raw text field into `dtype`. Unparseable input yields `None`.
    pub fn parse_as(raw: &str, dtype: ColumnType) -> Option<Value> {
        match dtype {
            ColumnType::Integer => raw.trim().parse::<i64>().ok().map(Value::Int),
            ColumnType::Float => raw.trim().parse::<f64>().ok().map(Value::Float),
            ColumnType::String => Some(Value::Str(raw.to_string())),
        }
    }

    /// Total order used for sorting, min/max and mode tie-breaks.
    ///
    /// Nulls sort first, numbers compare numerically across int/float,
    /// strings sort last and lexicographically.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Str(_), _) => Ordering::Greater,
            (_, Value::Str(_)) => Ordering::Less,
            (a, b) => {
                let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                a.total_cmp(&b)
            }
        }
    }

    /// Hashable identity used for grouping and de-duplication.
    pub fn key(&self) -> ValueKey {
        match self {
            Value::Null => ValueKey::Null,
            Value::Int(i) => ValueKey::Int(*i),
            Value::Float(f) => {
                // -0.0 and 0.0 group together, as do all NaN payloads
                let bits = if *f == 0.0 {
                    0.0f64.to_bits()
                } else if f.is_nan() {
                    f64::NAN.to_bits()
                } else {
                    f.to_bits()
                };
                ValueKey::Float(bits)
            }
            Value::Str(s) => ValueKey::Str(s.clone()),
        }
    }

    /// Text form for delimited output. Nulls become the empty field.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Hashable projection of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Int(i64),
    Float(u64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(i) => write!(f, "{i}"),
            // Debug keeps a decimal point or exponent, so re-reading infers Float
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_cmp_orders_nulls_first() {
        let mut values = vec![Value::Int(3), Value::Null, Value::Float(1.5), Value::Int(2)];
        values.sort_by(Value::total_cmp);
        assert_eq!(
            values,
            vec![Value::Null, Value::Float(1.5), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_coerce_literals() {
        assert_eq!(
            Value::Int(5).coerce_to(ColumnType::Float),
            Some(Value::Float(5.0))
        );
        assert_eq!(
            Value::Float(5.0).coerce_to(ColumnType::Integer),
            Some(Value::Int(5))
        );
        assert_eq!(Value::Float(5.5).coerce_to(ColumnType::Integer), None);
        assert_eq!(Value::from("x").coerce_to(ColumnType::Integer), None);
    }

    #[test]
    fn test_whole_float_keeps_decimal_point() {
        assert_eq!(Value::Float(55000.0).to_string(), "55000.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Null.to_field(), "");
    }

    #[test]
    fn test_huge_whole_float_reads_back_as_float() {
        for x in [1e16, -3e20, 12345678901234567890.0] {
            let text = Value::Float(x).to_string();
            assert!(text.parse::<i64>().is_err(), "{text}");
            assert_eq!(text.parse::<f64>().unwrap(), x);
            assert_eq!(
                crate::data::infer_column_type([text.as_str()]),
                ColumnType::Float
            );
        }
    }

    #[test]
    fn test_untagged_serde() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, 1, 2.5, "a"]"#).unwrap();
        assert_eq!(
            values,
            vec![Value::Null, Value::Int(1), Value::Float(2.5), Value::from("a")]
        );
    }

    #[test]
    fn test_float_keys_fold_signed_zero() {
        assert_eq!(Value::Float(0.0).key(), Value::Float(-0.0).key());
        assert_ne!(Value::Float(1.0).key(), Value::Float(2.0).key());
    }
}
