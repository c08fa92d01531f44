//! Typed values produced by column coercion and formula evaluation.
//!
//! Rows are stored untyped (strings); a `Value` only exists while a row is
//! evaluated. Rendering back to a field follows Python's `str()` so that
//! outputs look the same whichever side of the pipe reads them.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
        }
    }

    /// Numeric view used by arithmetic; bools count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view for int-only contexts (bools count as 0/1).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Int(_) | Value::Float(_))
    }

    /// Render for storage in an output row. `None` becomes an empty field.
    pub fn to_field(&self) -> String {
        match self {
            Value::None => String::new(),
            other => other.to_string(),
        }
    }

    /// Python-style `repr()`: strings are quoted, everything else as `str()`.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => {
                let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
                format!("'{escaped}'")
            }
            other => other.to_string(),
        }
    }

    /// Equality across numeric kinds (`1 == 1.0 == True`).
    pub fn py_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
            }
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            },
            _ => false,
        }
    }

    /// Ordering where Python defines one; `None` for unorderable pairs.
    pub fn py_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    if x.py_eq(y) {
                        continue;
                    }
                    return x.py_cmp(y);
                }
                Some(a.len().cmp(&b.len()))
            }
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
            },
            _ => None,
        }
    }

    /// Hashable canonical form, consistent with `py_eq`.
    pub fn canonical(&self) -> Canonical {
        match self {
            Value::None => Canonical::None,
            Value::Bool(b) => Canonical::Int(*b as i64),
            Value::Int(i) => Canonical::Int(*i),
            Value::Float(f) => {
                if f.is_nan() {
                    Canonical::Float(f64::NAN.to_bits())
                } else if f.fract() == 0.0 && f.abs() < 9.2e18 {
                    Canonical::Int(*f as i64)
                } else {
                    Canonical::Float(f.to_bits())
                }
            }
            Value::Str(s) => Canonical::Str(s.clone()),
            Value::List(l) => Canonical::List(l.iter().map(Value::canonical).collect()),
        }
    }
}

/// Hash/Eq key for grouping typed values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Canonical {
    None,
    Int(i64),
    Float(u64),
    Str(String),
    List(Vec<Canonical>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => f.write_str(&float_repr(*x)),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Shortest round-trip float text, switching to exponent form outside
/// `[1e-4, 1e16)` like Python's `repr(float)`.
pub fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let abs = x.abs();
    if (1e-4..1e16).contains(&abs) {
        let s = format!("{x}");
        if s.contains('.') {
            s
        } else {
            format!("{s}.0")
        }
    } else {
        let s = format!("{x:e}");
        match s.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => s,
        }
    }
}

/// Parse a float the way Python's `float()` does for plain decimal text:
/// surrounding whitespace is ignored, `inf`/`nan` spellings are accepted.
pub fn parse_float(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok()
}

/// Parse an integer the way Python's `int()` does for base-10 text.
pub fn parse_int(raw: &str) -> Option<i64> {
    let t = raw.trim();
    let digits = t.strip_prefix(['+', '-']).unwrap_or(t);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit() || b == b'_') {
        return None;
    }
    if digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    t.replace('_', "").parse::<i64>().ok()
}
