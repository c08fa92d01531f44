//! Operator semantics: integer arithmetic stays exact and checked, mixed
//! arithmetic goes through `f64`, division and modulo floor like Python.

use std::cmp::Ordering;

use spoon_core::{Error, Result, Value};

use crate::ast::{BinOp, CmpOp, UnaryOp};

fn unsupported(op: &str, l: &Value, r: &Value) -> Error {
    Error::eval(format!(
        "TypeError: unsupported operand type(s) for {op}: '{}' and '{}'",
        l.type_name(),
        r.type_name()
    ))
}

fn overflow() -> Error {
    Error::eval("OverflowError: integer result out of range")
}

fn int_pair(l: &Value, r: &Value) -> Option<(i64, i64)> {
    match (l, r) {
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
            Some((l.as_i64()?, r.as_i64()?))
        }
        _ => None,
    }
}

fn float_pair(l: &Value, r: &Value) -> Option<(f64, f64)> {
    Some((l.as_f64()?, r.as_f64()?))
}

fn repeat<T: Clone>(items: &[T], n: i64) -> Vec<T> {
    let n = usize::try_from(n).unwrap_or(0);
    let mut out = Vec::with_capacity(items.len() * n);
    for _ in 0..n {
        out.extend_from_slice(items);
    }
    out
}

pub(crate) fn unary(op: UnaryOp, v: Value) -> Result<Value> {
    match (op, v) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.truthy())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, v @ (Value::Int(_) | Value::Bool(_))) => v
            .as_i64()
            .and_then(i64::checked_neg)
            .map(Value::Int)
            .ok_or_else(overflow),
        (UnaryOp::Pos, Value::Bool(b)) => Ok(Value::Int(b as i64)),
        (UnaryOp::Pos, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
        (op, v) => {
            let sym = match op {
                UnaryOp::Neg => "-",
                _ => "+",
            };
            Err(Error::eval(format!(
                "TypeError: bad operand type for unary {sym}: '{}'",
                v.type_name()
            )))
        }
    }
}

pub(crate) fn binary(op: BinOp, l: Value, r: Value) -> Result<Value> {
    match op {
        BinOp::Add => add(l, r),
        BinOp::Sub => numeric(op, &l, &r, i64::checked_sub, |a, b| a - b),
        BinOp::Mul => mul(l, r),
        BinOp::Div => div(&l, &r),
        BinOp::FloorDiv => floor_div(&l, &r),
        BinOp::Mod => modulo(&l, &r),
        BinOp::Pow => pow(&l, &r),
    }
}

fn numeric(
    op: BinOp,
    l: &Value,
    r: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    if let Some((a, b)) = int_pair(l, r) {
        return int_op(a, b).map(Value::Int).ok_or_else(overflow);
    }
    match float_pair(l, r) {
        Some((a, b)) => Ok(Value::Float(float_op(a, b))),
        None => Err(unsupported(op.symbol(), l, r)),
    }
}

fn add(l: Value, r: Value) -> Result<Value> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (l, r) => numeric(BinOp::Add, &l, &r, i64::checked_add, |a, b| a + b),
    }
}

fn count(v: &Value) -> Option<i64> {
    match v {
        Value::Int(_) | Value::Bool(_) => v.as_i64(),
        _ => None,
    }
}

fn mul(l: Value, r: Value) -> Result<Value> {
    match (&l, &r) {
        (Value::Str(s), n) | (n, Value::Str(s)) if count(n).is_some() => {
            let n = count(n).unwrap_or(0);
            Ok(Value::Str(s.repeat(usize::try_from(n).unwrap_or(0))))
        }
        (Value::List(items), n) | (n, Value::List(items)) if count(n).is_some() => {
            Ok(Value::List(repeat(items, count(n).unwrap_or(0))))
        }
        _ => numeric(BinOp::Mul, &l, &r, i64::checked_mul, |a, b| a * b),
    }
}

fn div(l: &Value, r: &Value) -> Result<Value> {
    let (a, b) = float_pair(l, r).ok_or_else(|| unsupported("/", l, r))?;
    if b == 0.0 {
        return Err(Error::eval("ZeroDivisionError: division by zero"));
    }
    Ok(Value::Float(a / b))
}

fn floor_div(l: &Value, r: &Value) -> Result<Value> {
    if let Some((a, b)) = int_pair(l, r) {
        if b == 0 {
            return Err(Error::eval(
                "ZeroDivisionError: integer division or modulo by zero",
            ));
        }
        let q = a.checked_div(b).ok_or_else(overflow)?;
        let adjust = a % b != 0 && ((a < 0) != (b < 0));
        return Ok(Value::Int(if adjust { q - 1 } else { q }));
    }
    let (a, b) = float_pair(l, r).ok_or_else(|| unsupported("//", l, r))?;
    if b == 0.0 {
        return Err(Error::eval("ZeroDivisionError: float floor division by zero"));
    }
    Ok(Value::Float((a / b).floor()))
}

fn modulo(l: &Value, r: &Value) -> Result<Value> {
    if let Some((a, b)) = int_pair(l, r) {
        if b == 0 {
            return Err(Error::eval(
                "ZeroDivisionError: integer division or modulo by zero",
            ));
        }
        let m = a.checked_rem(b).unwrap_or(0);
        let adjust = m != 0 && ((m < 0) != (b < 0));
        return Ok(Value::Int(if adjust { m + b } else { m }));
    }
    let (a, b) = float_pair(l, r).ok_or_else(|| unsupported("%", l, r))?;
    if b == 0.0 {
        return Err(Error::eval("ZeroDivisionError: float modulo"));
    }
    let m = a % b;
    let adjust = m != 0.0 && ((m < 0.0) != (b < 0.0));
    Ok(Value::Float(if adjust { m + b } else { m }))
}

pub(crate) fn pow(l: &Value, r: &Value) -> Result<Value> {
    if let Some((a, b)) = int_pair(l, r) {
        if b >= 0 {
            let exp = u32::try_from(b).map_err(|_| overflow())?;
            return a.checked_pow(exp).map(Value::Int).ok_or_else(overflow);
        }
        if a == 0 {
            return Err(Error::eval(
                "ZeroDivisionError: 0.0 cannot be raised to a negative power",
            ));
        }
        return Ok(Value::Float((a as f64).powf(b as f64)));
    }
    let (a, b) = float_pair(l, r).ok_or_else(|| unsupported("** or pow()", l, r))?;
    if a == 0.0 && b < 0.0 {
        return Err(Error::eval(
            "ZeroDivisionError: 0.0 cannot be raised to a negative power",
        ));
    }
    if a < 0.0 && b.fract() != 0.0 {
        return Err(Error::eval(
            "ValueError: negative number cannot be raised to a fractional power",
        ));
    }
    Ok(Value::Float(a.powf(b)))
}

pub(crate) fn order(l: &Value, r: &Value, op: &str) -> Result<Ordering> {
    l.py_cmp(r).ok_or_else(|| {
        Error::eval(format!(
            "TypeError: '{op}' not supported between instances of '{}' and '{}'",
            l.type_name(),
            r.type_name()
        ))
    })
}

pub(crate) fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<bool> {
    Ok(match op {
        CmpOp::Eq => l.py_eq(r),
        CmpOp::Ne => !l.py_eq(r),
        CmpOp::Lt => order(l, r, "<")? == Ordering::Less,
        CmpOp::Le => order(l, r, "<=")? != Ordering::Greater,
        CmpOp::Gt => order(l, r, ">")? == Ordering::Greater,
        CmpOp::Ge => order(l, r, ">=")? != Ordering::Less,
        CmpOp::In => contains(r, l)?,
        CmpOp::NotIn => !contains(r, l)?,
        CmpOp::Is => identical(l, r),
        CmpOp::IsNot => !identical(l, r),
    })
}

fn identical(l: &Value, r: &Value) -> bool {
    l.type_name() == r.type_name() && l.py_eq(r)
}

fn contains(container: &Value, item: &Value) -> Result<bool> {
    match (container, item) {
        (Value::Str(hay), Value::Str(needle)) => Ok(hay.contains(needle.as_str())),
        (Value::Str(_), other) => Err(Error::eval(format!(
            "TypeError: 'in <string>' requires string as left operand, not {}",
            other.type_name()
        ))),
        (Value::List(items), item) => Ok(items.iter().any(|x| x.py_eq(item))),
        (other, _) => Err(Error::eval(format!(
            "TypeError: argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Resolve a possibly negative Python index against `len`.
pub(crate) fn normalize_index(idx: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if idx < 0 { idx + len } else { idx };
    (0..len).contains(&i).then_some(i as usize)
}

/// Clamp slice bounds the way Python does.
pub(crate) fn slice_bounds(lower: Option<i64>, upper: Option<i64>, len: usize) -> (usize, usize) {
    let len_i = len as i64;
    let clamp = |v: i64| {
        let v = if v < 0 { v + len_i } else { v };
        v.clamp(0, len_i) as usize
    };
    let start = lower.map(clamp).unwrap_or(0);
    let end = upper.map(clamp).unwrap_or(len);
    (start, end.max(start))
}

pub(crate) fn index(value: &Value, idx: &Value) -> Result<Value> {
    let i = match idx {
        Value::Int(_) | Value::Bool(_) => idx.as_i64().unwrap_or(0),
        other => {
            return Err(Error::eval(format!(
                "TypeError: indices must be integers, not {}",
                other.type_name()
            )))
        }
    };
    match value {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            normalize_index(i, chars.len())
                .map(|i| Value::Str(chars[i].to_string()))
                .ok_or_else(|| Error::eval("IndexError: string index out of range"))
        }
        Value::List(items) => normalize_index(i, items.len())
            .map(|i| items[i].clone())
            .ok_or_else(|| Error::eval("IndexError: list index out of range")),
        other => Err(Error::eval(format!(
            "TypeError: '{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

pub(crate) fn slice(value: &Value, lower: Option<i64>, upper: Option<i64>) -> Result<Value> {
    match value {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (a, b) = slice_bounds(lower, upper, chars.len());
            Ok(Value::Str(chars[a..b].iter().collect()))
        }
        Value::List(items) => {
            let (a, b) = slice_bounds(lower, upper, items.len());
            Ok(Value::List(items[a..b].to_vec()))
        }
        other => Err(Error::eval(format!(
            "TypeError: '{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}
