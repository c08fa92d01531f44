//! Builtin functions and the methods available on strings and lists.

use std::cmp::Ordering;

use indexmap::IndexSet;
use spoon_core::value::{parse_float, parse_int};
use spoon_core::{Error, Result, Value};

use crate::ast::BinOp;
use crate::ops;

pub(crate) const BUILTINS: [&str; 18] = [
    "int", "float", "str", "bool", "repr", "len", "abs", "min", "max", "sum", "round", "sorted",
    "list", "set", "any", "all", "pow", "divmod",
];

pub(crate) fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

pub(crate) fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("exactly {min}")
        } else {
            format!("{min} to {max}")
        };
        return Err(Error::eval(format!(
            "TypeError: {name}() takes {expected} argument(s) ({} given)",
            args.len()
        )));
    }
    Ok(())
}

/// Elements of an iterable argument.
pub(crate) fn iterate(name: &str, v: &Value) -> Result<Vec<Value>> {
    match v {
        Value::List(items) => Ok(items.clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(Error::eval(format!(
            "TypeError: {name}() argument '{}' object is not iterable",
            other.type_name()
        ))),
    }
}

pub(crate) fn call_builtin(name: &str, args: Vec<Value>) -> Result<Value> {
    match name {
        "int" => {
            arity(name, &args, 0, 1)?;
            args.first().map_or(Ok(Value::Int(0)), to_int)
        }
        "float" => {
            arity(name, &args, 0, 1)?;
            args.first().map_or(Ok(Value::Float(0.0)), to_float)
        }
        "str" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Str(args.first().map(Value::to_string).unwrap_or_default()))
        }
        "bool" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
        }
        "repr" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Str(args[0].repr()))
        }
        "len" => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(l) => Ok(Value::Int(l.len() as i64)),
                other => Err(Error::eval(format!(
                    "TypeError: object of type '{}' has no len()",
                    other.type_name()
                ))),
            }
        }
        "abs" => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Float(f) => Ok(Value::Float(f.abs())),
                Value::Int(_) | Value::Bool(_) => args[0]
                    .as_i64()
                    .and_then(i64::checked_abs)
                    .map(Value::Int)
                    .ok_or_else(|| Error::eval("OverflowError: integer result out of range")),
                other => Err(Error::eval(format!(
                    "TypeError: bad operand type for abs(): '{}'",
                    other.type_name()
                ))),
            }
        }
        "min" | "max" => extreme(name, args),
        "sum" => {
            arity(name, &args, 1, 2)?;
            let start = args.get(1).cloned().unwrap_or(Value::Int(0));
            iterate(name, &args[0])?
                .into_iter()
                .try_fold(start, |acc, v| ops::binary(BinOp::Add, acc, v))
        }
        "round" => {
            arity(name, &args, 1, 2)?;
            round(&args[0], args.get(1))
        }
        "sorted" => {
            arity(name, &args, 1, 1)?;
            sorted(iterate(name, &args[0])?).map(Value::List)
        }
        "list" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                Some(v) => iterate(name, v).map(Value::List),
                None => Ok(Value::List(Vec::new())),
            }
        }
        "set" => {
            arity(name, &args, 0, 1)?;
            let items = match args.first() {
                Some(v) => iterate(name, v)?,
                None => Vec::new(),
            };
            Ok(Value::List(unique(items)))
        }
        "any" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Bool(iterate(name, &args[0])?.iter().any(Value::truthy)))
        }
        "all" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Bool(iterate(name, &args[0])?.iter().all(Value::truthy)))
        }
        "pow" => {
            arity(name, &args, 2, 2)?;
            ops::pow(&args[0], &args[1])
        }
        "divmod" => {
            arity(name, &args, 2, 2)?;
            let mut args = args.into_iter();
            let (a, b) = (args.next().unwrap_or(Value::None), args.next().unwrap_or(Value::None));
            let q = ops::binary(BinOp::FloorDiv, a.clone(), b.clone())?;
            let r = ops::binary(BinOp::Mod, a, b)?;
            Ok(Value::List(vec![q, r]))
        }
        other => Err(Error::eval(format!(
            "NameError: name '{other}' is not defined"
        ))),
    }
}

pub(crate) fn to_int(v: &Value) -> Result<Value> {
    match v {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(Error::eval(format!(
                    "ValueError: cannot convert float {} to integer",
                    Value::Float(*f)
                )));
            }
            let t = f.trunc();
            if t.abs() >= 9.223_372_036_854_776e18 {
                return Err(Error::eval("OverflowError: integer result out of range"));
            }
            Ok(Value::Int(t as i64))
        }
        Value::Str(s) => parse_int(s).map(Value::Int).ok_or_else(|| {
            Error::eval(format!(
                "ValueError: invalid literal for int() with base 10: {}",
                v.repr()
            ))
        }),
        other => Err(Error::eval(format!(
            "TypeError: int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

pub(crate) fn to_float(v: &Value) -> Result<Value> {
    match v {
        Value::Str(s) => parse_float(s).map(Value::Float).ok_or_else(|| {
            Error::eval(format!(
                "ValueError: could not convert string to float: {}",
                v.repr()
            ))
        }),
        other => other.as_f64().map(Value::Float).ok_or_else(|| {
            Error::eval(format!(
                "TypeError: float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn extreme(name: &str, args: Vec<Value>) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::eval(format!(
            "TypeError: {name} expected at least 1 argument, got 0"
        )));
    }
    let items = if args.len() == 1 {
        iterate(name, &args[0])?
    } else {
        args
    };
    let want = if name == "min" {
        Ordering::Less
    } else {
        Ordering::Greater
    };
    let mut iter = items.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| Error::eval(format!("ValueError: {name}() arg is an empty sequence")))?;
    for v in iter {
        if ops::order(&v, &best, if name == "min" { "<" } else { ">" })? == want {
            best = v;
        }
    }
    Ok(best)
}

fn round(x: &Value, digits: Option<&Value>) -> Result<Value> {
    let digits = match digits {
        None | Some(Value::None) => None,
        Some(d) => Some(d.as_i64().ok_or_else(|| {
            Error::eval(format!(
                "TypeError: '{}' object cannot be interpreted as an integer",
                d.type_name()
            ))
        })?),
    };
    match (x, digits) {
        (Value::Int(_) | Value::Bool(_), None) => Ok(Value::Int(x.as_i64().unwrap_or(0))),
        (Value::Int(_) | Value::Bool(_), Some(n)) if n >= 0 => {
            Ok(Value::Int(x.as_i64().unwrap_or(0)))
        }
        (Value::Int(_) | Value::Bool(_), Some(n)) => {
            let i = x.as_i64().unwrap_or(0) as f64;
            let factor = 10f64.powi((-n).min(308) as i32);
            Ok(Value::Int(((i / factor).round_ties_even() * factor) as i64))
        }
        (Value::Float(f), None) => to_int(&Value::Float(f.round_ties_even())),
        (Value::Float(f), Some(_)) if !f.is_finite() => Ok(Value::Float(*f)),
        (Value::Float(f), Some(n)) if n >= 0 => {
            // Formatting rounds the exact binary value, as Python does.
            let text = format!("{:.*}", n.min(340) as usize, f);
            Ok(Value::Float(text.parse().unwrap_or(*f)))
        }
        (Value::Float(f), Some(n)) => {
            let factor = 10f64.powi((-n).min(308) as i32);
            Ok(Value::Float((f / factor).round_ties_even() * factor))
        }
        (other, _) => Err(Error::eval(format!(
            "TypeError: type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

pub(crate) fn sorted(mut items: Vec<Value>) -> Result<Vec<Value>> {
    let mut failure = None;
    items.sort_by(|a, b| match ops::order(a, b, "<") {
        Ok(o) => o,
        Err(e) => {
            failure.get_or_insert(e);
            Ordering::Equal
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(items),
    }
}

/// Distinct values in first-seen order.
pub(crate) fn unique(items: Vec<Value>) -> Vec<Value> {
    let mut seen = IndexSet::new();
    items
        .into_iter()
        .filter(|v| seen.insert(v.canonical()))
        .collect()
}

fn str_arg<'a>(method: &str, args: &'a [Value], i: usize) -> Result<&'a str> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(Error::eval(format!(
            "TypeError: {method}() argument must be str, not {}",
            other.type_name()
        ))),
        None => Err(Error::eval(format!(
            "TypeError: {method}() missing required argument"
        ))),
    }
}

fn opt_chars(method: &str, args: &[Value]) -> Result<Option<Vec<char>>> {
    match args.first() {
        None | Some(Value::None) => Ok(None),
        Some(_) => Ok(Some(str_arg(method, args, 0)?.chars().collect())),
    }
}

/// `value.method(args)` for strings and lists.
pub(crate) fn call_method(recv: Value, method: &str, args: Vec<Value>) -> Result<Value> {
    match recv {
        Value::Str(s) => string_method(&s, method, &args),
        Value::List(items) => list_method(&items, method, &args),
        other => Err(Error::eval(format!(
            "AttributeError: '{}' object has no attribute '{method}'",
            other.type_name()
        ))),
    }
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Result<Value> {
    let text = |t: String| Ok(Value::Str(t));
    match method {
        "upper" => text(s.to_uppercase()),
        "lower" => text(s.to_lowercase()),
        "strip" | "lstrip" | "rstrip" => {
            arity(method, args, 0, 1)?;
            let chars = opt_chars(method, args)?;
            let pred = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            text(match method {
                "strip" => s.trim_matches(pred),
                "lstrip" => s.trim_start_matches(pred),
                _ => s.trim_end_matches(pred),
            }
            .to_string())
        }
        "startswith" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(s.starts_with(str_arg(method, args, 0)?)))
        }
        "endswith" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(s.ends_with(str_arg(method, args, 0)?)))
        }
        "replace" => {
            arity(method, args, 2, 2)?;
            text(s.replace(str_arg(method, args, 0)?, str_arg(method, args, 1)?))
        }
        "split" => {
            arity(method, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::None) => s.split_whitespace().map(Value::str).collect(),
                Some(_) => {
                    let sep = str_arg(method, args, 0)?;
                    if sep.is_empty() {
                        return Err(Error::eval("ValueError: empty separator"));
                    }
                    s.split(sep).map(Value::str).collect()
                }
            };
            Ok(Value::List(parts))
        }
        "join" => {
            arity(method, args, 1, 1)?;
            let parts = iterate(method, &args[0])?
                .into_iter()
                .map(|v| match v {
                    Value::Str(p) => Ok(p),
                    other => Err(Error::eval(format!(
                        "TypeError: sequence item: expected str instance, {} found",
                        other.type_name()
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            text(parts.join(s))
        }
        "find" => {
            arity(method, args, 1, 1)?;
            let needle = str_arg(method, args, 0)?;
            Ok(Value::Int(match s.find(needle) {
                Some(byte) => s[..byte].chars().count() as i64,
                None => -1,
            }))
        }
        "count" => {
            arity(method, args, 1, 1)?;
            let needle = str_arg(method, args, 0)?;
            let n = if needle.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(needle).count()
            };
            Ok(Value::Int(n as i64))
        }
        "title" => {
            let mut out = String::with_capacity(s.len());
            let mut prev_cased = false;
            for c in s.chars() {
                if prev_cased {
                    out.extend(c.to_lowercase());
                } else {
                    out.extend(c.to_uppercase());
                }
                prev_cased = c.is_alphabetic();
            }
            text(out)
        }
        "capitalize" => {
            let mut chars = s.chars();
            text(match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            })
        }
        "isdigit" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))),
        "isalpha" => Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic))),
        "zfill" => {
            arity(method, args, 1, 1)?;
            let width = args[0].as_i64().unwrap_or(0).max(0) as usize;
            let len = s.chars().count();
            if len >= width {
                return text(s.to_string());
            }
            let pad = "0".repeat(width - len);
            text(match s.strip_prefix(['+', '-']) {
                Some(rest) => format!("{}{pad}{rest}", &s[..1]),
                None => format!("{pad}{s}"),
            })
        }
        _ => Err(Error::eval(format!(
            "AttributeError: 'str' object has no attribute '{method}'"
        ))),
    }
}

fn list_method(items: &[Value], method: &str, args: &[Value]) -> Result<Value> {
    match method {
        "count" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Int(
                items.iter().filter(|v| v.py_eq(&args[0])).count() as i64,
            ))
        }
        "index" => {
            arity(method, args, 1, 1)?;
            items
                .iter()
                .position(|v| v.py_eq(&args[0]))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| Error::eval(format!("ValueError: {} is not in list", args[0].repr())))
        }
        _ => Err(Error::eval(format!(
            "AttributeError: 'list' object has no attribute '{method}'"
        ))),
    }
}
