//! Importable modules: `math`, `numpy` and `statistics`.

use std::f64::consts;

use spoon_core::{Error, Result, Value};

use crate::builtins::{arity, call_builtin, iterate, sorted, unique};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Math,
    Numpy,
    Statistics,
}

const MATH_FNS: [&str; 18] = [
    "sqrt", "exp", "log", "log10", "log2", "floor", "ceil", "trunc", "fabs", "pow", "sin", "cos",
    "tan", "atan", "isnan", "isinf", "isclose", "hypot",
];
const NUMPY_FNS: [&str; 14] = [
    "mean", "median", "std", "var", "sum", "min", "max", "prod", "sqrt", "log", "exp", "abs",
    "round", "unique",
];
const STATISTICS_FNS: [&str; 7] = [
    "mean", "median", "stdev", "pstdev", "variance", "pvariance", "mode",
];

impl Module {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "math" => Some(Module::Math),
            "numpy" => Some(Module::Numpy),
            "statistics" => Some(Module::Statistics),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Module::Math => "math",
            Module::Numpy => "numpy",
            Module::Statistics => "statistics",
        }
    }

    pub fn has_function(self, f: &str) -> bool {
        match self {
            Module::Math => MATH_FNS.contains(&f),
            Module::Numpy => NUMPY_FNS.contains(&f),
            Module::Statistics => STATISTICS_FNS.contains(&f),
        }
    }

    pub fn constant(self, name: &str) -> Option<Value> {
        let x = match (self, name) {
            (Module::Math | Module::Numpy, "pi") => consts::PI,
            (Module::Math | Module::Numpy, "e") => consts::E,
            (Module::Math, "tau") => consts::TAU,
            (Module::Math | Module::Numpy, "inf") => f64::INFINITY,
            (Module::Math | Module::Numpy, "nan") => f64::NAN,
            _ => return None,
        };
        Some(Value::Float(x))
    }

    pub(crate) fn call(self, f: &str, args: Vec<Value>) -> Result<Value> {
        match self {
            Module::Math => math(f, &args),
            Module::Numpy => numpy(f, args),
            Module::Statistics => statistics(f, args),
        }
    }
}

fn domain_error() -> Error {
    Error::eval("ValueError: math domain error")
}

fn real(fname: &str, v: &Value) -> Result<f64> {
    match v {
        Value::Str(s) => Err(Error::eval(format!(
            "TypeError: {fname}() must be real number, not str ({s:?})"
        ))),
        other => other.as_f64().ok_or_else(|| {
            Error::eval(format!(
                "TypeError: {fname}() must be real number, not {}",
                other.type_name()
            ))
        }),
    }
}

fn checked(x: f64) -> Result<Value> {
    if x.is_nan() {
        Err(domain_error())
    } else {
        Ok(Value::Float(x))
    }
}

fn to_int(fname: &str, x: f64) -> Result<Value> {
    crate::builtins::to_int(&Value::Float(x)).map_err(|_| {
        Error::eval(format!(
            "ValueError: cannot convert float {} to integer in {fname}()",
            Value::Float(x)
        ))
    })
}

fn math(f: &str, args: &[Value]) -> Result<Value> {
    let one = |args: &[Value]| -> Result<f64> {
        arity(f, args, 1, 1)?;
        real(f, &args[0])
    };
    match f {
        "sqrt" => {
            let x = one(args)?;
            if x < 0.0 {
                return Err(domain_error());
            }
            Ok(Value::Float(x.sqrt()))
        }
        "exp" => {
            let y = one(args)?.exp();
            if y.is_infinite() {
                return Err(Error::eval("OverflowError: math range error"));
            }
            Ok(Value::Float(y))
        }
        "log" => {
            arity(f, args, 1, 2)?;
            let x = real(f, &args[0])?;
            if x <= 0.0 {
                return Err(domain_error());
            }
            match args.get(1) {
                Some(b) => {
                    let base = real(f, b)?;
                    if base <= 0.0 || base == 1.0 {
                        return Err(domain_error());
                    }
                    Ok(Value::Float(x.ln() / base.ln()))
                }
                None => Ok(Value::Float(x.ln())),
            }
        }
        "log10" | "log2" => {
            let x = one(args)?;
            if x <= 0.0 {
                return Err(domain_error());
            }
            Ok(Value::Float(if f == "log10" { x.log10() } else { x.log2() }))
        }
        "floor" | "ceil" | "trunc" => {
            arity(f, args, 1, 1)?;
            if let Value::Int(i) = args[0] {
                return Ok(Value::Int(i));
            }
            let x = real(f, &args[0])?;
            let y = match f {
                "floor" => x.floor(),
                "ceil" => x.ceil(),
                _ => x.trunc(),
            };
            to_int(f, y)
        }
        "fabs" => Ok(Value::Float(one(args)?.abs())),
        "pow" => {
            arity(f, args, 2, 2)?;
            let (x, y) = (real(f, &args[0])?, real(f, &args[1])?);
            if x < 0.0 && y.fract() != 0.0 {
                return Err(domain_error());
            }
            if x == 0.0 && y < 0.0 {
                return Err(domain_error());
            }
            Ok(Value::Float(x.powf(y)))
        }
        "sin" => checked(one(args)?.sin()),
        "cos" => checked(one(args)?.cos()),
        "tan" => checked(one(args)?.tan()),
        "atan" => Ok(Value::Float(one(args)?.atan())),
        "isnan" => Ok(Value::Bool(one(args)?.is_nan())),
        "isinf" => Ok(Value::Bool(one(args)?.is_infinite())),
        "isclose" => {
            arity(f, args, 2, 2)?;
            let (a, b) = (real(f, &args[0])?, real(f, &args[1])?);
            let tol = 1e-9 * a.abs().max(b.abs());
            Ok(Value::Bool(a == b || (a - b).abs() <= tol))
        }
        "hypot" => {
            arity(f, args, 2, 2)?;
            Ok(Value::Float(real(f, &args[0])?.hypot(real(f, &args[1])?)))
        }
        other => Err(no_attribute(Module::Math, other)),
    }
}

fn no_attribute(m: Module, name: &str) -> Error {
    Error::eval(format!(
        "AttributeError: module '{}' has no attribute '{name}'",
        m.name()
    ))
}

/// Numeric elements of an array-like argument; a scalar is a 1-element array.
fn numbers(fname: &str, v: &Value) -> Result<Vec<f64>> {
    match v {
        Value::List(items) => items.iter().map(|x| real(fname, x)).collect(),
        scalar => Ok(vec![real(fname, scalar)?]),
    }
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sum of squared deviations from the mean.
fn sum_sq(xs: &[f64]) -> f64 {
    let m = mean(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum()
}

fn median_f(xs: &[f64]) -> f64 {
    let mut v = xs.to_vec();
    v.sort_by(f64::total_cmp);
    let n = v.len();
    if n == 0 {
        f64::NAN
    } else if n % 2 == 1 {
        v[n / 2]
    } else {
        (v[n / 2 - 1] + v[n / 2]) / 2.0
    }
}

fn all_ints(v: &Value) -> bool {
    match v {
        Value::List(items) => items
            .iter()
            .all(|x| matches!(x, Value::Int(_) | Value::Bool(_))),
        other => matches!(other, Value::Int(_) | Value::Bool(_)),
    }
}

fn elementwise(fname: &str, v: &Value, op: fn(f64) -> f64) -> Result<Value> {
    match v {
        Value::List(items) => items
            .iter()
            .map(|x| Ok(Value::Float(op(real(fname, x)?))))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        scalar => Ok(Value::Float(op(real(fname, scalar)?))),
    }
}

fn numpy(f: &str, args: Vec<Value>) -> Result<Value> {
    match f {
        "sqrt" | "log" | "exp" => {
            arity(f, &args, 1, 1)?;
            let op: fn(f64) -> f64 = match f {
                "sqrt" => f64::sqrt,
                "log" => f64::ln,
                _ => f64::exp,
            };
            elementwise(f, &args[0], op)
        }
        "abs" => {
            arity(f, &args, 1, 1)?;
            match &args[0] {
                Value::List(items) => items
                    .iter()
                    .map(|x| call_builtin("abs", vec![x.clone()]))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List),
                scalar => call_builtin("abs", vec![scalar.clone()]),
            }
        }
        "round" => {
            arity(f, &args, 1, 2)?;
            let digits = args.get(1).and_then(Value::as_i64).unwrap_or(0);
            let round_one = |x: &Value| -> Result<Value> {
                let r = call_builtin("round", vec![Value::Float(real(f, x)?), Value::Int(digits)])?;
                Ok(r)
            };
            match &args[0] {
                Value::List(items) => items
                    .iter()
                    .map(round_one)
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List),
                scalar => round_one(scalar),
            }
        }
        "unique" => {
            arity(f, &args, 1, 1)?;
            sorted(unique(iterate(f, &args[0])?)).map(Value::List)
        }
        "sum" | "prod" => {
            arity(f, &args, 1, 1)?;
            let ints = all_ints(&args[0]);
            let xs = numbers(f, &args[0])?;
            let total = if f == "sum" {
                xs.iter().sum::<f64>()
            } else {
                xs.iter().product::<f64>()
            };
            if ints && total.abs() < 9.0e15 {
                Ok(Value::Int(total as i64))
            } else {
                Ok(Value::Float(total))
            }
        }
        "min" | "max" => {
            arity(f, &args, 1, 1)?;
            let items = iterate(f, &args[0]).or_else(|_| Ok::<_, Error>(vec![args[0].clone()]))?;
            if items.is_empty() {
                return Err(Error::eval(format!(
                    "ValueError: zero-size array to reduction operation {f} which has no identity"
                )));
            }
            if items.iter().any(|x| matches!(x, Value::Float(v) if v.is_nan())) {
                return Ok(Value::Float(f64::NAN));
            }
            call_builtin(f, vec![Value::List(items)])
        }
        "mean" | "median" | "std" | "var" => {
            arity(f, &args, 1, 1)?;
            let xs = numbers(f, &args[0])?;
            if xs.is_empty() {
                return Ok(Value::Float(f64::NAN));
            }
            let n = xs.len() as f64;
            Ok(Value::Float(match f {
                "mean" => mean(&xs),
                "median" => median_f(&xs),
                "std" => (sum_sq(&xs) / n).sqrt(),
                _ => sum_sq(&xs) / n,
            }))
        }
        other => Err(no_attribute(Module::Numpy, other)),
    }
}

fn statistics_error(msg: &str) -> Error {
    Error::eval(format!("StatisticsError: {msg}"))
}

fn statistics(f: &str, args: Vec<Value>) -> Result<Value> {
    arity(f, &args, 1, 1)?;
    let items = iterate(f, &args[0])?;
    match f {
        "mode" => {
            let mut counts: indexmap::IndexMap<spoon_core::value::Canonical, (usize, Value)> =
                indexmap::IndexMap::new();
            for v in items {
                counts.entry(v.canonical()).or_insert((0, v)).0 += 1;
            }
            let mut best: Option<(usize, Value)> = None;
            for (_, (n, v)) in counts {
                if best.as_ref().map_or(true, |(b, _)| n > *b) {
                    best = Some((n, v));
                }
            }
            best.map(|(_, v)| v)
                .ok_or_else(|| statistics_error("no mode for empty data"))
        }
        "median" => {
            if items.is_empty() {
                return Err(statistics_error("no median for empty data"));
            }
            let data = sorted(items)?;
            let n = data.len();
            if n % 2 == 1 {
                return Ok(data[n / 2].clone());
            }
            let lo = real(f, &data[n / 2 - 1])?;
            let hi = real(f, &data[n / 2])?;
            Ok(Value::Float((lo + hi) / 2.0))
        }
        _ => {
            let xs = items
                .iter()
                .map(|x| real(f, x))
                .collect::<Result<Vec<_>>>()?;
            let n = xs.len();
            match f {
                "mean" => {
                    if n == 0 {
                        return Err(statistics_error("mean requires at least one data point"));
                    }
                    Ok(Value::Float(mean(&xs)))
                }
                "variance" | "stdev" => {
                    if n < 2 {
                        return Err(statistics_error(&format!(
                            "{f} requires at least two data points"
                        )));
                    }
                    let var = sum_sq(&xs) / (n - 1) as f64;
                    Ok(Value::Float(if f == "stdev" { var.sqrt() } else { var }))
                }
                "pvariance" | "pstdev" => {
                    if n == 0 {
                        return Err(statistics_error(&format!(
                            "{f} requires at least one data point"
                        )));
                    }
                    let var = sum_sq(&xs) / n as f64;
                    Ok(Value::Float(if f == "pstdev" { var.sqrt() } else { var }))
                }
                other => Err(no_attribute(Module::Statistics, other)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(xs: &[i64]) -> Value {
        Value::List(xs.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn math_floor_returns_int() {
        assert_eq!(
            Module::Math.call("floor", vec![Value::Float(-1.5)]).unwrap(),
            Value::Int(-2)
        );
        assert!(Module::Math.call("sqrt", vec![Value::Int(-1)]).is_err());
    }

    #[test]
    fn numpy_reductions() {
        let xs = ints(&[1, 2, 3, 4]);
        assert_eq!(
            Module::Numpy.call("mean", vec![xs.clone()]).unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            Module::Numpy.call("sum", vec![xs.clone()]).unwrap(),
            Value::Int(10)
        );
        assert_eq!(
            Module::Numpy.call("median", vec![xs]).unwrap(),
            Value::Float(2.5)
        );
    }

    #[test]
    fn statistics_sample_variance_needs_two_points() {
        assert!(Module::Statistics
            .call("stdev", vec![ints(&[1])])
            .is_err());
        assert_eq!(
            Module::Statistics
                .call("variance", vec![ints(&[1, 2, 3])])
                .unwrap(),
            Value::Float(1.0)
        );
    }

    #[test]
    fn statistics_median_keeps_odd_middle_element() {
        assert_eq!(
            Module::Statistics
                .call("median", vec![ints(&[3, 1, 2])])
                .unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn statistics_mode_prefers_first_seen() {
        let data = Value::List(vec![
            Value::str("b"),
            Value::str("a"),
            Value::str("a"),
            Value::str("b"),
        ]);
        assert_eq!(
            Module::Statistics.call("mode", vec![data]).unwrap(),
            Value::str("b")
        );
    }

    #[test]
    fn module_constants() {
        assert_eq!(
            Module::Math.constant("pi"),
            Some(Value::Float(std::f64::consts::PI))
        );
        assert_eq!(Module::Statistics.constant("pi"), None);
    }
}
