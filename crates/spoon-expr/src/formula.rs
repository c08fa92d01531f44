//! Compiled formulas and type bindings: the two things the operators see.

use std::fmt;
use std::sync::Arc;

use spoon_core::{Bindings, Coercion, Error, Evaluator, Result, Value};

use crate::ast::Expr;
use crate::context::{Callable, Context};
use crate::interp::{self, Scope};

/// A parsed formula bound to its context.
#[derive(Clone)]
pub struct Formula {
    source: String,
    expr: Expr,
    ctx: Arc<Context>,
}

impl Formula {
    pub(crate) fn new(source: &str, expr: Expr, ctx: Arc<Context>) -> Self {
        Self {
            source: source.to_string(),
            expr,
            ctx,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Formula").field(&self.source).finish()
    }
}

impl Evaluator for Formula {
    fn evaluate(&self, bindings: &Bindings) -> Result<Value> {
        interp::eval(&self.expr, &Scope::new(bindings, &self.ctx)).map_err(|e| match e {
            Error::Eval(msg) => Error::Eval(format!("{msg} (in formula {:?})", self.source)),
            other => other,
        })
    }
}

/// A resolved `-t col:TYPE` callable.
#[derive(Clone)]
pub struct TypeBinding {
    name: String,
    callable: Callable,
    ctx: Arc<Context>,
}

impl TypeBinding {
    pub(crate) fn new(name: &str, callable: Callable, ctx: Arc<Context>) -> Self {
        Self {
            name: name.to_string(),
            callable,
            ctx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for TypeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeBinding").field(&self.name).finish()
    }
}

impl Coercion for TypeBinding {
    fn coerce(&self, value: Value) -> Result<Value> {
        self.ctx.call(&self.callable, vec![value], 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;

    fn eval_with(preamble: &str, src: &str, row: &[(&str, Value)]) -> Result<Value> {
        let mut b = ContextBuilder::new();
        b.run(preamble).unwrap();
        let ctx = b.build();
        let bindings: Bindings = row
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        ctx.compile(src).unwrap().evaluate(&bindings)
    }

    fn eval(src: &str, row: &[(&str, Value)]) -> Value {
        eval_with("", src, row).unwrap()
    }

    #[test]
    fn arithmetic_over_typed_columns() {
        let row = [("a", Value::Int(1)), ("b", Value::Int(2))];
        assert_eq!(eval("a + b", &row), Value::Int(3));
        assert_eq!(eval("a / b", &row), Value::Float(0.5));
        assert_eq!(eval("(a + b) ** 2 % 5", &row), Value::Int(4));
    }

    #[test]
    fn untyped_columns_are_strings() {
        let row = [("a", Value::str("1")), ("b", Value::str("2"))];
        assert_eq!(eval("a + b", &row), Value::str("12"));
        assert_eq!(eval("int(a) + int(b)", &row), Value::Int(3));
    }

    #[test]
    fn boolean_operators_return_operands() {
        let row = [("s", Value::str(""))];
        assert_eq!(eval("s or 'default'", &row), Value::str("default"));
        assert_eq!(eval("s and 1", &row), Value::str(""));
        assert_eq!(eval("not s", &row), Value::Bool(true));
    }

    #[test]
    fn chained_comparison_short_circuits() {
        let row = [("x", Value::Int(5))];
        assert_eq!(eval("1 < x < 10", &row), Value::Bool(true));
        assert_eq!(eval("1 < x < 3", &row), Value::Bool(false));
        // the second comparison would fail with a type error if evaluated
        assert_eq!(eval("x < 0 < 'a'", &row), Value::Bool(false));
    }

    #[test]
    fn conditional_and_string_methods() {
        let row = [("name", Value::str("  Ada "))];
        assert_eq!(
            eval("name.strip().upper() if name else 'anon'", &row),
            Value::str("ADA")
        );
        assert_eq!(eval("name.strip()[1:]", &row), Value::str("da"));
    }

    #[test]
    fn unknown_name_is_a_missing_column() {
        let err = eval_with("", "missing + 1", &[]).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(ref c) if c == "missing"));
    }

    #[test]
    fn runtime_errors_name_the_formula() {
        let err = eval_with("", "1 // 0", &[]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("ZeroDivisionError"), "{msg}");
        assert!(msg.contains("1 // 0"), "{msg}");
    }

    #[test]
    fn preamble_functions_and_modules() {
        let row = [("x", Value::Int(3))];
        assert_eq!(
            eval_with("def sq(v): v * v\nk = 10", "sq(x) + k", &row).unwrap(),
            Value::Int(19)
        );
        assert_eq!(
            eval_with("import math as m", "m.floor(m.sqrt(x * 3))", &row).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn row_bindings_shadow_module_aliases() {
        let row = [("np", Value::str("abc"))];
        assert_eq!(
            eval_with("import numpy as np", "np.upper()", &row).unwrap(),
            Value::str("ABC")
        );
    }

    #[test]
    fn aggregate_style_list_bindings() {
        let row = [(
            "v",
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(6)]),
        )];
        assert_eq!(eval("sum(v) / len(v)", &row), Value::Float(3.0));
        assert_eq!(
            eval_with("import numpy as np", "np.mean(v)", &row).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(eval("max(v) - min(v)", &row), Value::Int(5));
    }

    #[test]
    fn runaway_recursion_is_an_error() {
        let err = eval_with("def f(x): f(x)", "f(1)", &[]).unwrap_err();
        assert!(err.to_string().contains("RecursionError"));
    }

    #[test]
    fn user_function_as_type() {
        let mut b = ContextBuilder::new();
        b.run("def cents(x): int(float(x) * 100)").unwrap();
        let ctx = b.build();
        let t = ctx.resolve_type("cents").unwrap();
        assert_eq!(t.coerce(Value::str("1.25")).unwrap(), Value::Int(125));
        let int = ctx.resolve_type("int").unwrap();
        assert!(int.coerce(Value::str("x")).is_err());
    }
}
