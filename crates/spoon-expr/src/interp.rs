//! Tree-walking interpreter.

use spoon_core::{Bindings, Error, Result, Value};

use crate::ast::Expr;
use crate::builtins::{self, call_method};
use crate::context::{Callable, Context};
use crate::ops;

pub(crate) struct Scope<'a> {
    frame: &'a Bindings,
    ctx: &'a Context,
    depth: usize,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(frame: &'a Bindings, ctx: &'a Context) -> Self {
        Self {
            frame,
            ctx,
            depth: 0,
        }
    }

    pub(crate) fn nested(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    fn is_local(&self, name: &str) -> bool {
        self.frame.contains_key(name) || self.ctx.constant(name).is_some()
    }
}

enum Callee {
    Fn(Callable),
    Method(Value, String),
}

pub(crate) fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Value> {
    match expr {
        Expr::Lit(v) => Ok(v.clone()),
        Expr::Name(name) => lookup(name, scope),
        Expr::List(items) => items
            .iter()
            .map(|e| eval(e, scope))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Expr::Unary(op, inner) => {
            let v = eval(inner, scope)?;
            ops::unary(*op, v)
        }
        Expr::Binary(op, l, r) => {
            let l = eval(l, scope)?;
            let r = eval(r, scope)?;
            ops::binary(*op, l, r)
        }
        Expr::Compare(first, rest) => {
            let mut lhs = eval(first, scope)?;
            for (op, e) in rest {
                let rhs = eval(e, scope)?;
                if !ops::compare(*op, &lhs, &rhs)? {
                    return Ok(Value::Bool(false));
                }
                lhs = rhs;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(l, r) => {
            let l = eval(l, scope)?;
            if l.truthy() {
                eval(r, scope)
            } else {
                Ok(l)
            }
        }
        Expr::Or(l, r) => {
            let l = eval(l, scope)?;
            if l.truthy() {
                Ok(l)
            } else {
                eval(r, scope)
            }
        }
        Expr::IfElse {
            cond,
            then,
            otherwise,
        } => {
            if eval(cond, scope)?.truthy() {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Call { func, args } => {
            let callee = callee(func, scope)?;
            let args = args
                .iter()
                .map(|a| eval(a, scope))
                .collect::<Result<Vec<_>>>()?;
            match callee {
                Callee::Fn(c) => scope.ctx.call(&c, args, scope.depth),
                Callee::Method(recv, name) => call_method(recv, &name, args),
            }
        }
        Expr::Attr(obj, name) => {
            if let Some(m) = module_ref(obj, scope) {
                return m.constant(name).ok_or_else(|| {
                    Error::eval(format!(
                        "AttributeError: module '{}' has no constant '{name}'",
                        m.name()
                    ))
                });
            }
            let v = eval(obj, scope)?;
            Err(Error::eval(format!(
                "AttributeError: '{}' object attribute '{name}' is only callable",
                v.type_name()
            )))
        }
        Expr::Index(value, idx) => {
            let v = eval(value, scope)?;
            let i = eval(idx, scope)?;
            ops::index(&v, &i)
        }
        Expr::Slice {
            value,
            lower,
            upper,
        } => {
            let v = eval(value, scope)?;
            let lower = bound(lower.as_deref(), scope)?;
            let upper = bound(upper.as_deref(), scope)?;
            ops::slice(&v, lower, upper)
        }
    }
}

fn lookup(name: &str, scope: &Scope<'_>) -> Result<Value> {
    if let Some(v) = scope.frame.get(name) {
        return Ok(v.clone());
    }
    if let Some(v) = scope.ctx.constant(name) {
        return Ok(v.clone());
    }
    if scope.ctx.module(name).is_some()
        || scope.ctx.function(name).is_some()
        || builtins::is_builtin(name)
    {
        return Err(Error::eval(format!(
            "TypeError: '{name}' is a function or module, not a value"
        )));
    }
    Err(Error::ColumnNotFound(name.to_string()))
}

fn module_ref(obj: &Expr, scope: &Scope<'_>) -> Option<crate::modules::Module> {
    match obj {
        Expr::Name(alias) if !scope.is_local(alias) => scope.ctx.module(alias),
        _ => None,
    }
}

fn callee(func: &Expr, scope: &Scope<'_>) -> Result<Callee> {
    match func {
        Expr::Name(name) => {
            if scope.ctx.function(name).is_some() {
                Ok(Callee::Fn(Callable::User(name.clone())))
            } else if builtins::is_builtin(name) {
                Ok(Callee::Fn(Callable::Builtin(name.clone())))
            } else if scope.is_local(name) {
                let v = lookup(name, scope)?;
                Err(not_callable(&v))
            } else {
                Err(Error::eval(format!("NameError: name '{name}' is not defined")))
            }
        }
        Expr::Attr(obj, method) => match module_ref(obj, scope) {
            Some(m) if m.has_function(method) => Ok(Callee::Fn(Callable::Module(m, method.clone()))),
            Some(m) => Err(Error::eval(format!(
                "AttributeError: module '{}' has no attribute '{method}'",
                m.name()
            ))),
            None => Ok(Callee::Method(eval(obj, scope)?, method.clone())),
        },
        other => {
            let v = eval(other, scope)?;
            Err(not_callable(&v))
        }
    }
}

fn not_callable(v: &Value) -> Error {
    Error::eval(format!(
        "TypeError: '{}' object is not callable",
        v.type_name()
    ))
}

fn bound(e: Option<&Expr>, scope: &Scope<'_>) -> Result<Option<i64>> {
    let Some(e) = e else {
        return Ok(None);
    };
    match eval(e, scope)? {
        Value::None => Ok(None),
        v @ (Value::Int(_) | Value::Bool(_)) => Ok(v.as_i64()),
        other => Err(Error::eval(format!(
            "TypeError: slice indices must be integers or None, not {}",
            other.type_name()
        ))),
    }
}

