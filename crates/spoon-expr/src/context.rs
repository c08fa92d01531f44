//! Evaluation context built from preamble code.
//!
//! A context is filled once by [`ContextBuilder`] and then frozen behind an
//! `Arc`; every compiled formula and type binding holds a clone of it.

use std::sync::Arc;

use indexmap::IndexMap;
use spoon_core::{Bindings, Error, Value};
use tracing::debug;

use crate::ast::{Expr, Stmt};
use crate::builtins::{self, call_builtin};
use crate::error::{ExprError, Result};
use crate::formula::{Formula, TypeBinding};
use crate::interp::{self, Scope};
use crate::modules::Module;
use crate::parser::{parse_expr, parse_program};

/// User functions may call each other; bound the nesting.
pub(crate) const MAX_CALL_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub(crate) struct UserFn {
    pub params: Vec<String>,
    pub body: Expr,
}

/// Something that can be applied to argument values.
#[derive(Debug, Clone)]
pub(crate) enum Callable {
    Builtin(String),
    Module(Module, String),
    User(String),
}

#[derive(Debug, Default)]
pub struct Context {
    modules: IndexMap<String, Module>,
    constants: Bindings,
    functions: IndexMap<String, UserFn>,
}

impl Context {
    /// A context with nothing imported or defined.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    pub fn module(&self, alias: &str) -> Option<Module> {
        self.modules.get(alias).copied()
    }

    pub(crate) fn function(&self, name: &str) -> Option<&UserFn> {
        self.functions.get(name)
    }

    /// Compile a formula against this context.
    pub fn compile(self: &Arc<Self>, source: &str) -> Result<Formula> {
        let expr = parse_expr(source)?;
        Ok(Formula::new(source, expr, Arc::clone(self)))
    }

    /// Resolve a `-t col:TYPE` type expression to a one-argument callable.
    pub fn resolve_type(self: &Arc<Self>, type_expr: &str) -> Result<TypeBinding> {
        let unknown = || ExprError::UnknownType(type_expr.to_string());
        let callable = match parse_expr(type_expr).map_err(|_| unknown())? {
            Expr::Name(name) => match self.function(&name) {
                Some(f) if f.params.len() == 1 => Callable::User(name),
                Some(_) => {
                    return Err(ExprError::Preamble {
                        statement: format!("def {name}"),
                        message: "a type function must take exactly one argument".to_string(),
                    })
                }
                None if builtins::is_builtin(&name) => Callable::Builtin(name),
                None => return Err(unknown()),
            },
            Expr::Attr(obj, func) => match *obj {
                Expr::Name(alias) => match self.module(&alias) {
                    Some(m) if m.has_function(&func) => Callable::Module(m, func),
                    _ => return Err(unknown()),
                },
                _ => return Err(unknown()),
            },
            _ => return Err(unknown()),
        };
        Ok(TypeBinding::new(type_expr, callable, Arc::clone(self)))
    }

    pub(crate) fn call(
        &self,
        callable: &Callable,
        args: Vec<Value>,
        depth: usize,
    ) -> spoon_core::Result<Value> {
        match callable {
            Callable::Builtin(name) => call_builtin(name, args),
            Callable::Module(m, name) => m.call(name, args),
            Callable::User(name) => {
                let f = self
                    .function(name)
                    .ok_or_else(|| Error::eval(format!("NameError: name '{name}' is not defined")))?;
                if args.len() != f.params.len() {
                    return Err(Error::eval(format!(
                        "TypeError: {name}() takes {} positional argument(s) but {} were given",
                        f.params.len(),
                        args.len()
                    )));
                }
                if depth >= MAX_CALL_DEPTH {
                    return Err(Error::eval("RecursionError: maximum recursion depth exceeded"));
                }
                let frame: Bindings = f.params.iter().cloned().zip(args).collect();
                interp::eval(&f.body, &Scope::new(&frame, self).nested(depth + 1))
            }
        }
    }
}

/// Runs preamble statements, then freezes the result.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    ctx: Context,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `--np` shortcut.
    pub fn import_numpy(&mut self) -> &mut Self {
        self.bind_module("np", Module::Numpy);
        self
    }

    /// Execute one block of preamble code.
    pub fn run(&mut self, code: &str) -> Result<&mut Self> {
        let statements = parse_program(code)?;
        let count = statements.len();
        for stmt in statements {
            self.exec(stmt)?;
        }
        debug!(statements = count, "preamble executed");
        Ok(self)
    }

    pub fn build(self) -> Arc<Context> {
        Arc::new(self.ctx)
    }

    fn forget(&mut self, name: &str) {
        self.ctx.modules.shift_remove(name);
        self.ctx.constants.shift_remove(name);
        self.ctx.functions.shift_remove(name);
    }

    fn bind_module(&mut self, alias: &str, module: Module) {
        self.forget(alias);
        self.ctx.modules.insert(alias.to_string(), module);
    }

    fn exec(&mut self, stmt: Stmt) -> Result<()> {
        match stmt {
            Stmt::Import { module, alias } => {
                let m = Module::from_name(&module)
                    .ok_or_else(|| ExprError::UnknownModule(module.clone()))?;
                self.bind_module(alias.as_deref().unwrap_or(&module), m);
            }
            Stmt::Assign { name, value } => {
                let empty = Bindings::new();
                let v = interp::eval(&value, &Scope::new(&empty, &self.ctx)).map_err(|e| {
                    ExprError::Preamble {
                        statement: format!("{name} = ..."),
                        message: e.to_string(),
                    }
                })?;
                self.forget(&name);
                self.ctx.constants.insert(name, v);
            }
            Stmt::Def { name, params, body } => {
                self.forget(&name);
                self.ctx.functions.insert(name, UserFn { params, body });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_evaluated_once_with_earlier_imports() {
        let mut b = ContextBuilder::new();
        b.run("import math\nhalf_pi = math.pi / 2").unwrap();
        let ctx = b.build();
        assert_eq!(
            ctx.constant("half_pi"),
            Some(&Value::Float(std::f64::consts::FRAC_PI_2))
        );
    }

    #[test]
    fn unknown_module_is_rejected() {
        let mut b = ContextBuilder::new();
        assert!(matches!(
            b.run("import pandas"),
            Err(ExprError::UnknownModule(m)) if m == "pandas"
        ));
    }

    #[test]
    fn type_resolution() {
        let mut b = ContextBuilder::new();
        b.import_numpy();
        b.run("import math; def cents(x): int(float(x) * 100); def two(a, b): a").unwrap();
        let ctx = b.build();
        assert!(ctx.resolve_type("int").is_ok());
        assert!(ctx.resolve_type("cents").is_ok());
        assert!(ctx.resolve_type("math.floor").is_ok());
        assert!(matches!(ctx.resolve_type("decimal"), Err(ExprError::UnknownType(_))));
        assert!(matches!(ctx.resolve_type("np.nothing"), Err(ExprError::UnknownType(_))));
        assert!(ctx.resolve_type("two").is_err());
    }

    #[test]
    fn redefinition_replaces_previous_binding() {
        let mut b = ContextBuilder::new();
        b.run("x = 1").unwrap().run("x = 2").unwrap();
        assert_eq!(b.build().constant("x"), Some(&Value::Int(2)));
    }
}
