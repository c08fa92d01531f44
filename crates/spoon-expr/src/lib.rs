#![forbid(unsafe_code)]
//! spoon-expr: the small Python-flavoured formula language used by `apply`,
//! `filter`, `aggregate` and `-t` type directives.
//!
//! Build a [`Context`] from preamble code with [`ContextBuilder`], then
//! compile formulas ([`Formula`], an `Evaluator`) and resolve type names
//! ([`TypeBinding`], a `Coercion`) against it.

pub mod ast;
pub mod context;
pub mod error;
pub mod formula;
pub mod modules;
pub mod parser;

mod builtins;
mod interp;
mod lexer;
mod ops;

pub use context::{Context, ContextBuilder};
pub use error::{ExprError, Result};
pub use formula::{Formula, TypeBinding};
pub use modules::Module;
