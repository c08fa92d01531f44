//! Seams between the row engine and whatever evaluates user formulas.
//!
//! The operators only see these two traits; the formula language lives in a
//! separate crate and plugs in through them. Plain closures implement both,
//! which keeps operator tests free of any formula parsing.

use crate::error::Result;
use crate::row::Bindings;
use crate::value::Value;

/// A compiled, side-effect-free user formula.
pub trait Evaluator: Send + Sync {
    /// Evaluate against the visible bindings and return one value.
    fn evaluate(&self, bindings: &Bindings) -> Result<Value>;
}

/// A column type: turns a raw (or freshly computed) value into its typed form.
pub trait Coercion: Send + Sync {
    fn coerce(&self, value: Value) -> Result<Value>;
}

impl<F> Evaluator for F
where
    F: Fn(&Bindings) -> Result<Value> + Send + Sync,
{
    fn evaluate(&self, bindings: &Bindings) -> Result<Value> {
        self(bindings)
    }
}

impl<F> Coercion for F
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    fn coerce(&self, value: Value) -> Result<Value> {
        self(value)
    }
}
