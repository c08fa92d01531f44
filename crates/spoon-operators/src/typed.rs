//! Per-row typed evaluation layered over a row stream.
//!
//! For each row: coerce the typed columns that are not computed, run the
//! applied columns in order (each sees the ones before it), then run every
//! filter. The untyped row receives the rendered results; the typed row keeps
//! the raw values, re-coerced when the computed column is itself typed.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use spoon_core::{Bindings, Coercion, Evaluator, Result, Row, Value};

#[derive(Default, Clone)]
pub struct TypedView {
    types: IndexMap<String, Arc<dyn Coercion>>,
    applied: Vec<(String, Arc<dyn Evaluator>)>,
    computed: IndexSet<String>,
    filters: Vec<Arc<dyn Evaluator>>,
}

impl fmt::Debug for TypedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedView")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("applied", &self.computed)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl TypedView {
    /// Bind `column` to a type; a later binding for the same column wins.
    pub fn add_type(&mut self, column: impl Into<String>, coercion: Arc<dyn Coercion>) {
        self.types.insert(column.into(), coercion);
    }

    pub fn add_apply(&mut self, column: impl Into<String>, evaluator: Arc<dyn Evaluator>) {
        let column = column.into();
        self.computed.insert(column.clone());
        self.applied.push((column, evaluator));
    }

    pub fn add_filter(&mut self, evaluator: Arc<dyn Evaluator>) {
        self.filters.push(evaluator);
    }

    pub fn typed_columns(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Whether rows must go through [`TypedView::process`] at all.
    pub fn is_active(&self) -> bool {
        !(self.types.is_empty() && self.applied.is_empty() && self.filters.is_empty())
    }

    /// Typed row for `row` with the bound, non-computed columns coerced.
    fn initial_bindings(&self, row: &Row) -> Result<Bindings> {
        let mut typed = Bindings::with_capacity(row.len() + self.applied.len());
        for (name, raw) in row {
            let value = Value::Str(raw.clone());
            let value = match self.types.get(name) {
                Some(t) if !self.computed.contains(name) => t.coerce(value)?,
                _ => value,
            };
            typed.insert(name.clone(), value);
        }
        Ok(typed)
    }

    /// Run the full pipeline on one row. `Ok(None)` means a filter rejected it.
    pub fn process(&self, mut row: Row) -> Result<Option<(Row, Bindings)>> {
        let mut typed = self.initial_bindings(&row)?;

        for (name, evaluator) in &self.applied {
            let raw = evaluator.evaluate(&typed)?;
            row.insert(name.clone(), raw.to_field());
            let value = match self.types.get(name) {
                Some(t) => t.coerce(raw)?,
                None => raw,
            };
            typed.insert(name.clone(), value);
        }

        // Every filter runs, even after one has already rejected the row.
        let mut keep = true;
        for filter in &self.filters {
            if !filter.evaluate(&typed)?.truthy() {
                keep = false;
            }
        }
        Ok(keep.then_some((row, typed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoon_core::Error;

    fn int_type() -> Arc<dyn Coercion> {
        Arc::new(|v: Value| match v {
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Error::eval(format!("not an int: {s:?}"))),
            other => Ok(other),
        })
    }

    fn sum_ab() -> Arc<dyn Evaluator> {
        Arc::new(|b: &Bindings| match (&b["a"], &b["b"]) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x + y)),
            _ => Err(Error::eval("untyped")),
        })
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn inactive_view_is_detected() {
        assert!(!TypedView::default().is_active());
    }

    #[test]
    fn applied_column_is_rendered_and_appended() {
        let mut view = TypedView::default();
        view.add_type("a", int_type());
        view.add_type("b", int_type());
        view.add_apply("c", sum_ab());
        let (out, typed) = view.process(row(&[("a", "1"), ("b", "2")])).unwrap().unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(out["c"], "3");
        assert_eq!(typed["c"], Value::Int(3));
        // the untyped row keeps the original text of typed columns
        assert_eq!(out["a"], "1");
    }

    #[test]
    fn later_applies_see_raw_earlier_results() {
        let mut view = TypedView::default();
        view.add_type("a", int_type());
        view.add_apply(
            "sq",
            Arc::new(|b: &Bindings| -> Result<Value> {
                Ok(Value::Int(b["a"].as_i64().unwrap_or(0).pow(2)))
            }),
        );
        view.add_apply(
            "sq_minus_one",
            Arc::new(|b: &Bindings| match &b["sq"] {
                Value::Int(v) => Ok(Value::Int(v - 1)),
                other => Err(Error::eval(format!("expected int, got {other:?}"))),
            }),
        );
        let (out, _) = view.process(row(&[("a", "3")])).unwrap().unwrap();
        assert_eq!(out["sq_minus_one"], "8");
    }

    #[test]
    fn computed_typed_column_is_recoerced_from_raw_value() {
        let mut view = TypedView::default();
        view.add_type(
            "n",
            Arc::new(|v: Value| -> Result<Value> { Ok(Value::Float(v.as_f64().unwrap_or(0.0))) }),
        );
        view.add_apply("n", Arc::new(|_: &Bindings| -> Result<Value> { Ok(Value::Int(2)) }));
        let (out, typed) = view.process(row(&[("n", "not a number")])).unwrap().unwrap();
        assert_eq!(out["n"], "2");
        assert_eq!(typed["n"], Value::Float(2.0));
    }

    #[test]
    fn filters_are_a_conjunction() {
        let mut view = TypedView::default();
        view.add_type("a", int_type());
        view.add_filter(Arc::new(|b: &Bindings| -> Result<Value> {
            Ok(Value::Bool(b["a"].as_i64() > Some(1)))
        }));
        view.add_filter(Arc::new(|b: &Bindings| -> Result<Value> {
            Ok(Value::Bool(b["a"].as_i64() < Some(5)))
        }));
        assert!(view.process(row(&[("a", "3")])).unwrap().is_some());
        assert!(view.process(row(&[("a", "7")])).unwrap().is_none());
        assert!(view.process(row(&[("a", "0")])).unwrap().is_none());
    }

    #[test]
    fn coercion_failure_is_fatal() {
        let mut view = TypedView::default();
        view.add_type("a", int_type());
        let err = view.process(row(&[("a", "x")])).unwrap_err();
        assert!(matches!(err, Error::Eval(_)));
    }
}
