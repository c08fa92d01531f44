//! Grouped aggregation over typed rows.
//!
//! Every row is materialized into a group store keyed by the typed key tuple;
//! each group keeps, per column, the ordered list of values it saw. A column
//! survives only if it holds a single distinct value inside every group.
//! Aggregations are evaluated lazily, once per group, against the group's
//! value lists.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use spoon_core::value::Canonical;
use spoon_core::{Bindings, Evaluator, Result as CoreResult, Row, Schema, Value};
use tracing::debug;

use crate::plan::{Buffering, Footprint, OpPlan};
use crate::stream::RowStream;
use crate::traits::{expect_inputs, require_columns, OpError, Operator};

/// Column-major value lists of one group, in input schema order.
type GroupStore = Vec<Vec<Value>>;

#[derive(Default, Clone)]
pub struct Aggregate {
    /// Grouping columns; empty means a single global group.
    pub keys: Vec<String>,
    /// `(output column, reduction)` pairs, evaluated in this order.
    pub aggregations: Vec<(String, Arc<dyn Evaluator>)>,
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("keys", &self.keys)
            .field(
                "aggregations",
                &self.aggregations.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Aggregate {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            aggregations: Vec::new(),
        }
    }

    pub fn with_aggregation(
        mut self,
        column: impl Into<String>,
        reduction: Arc<dyn Evaluator>,
    ) -> Self {
        self.aggregations.push((column.into(), reduction));
        self
    }

    fn group(&self, input: &mut RowStream) -> CoreResult<IndexMap<Vec<Canonical>, GroupStore>> {
        let columns = input.schema().clone();
        let mut groups: IndexMap<Vec<Canonical>, GroupStore> = IndexMap::new();
        for typed in input.typed_rows()? {
            let typed = typed?;
            let key: Vec<Canonical> = self
                .keys
                .iter()
                .map(|k| typed.get(k).map_or(Canonical::None, Value::canonical))
                .collect();
            let store = groups
                .entry(key)
                .or_insert_with(|| vec![Vec::new(); columns.len()]);
            for (i, name) in columns.iter().enumerate() {
                store[i].push(typed.get(name).cloned().unwrap_or(Value::None));
            }
        }
        Ok(groups)
    }
}

/// Columns whose values agree inside every group.
fn unanimous_columns(columns: &Schema, groups: &IndexMap<Vec<Canonical>, GroupStore>) -> Vec<usize> {
    (0..columns.len())
        .filter(|&i| {
            groups.values().all(|store| {
                let distinct: IndexSet<Canonical> = store[i].iter().map(Value::canonical).collect();
                distinct.len() == 1
            })
        })
        .collect()
}

impl Operator for Aggregate {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn memory_need(&self) -> Footprint {
        Footprint {
            buffering: Buffering::Full,
            overhead_per_row: 32,
        }
    }

    /// The output schema depends on the data (unanimity), so planning only
    /// validates the keys and reports the aggregated columns.
    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        expect_inputs(self.name(), input_schemas.len(), 1)?;
        require_columns(&input_schemas[0], &self.keys)?;
        let out = Schema::new(self.aggregations.iter().map(|(n, _)| n.as_str()));
        Ok(OpPlan::new(out, self.memory_need()))
    }

    fn execute(&self, inputs: Vec<RowStream>) -> Result<RowStream, OpError> {
        expect_inputs(self.name(), inputs.len(), 1)?;
        let Some(mut input) = inputs.into_iter().next() else {
            return Err(OpError::Plan("aggregate expects one input".into()));
        };
        self.plan(&[input.schema().clone()])
            .map_err(|e| e.in_source(input.origin()))?;

        let columns = input.schema().clone();
        let groups = self.group(&mut input)?;
        let kept = unanimous_columns(&columns, &groups);
        debug!(
            groups = groups.len(),
            unanimous = kept.len(),
            "aggregate groups built"
        );

        let mut schema = Schema::new(kept.iter().map(|&i| columns.names[i].as_str()));
        for (name, _) in &self.aggregations {
            schema.push(name.as_str());
        }

        let aggregations = self.aggregations.clone();
        let out_schema = schema.clone();
        let origin = input.origin().to_string();
        let rows = groups.into_values().map(move |store| {
            group_row(&columns, &kept, &aggregations, &out_schema, store)
                .map_err(|e| e.in_source(&origin))
        });
        Ok(RowStream::new(schema, rows).with_origin(format!("aggregate({})", input.origin())))
    }
}

fn group_row(
    columns: &Schema,
    kept: &[usize],
    aggregations: &[(String, Arc<dyn Evaluator>)],
    schema: &Schema,
    store: GroupStore,
) -> CoreResult<Row> {
    let mut fields: IndexMap<&str, String> = IndexMap::with_capacity(schema.len());
    for &i in kept {
        let first = store[i].first().map(Value::to_field).unwrap_or_default();
        fields.insert(columns.names[i].as_str(), first);
    }

    if !aggregations.is_empty() {
        let bindings: Bindings = columns
            .iter()
            .zip(store)
            .map(|(name, values)| (name.to_string(), Value::List(values)))
            .collect();
        for (name, reduction) in aggregations {
            let value = reduction.evaluate(&bindings)?;
            fields.insert(name.as_str(), value.to_field());
        }
    }

    Ok(schema
        .iter()
        .map(|c| (c.to_string(), fields.get(c).cloned().unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoon_core::row::row_from_fields;
    use spoon_core::Error;

    fn stream(cols: &[&str], rows: &[&[&str]]) -> RowStream {
        let schema = Schema::new(cols.iter().copied());
        let rows = rows
            .iter()
            .map(|r| row_from_fields(&schema, r.iter().copied()))
            .collect();
        RowStream::from_rows(schema, rows)
    }

    fn count_of(col: &'static str) -> Arc<dyn Evaluator> {
        Arc::new(move |b: &Bindings| -> CoreResult<Value> {
            match &b[col] {
                Value::List(v) => Ok(Value::Int(v.len() as i64)),
                other => Err(Error::eval(format!("expected list, got {other:?}"))),
            }
        })
    }

    fn grades() -> RowStream {
        stream(
            &["group", "name", "grade", "school"],
            &[
                &["a", "ann", "10", "north"],
                &["b", "bob", "12", "north"],
                &["a", "cid", "14", "north"],
            ],
        )
    }

    #[test]
    fn uniform_stream_collapses_to_one_row() {
        let input = stream(&["x", "y"], &[&["1", "2"], &["1", "2"]]);
        let mut out = input.aggregate(&Aggregate::default()).unwrap();
        assert_eq!(out.schema(), &Schema::new(["x", "y"]));
        let rows = out.collect_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["y"], "2");
    }

    #[test]
    fn disagreeing_columns_are_dropped() {
        let agg = Aggregate::new(vec!["group".into()]).with_aggregation("n", count_of("name"));
        let mut out = grades().aggregate(&agg).unwrap();
        assert_eq!(out.schema(), &Schema::new(["group", "school", "n"]));
        let rows = out.collect_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0]["group"].as_str(), rows[0]["n"].as_str()), ("a", "2"));
        assert_eq!((rows[1]["group"].as_str(), rows[1]["n"].as_str()), ("b", "1"));
    }

    #[test]
    fn aggregation_overrides_a_unanimous_column() {
        let agg = Aggregate::new(vec![]).with_aggregation("school", count_of("school"));
        let rows = grades().aggregate(&agg).unwrap().collect_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["school"], "3");
    }

    #[test]
    fn typed_keys_group_equal_numbers() {
        let mut input = stream(&["k", "v"], &[&["1", "a"], &["1.0", "b"], &["2", "c"]]);
        input.add_type(
            "k",
            Arc::new(|v: Value| -> CoreResult<Value> {
                match &v {
                    Value::Str(s) => Ok(Value::Float(s.parse().unwrap_or(f64::NAN))),
                    _ => Ok(v.clone()),
                }
            }),
        );
        let agg = Aggregate::new(vec!["k".into()]).with_aggregation("n", count_of("v"));
        let rows = input.aggregate(&agg).unwrap().collect_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["k"], "1.0");
        assert_eq!(rows[0]["n"], "2");
    }

    #[test]
    fn missing_key_is_a_schema_error() {
        let agg = Aggregate::new(vec!["nope".into()]);
        let err = grades().with_origin("grades.csv").aggregate(&agg).unwrap_err();
        assert!(matches!(
            err,
            OpError::Core(Error::ColumnsNotFound { ref source_name, ref columns })
                if source_name == "grades.csv" && columns == &["nope"]
        ));
    }

    #[test]
    fn reduction_errors_surface_when_rows_are_read() {
        let failing: Arc<dyn Evaluator> =
            Arc::new(|_: &Bindings| -> CoreResult<Value> { Err(Error::eval("boom")) });
        let agg = Aggregate::new(vec![]).with_aggregation("x", failing);
        let mut out = grades().aggregate(&agg).unwrap();
        let first = out.rows().unwrap().next().unwrap();
        assert!(first.is_err());
    }
}
