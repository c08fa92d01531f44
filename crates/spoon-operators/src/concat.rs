//! Concatenation: rows of the first input, then rows of the second, each
//! padded with empty strings for the columns only the other side has.

use spoon_core::row::conform;
use spoon_core::Schema;
use tracing::trace;

use crate::plan::{Footprint, OpPlan};
use crate::stream::RowStream;
use crate::traits::{expect_inputs, OpError, Operator};

#[derive(Debug, Default, Clone, Copy)]
pub struct Concat;

impl Operator for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn memory_need(&self) -> Footprint {
        Footprint::streaming()
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        expect_inputs(self.name(), input_schemas.len(), 2)?;
        let schema = input_schemas[0].union(&input_schemas[1]);
        Ok(OpPlan::new(schema, self.memory_need()))
    }

    fn execute(&self, inputs: Vec<RowStream>) -> Result<RowStream, OpError> {
        expect_inputs(self.name(), inputs.len(), 2)?;
        let plan = self.plan(&[inputs[0].schema().clone(), inputs[1].schema().clone()])?;
        let mut inputs = inputs.into_iter();
        let (Some(mut first), Some(mut second)) = (inputs.next(), inputs.next()) else {
            return Err(OpError::Plan("concat expects two inputs".into()));
        };
        let origin = format!("{}+{}", first.origin(), second.origin());
        trace!(origin = %origin, columns = plan.output_schema.len(), "concat");

        let schema = plan.output_schema;
        let out_schema = schema.clone();
        let rows = first
            .rows()?
            .chain(second.rows()?)
            .map(move |row| row.map(|r| conform(&r, &out_schema)));
        Ok(RowStream::new(schema, rows).with_origin(origin))
    }
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

    #[test]
    fn union_schema_and_padding() {
        let a = stream(&["x", "y"], &[&["1", "2"]]);
        let b = stream(&["y", "z"], &[&["3", "4"], &["5", "6"]]);
        let mut out = a.concat(b).unwrap();
        assert_eq!(out.schema(), &Schema::new(["x", "y", "z"]));
        let rows = out.collect_rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["z"], "");
        assert_eq!(rows[1]["x"], "");
        assert_eq!(rows[1].keys().collect::<Vec<_>>(), ["x", "y", "z"]);
        assert_eq!(rows[2]["z"], "6");
    }

    #[test]
    fn consumed_input_cannot_be_concatenated() {
        let mut a = stream(&["x"], &[&["1"]]);
        a.collect_rows().unwrap();
        let b = stream(&["x"], &[]);
        let err = a.concat(b).unwrap_err();
        assert!(matches!(err, OpError::Core(Error::AlreadyConsumed)));
    }

    #[test]
    fn plan_requires_two_inputs() {
        assert!(Concat.plan(&[Schema::new(["a"])]).is_err());
    }
}
