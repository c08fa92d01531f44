//! Hash join: the right operand is indexed by its common-column tuple, the
//! left operand streams through the index.
//!
//! Right-outer completion runs after the left side is exhausted and emits
//! the never-matched groups in index insertion order.

use std::collections::VecDeque;

use indexmap::IndexMap;
use spoon_core::{Result as CoreResult, Row, Schema};
use tracing::debug;

use crate::plan::{Buffering, Footprint, OpPlan};
use crate::stream::{RowIter, RowStream};
use crate::traits::{expect_inputs, OpError, Operator};

type JoinIndex = IndexMap<Vec<String>, Vec<Row>>;

#[derive(Debug, Default, Clone)]
pub struct HashJoin {
    /// Keep unmatched left rows, padded with empty right-only columns.
    pub left_outer: bool,
    /// Emit unmatched right rows, padded with empty left-only columns.
    pub right_outer: bool,
    /// Let an all-empty key tuple match like any other value.
    pub empty_as_value: bool,
}

impl HashJoin {
    pub fn inner() -> Self {
        Self::default()
    }

    pub fn full_outer() -> Self {
        Self {
            left_outer: true,
            right_outer: true,
            empty_as_value: false,
        }
    }

    fn build_index(&self, right: &mut RowStream, common: &[String]) -> CoreResult<JoinIndex> {
        let mut index = JoinIndex::new();
        for row in right.rows()? {
            let row = row?;
            let key = key_of(&row, common);
            if !self.empty_as_value && key.iter().all(String::is_empty) {
                continue;
            }
            index.entry(key).or_default().push(row);
        }
        Ok(index)
    }
}

fn key_of(row: &Row, common: &[String]) -> Vec<String> {
    common
        .iter()
        .map(|c| row.get(c).cloned().unwrap_or_default())
        .collect()
}

impl Operator for HashJoin {
    fn name(&self) -> &'static str {
        "hash_join"
    }

    fn memory_need(&self) -> Footprint {
        Footprint {
            buffering: Buffering::BuildSide,
            overhead_per_row: 64,
        }
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        expect_inputs(self.name(), input_schemas.len(), 2)?;
        let out = input_schemas[0].union(&input_schemas[1]);
        Ok(OpPlan::new(out, self.memory_need()))
    }

    fn execute(&self, inputs: Vec<RowStream>) -> Result<RowStream, OpError> {
        expect_inputs(self.name(), inputs.len(), 2)?;
        let mut inputs = inputs.into_iter();
        let (Some(mut left), Some(mut right)) = (inputs.next(), inputs.next()) else {
            return Err(OpError::Plan("hash join expects two inputs".into()));
        };
        let plan = self.plan(&[left.schema().clone(), right.schema().clone()])?;
        let common = left.schema().common(right.schema());
        let origin = format!("{} join {}", left.origin(), right.origin());

        let probe = left.rows()?;
        let index = self.build_index(&mut right, &common)?;
        debug!(
            origin = %origin,
            common = ?common,
            groups = index.len(),
            "join index built"
        );

        let rows = JoinRows {
            probe,
            matched: vec![false; index.len()],
            index,
            common,
            schema: plan.output_schema.clone(),
            left_outer: self.left_outer,
            right_outer: self.right_outer,
            pending: VecDeque::new(),
            probe_done: false,
            next_group: 0,
        };
        Ok(RowStream::new(plan.output_schema, rows).with_origin(origin))
    }
}

struct JoinRows {
    probe: RowIter,
    index: JoinIndex,
    matched: Vec<bool>,
    common: Vec<String>,
    schema: Schema,
    left_outer: bool,
    right_outer: bool,
    pending: VecDeque<Row>,
    probe_done: bool,
    next_group: usize,
}

impl JoinRows {
    /// Output row: `primary` wins where both sides have the column.
    fn merge(&self, primary: &Row, secondary: Option<&Row>) -> Row {
        self.schema
            .iter()
            .map(|c| {
                let v = primary
                    .get(c)
                    .or_else(|| secondary.and_then(|r| r.get(c)))
                    .cloned()
                    .unwrap_or_default();
                (c.to_string(), v)
            })
            .collect()
    }

    fn probe_row(&mut self, left: Row) {
        let key = key_of(&left, &self.common);
        match self.index.get_index_of(&key) {
            Some(g) => {
                self.matched[g] = true;
                let out: Vec<Row> = self.index[g]
                    .iter()
                    .map(|right| self.merge(&left, Some(right)))
                    .collect();
                self.pending.extend(out);
            }
            None if self.left_outer => {
                let row = self.merge(&left, None);
                self.pending.push_back(row);
            }
            None => {}
        }
    }

    /// Queue the next never-matched group; false once all groups are seen.
    fn queue_unmatched(&mut self) -> bool {
        while self.next_group < self.index.len() {
            let g = self.next_group;
            self.next_group += 1;
            if !self.matched[g] {
                let out: Vec<Row> = self.index[g]
                    .iter()
                    .map(|right| self.merge(right, None))
                    .collect();
                self.pending.extend(out);
                return true;
            }
        }
        false
    }
}

impl Iterator for JoinRows {
    type Item = CoreResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(Ok(row));
            }
            if !self.probe_done {
                match self.probe.next() {
                    Some(Ok(row)) => self.probe_row(row),
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.probe_done = true,
                }
                continue;
            }
            if !self.right_outer || !self.queue_unmatched() {
                return None;
            }
        }
    }
}
