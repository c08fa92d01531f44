//! Operator trait + common interfaces.
//!
//! The engine calls `plan(...)` to validate column references and obtain the
//! output schema, then `execute(...)` to wire the operator into the stream.

use spoon_core::Schema;
use thiserror::Error;

use crate::plan::{Footprint, OpPlan};
use crate::stream::RowStream;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("planning error: {0}")]
    Plan(String),

    #[error(transparent)]
    Core(#[from] spoon_core::Error),
}

impl OpError {
    /// Name `origin` in a missing-column error raised against its schema.
    pub fn in_source(self, origin: &str) -> Self {
        match self {
            OpError::Core(e) => OpError::Core(e.in_source(origin)),
            other => other,
        }
    }
}

impl From<OpError> for spoon_core::Error {
    fn from(e: OpError) -> Self {
        match e {
            OpError::Core(inner) => inner,
            OpError::Plan(msg) => spoon_core::Error::Spec(msg),
        }
    }
}

/// Trait that all operators implement.
///
/// Invariants:
/// - `plan` never touches rows; it only checks schemas.
/// - `execute` consumes its inputs. Streaming operators return immediately;
///   materializing ones may read their inputs before returning.
pub trait Operator {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    fn memory_need(&self) -> Footprint;

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError>;

    fn execute(&self, inputs: Vec<RowStream>) -> Result<RowStream, OpError>;
}

/// Check the operand count shared by `plan` and `execute`.
pub(crate) fn expect_inputs(name: &str, got: usize, want: usize) -> Result<(), OpError> {
    if got != want {
        return Err(OpError::Plan(format!(
            "{name} expects {want} input(s), got {got}"
        )));
    }
    Ok(())
}

/// First key missing from `schema`, as a schema error.
pub(crate) fn require_columns(schema: &Schema, keys: &[String]) -> Result<(), OpError> {
    match keys.iter().find(|k| !schema.contains(k)) {
        Some(missing) => Err(spoon_core::Error::ColumnNotFound(missing.clone()).into()),
        None => Ok(()),
    }
}
