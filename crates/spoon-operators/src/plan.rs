//! Operator planning surfaces: `Footprint` and `OpPlan`.

use serde::{Deserialize, Serialize};
use spoon_core::Schema;

/// What an operator must hold in memory before it can emit its first row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Buffering {
    /// One row at a time.
    #[default]
    Streaming,
    /// One operand is fully indexed; the other streams.
    BuildSide,
    /// The whole input is materialized.
    Full,
}

/// Coarse memory model for an operator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Footprint {
    pub buffering: Buffering,
    /// Fixed per-operator state (hash tables, key vectors), in bytes per retained row.
    pub overhead_per_row: u64,
}

impl Footprint {
    pub fn streaming() -> Self {
        Self::default()
    }

    pub fn materializes(&self) -> bool {
        self.buffering != Buffering::Streaming
    }

    /// Rough live bytes once `rows` rows of `row_bytes` each are retained.
    pub fn estimate_live(&self, rows: u64, row_bytes: u64) -> u64 {
        match self.buffering {
            Buffering::Streaming => row_bytes,
            _ => rows.saturating_mul(row_bytes.saturating_add(self.overhead_per_row)),
        }
    }
}

/// Operator plan: output schema and a cached footprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpPlan {
    pub output_schema: Schema,
    pub footprint: Footprint,
}

impl OpPlan {
    pub fn new(output_schema: Schema, footprint: Footprint) -> Self {
        Self {
            output_schema,
            footprint,
        }
    }
}
