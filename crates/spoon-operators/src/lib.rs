#![forbid(unsafe_code)]
//! spoon-operators: single-pass row streams and the operators over them.
//!
//! Design intent:
//! - Everything is pull-based and synchronous; consumption drives production.
//! - A `RowStream` can be consumed exactly once; a second attempt is an error.
//! - Streaming stages (typed view, concat, the probe side of a join) hold one
//!   row at a time. Join's build side, aggregate and sort materialize, and say
//!   so through their `Footprint`.

pub mod plan;
pub mod traits;

pub mod stream;
pub mod typed;

pub mod aggregate;
pub mod concat;
pub mod format;
pub mod join;
pub mod sort;

pub use aggregate::Aggregate;
pub use concat::Concat;
pub use format::{ColumnFormat, FormatSpec};
pub use join::{join_all, HashJoin};
pub use plan::{Buffering, Footprint, OpPlan};
pub use sort::Sort;
pub use stream::{RowIter, RowStream, TypedIter};
pub use traits::{OpError, Operator};
pub use typed::TypedView;
