//! Convenient re-exports for downstream crates.

pub use crate::config::SpoonConfig;
pub use crate::error::{Error, Result};
pub use crate::row::{Bindings, Row};
pub use crate::schema::Schema;
pub use crate::spec::{ColFormatDirective, ColTypeDirective, ColumnSelection, FileSpec};
pub use crate::traits::{Coercion, Evaluator};
pub use crate::value::Value;
