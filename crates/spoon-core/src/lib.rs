#![forbid(unsafe_code)]
//! spoon-core: the shared data model of the spoon row engine.
//!
//! - `Row`/`Bindings`: untyped rows and their typed view.
//! - `Schema`: ordered field-name lists.
//! - `Value`: tagged union of coerced values with Python-like rendering.
//! - `Evaluator`/`Coercion`: the only seams the operators know about formulas.
//! - `spec`: parsing of file/format/type directives.
//!
//! No I/O and no formula engine live here.

pub mod config;
pub mod error;
pub mod prelude;
pub mod row;
pub mod schema;
pub mod spec;
pub mod traits;
pub mod value;

pub use error::{Error, Result};
pub use row::{Bindings, Row};
pub use schema::Schema;
pub use traits::{Coercion, Evaluator};
pub use value::Value;
