#![forbid(unsafe_code)]
//! spoon: relational-style operations over CSV files with headers.
//!
//! This facade re-exports the workspace crates; the `spoon` binary lives in
//! `spoon-cli`.

pub use spoon_core;
pub use spoon_exec;
pub use spoon_expr;
pub use spoon_io;
pub use spoon_operators;
