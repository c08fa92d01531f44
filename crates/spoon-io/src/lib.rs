#![forbid(unsafe_code)]
//! spoon-io: delimited-text sources and sinks.
//!
//! - `readers::csv::CsvSource` resolves a file specification (path or `-`,
//!   optional projection/renaming) into a lazy `RowStream`.
//! - `writers::csv::CsvSink` drains a stream to a writer, applying column
//!   formats on the way out.
//! - `buf` opens files and stdio behind bounded buffers.

pub mod buf;
pub mod error;
pub mod readers;
pub mod writers;

pub use error::{Error, Result};
pub use readers::csv::CsvSource;
pub use writers::csv::CsvSink;
