//! Sources that turn delimited text into lazy `RowStream`s.

pub mod csv;
