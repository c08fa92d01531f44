//! Sinks that drain `RowStream`s.

pub mod csv;
