//! Single-pass row streams.
//!
//! A `RowStream` owns a lazy row source plus the typed-view stages registered
//! on it. Taking its rows (plain or typed) consumes it; any further attempt
//! fails with `Error::AlreadyConsumed` instead of yielding nothing.

use std::fmt;
use std::sync::Arc;

use spoon_core::{Bindings, Coercion, Error, Evaluator, Result, Row, Schema};

use crate::aggregate::Aggregate;
use crate::concat::Concat;
use crate::join::HashJoin;
use crate::sort::Sort;
use crate::traits::{OpError, Operator};
use crate::typed::TypedView;

pub type RowIter = Box<dyn Iterator<Item = Result<Row>>>;
pub type TypedIter = Box<dyn Iterator<Item = Result<Bindings>>>;

pub struct RowStream {
    schema: Schema,
    source: Option<RowIter>,
    view: TypedView,
    origin: String,
}

impl fmt::Debug for RowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream")
            .field("origin", &self.origin)
            .field("schema", &self.schema)
            .field("consumed", &self.is_consumed())
            .field("view", &self.view)
            .finish()
    }
}

impl RowStream {
    /// Wrap a lazy row source. Every row must carry exactly `schema`'s keys,
    /// in order.
    pub fn new<I>(schema: Schema, rows: I) -> Self
    where
        I: Iterator<Item = Result<Row>> + 'static,
    {
        Self {
            schema,
            source: Some(Box::new(rows)),
            view: TypedView::default(),
            origin: "<stream>".to_string(),
        }
    }

    /// A stream over rows already in memory.
    pub fn from_rows(schema: Schema, rows: Vec<Row>) -> Self {
        Self::new(schema, rows.into_iter().map(Ok))
    }

    /// Name used in schema errors (usually the file name).
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Field names of the rows this stream yields, computed columns included.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_consumed(&self) -> bool {
        self.source.is_none()
    }

    pub fn add_type(&mut self, column: impl Into<String>, coercion: Arc<dyn Coercion>) {
        self.view.add_type(column, coercion);
    }

    /// Compute `column` on every row; a new name is appended to the schema,
    /// an existing one is replaced in place.
    pub fn add_apply(&mut self, column: impl Into<String>, evaluator: Arc<dyn Evaluator>) {
        let column = column.into();
        self.schema.push(column.clone());
        self.view.add_apply(column, evaluator);
    }

    pub fn add_filter(&mut self, evaluator: Arc<dyn Evaluator>) {
        self.view.add_filter(evaluator);
    }

    fn take_source(&mut self) -> Result<(RowIter, TypedView, String)> {
        if self.source.is_none() {
            return Err(Error::AlreadyConsumed);
        }
        self.schema
            .require(self.view.typed_columns(), &self.origin)?;
        let source = self.source.take().ok_or(Error::AlreadyConsumed)?;
        Ok((source, std::mem::take(&mut self.view), self.origin.clone()))
    }

    /// Consume the stream as untyped rows.
    pub fn rows(&mut self) -> Result<RowIter> {
        let (source, view, origin) = self.take_source()?;
        if !view.is_active() {
            return Ok(source);
        }
        Ok(Box::new(source.filter_map(move |row| {
            match row.and_then(|row| view.process(row)) {
                Ok(Some((row, _))) => Some(Ok(row)),
                Ok(None) => None,
                Err(e) => Some(Err(e.in_source(&origin))),
            }
        })))
    }

    /// Consume the stream as typed rows.
    pub fn typed_rows(&mut self) -> Result<TypedIter> {
        let (source, view, origin) = self.take_source()?;
        Ok(Box::new(source.filter_map(move |row| {
            match row.and_then(|row| view.process(row)) {
                Ok(Some((_, typed))) => Some(Ok(typed)),
                Ok(None) => None,
                Err(e) => Some(Err(e.in_source(&origin))),
            }
        })))
    }

    /// Drain every row into memory.
    pub fn collect_rows(&mut self) -> Result<Vec<Row>> {
        self.rows()?.collect()
    }

    pub fn concat(self, other: RowStream) -> std::result::Result<RowStream, OpError> {
        Concat.execute(vec![self, other])
    }

    pub fn join(self, other: RowStream, join: &HashJoin) -> std::result::Result<RowStream, OpError> {
        join.execute(vec![self, other])
    }

    pub fn aggregate(self, aggregate: &Aggregate) -> std::result::Result<RowStream, OpError> {
        aggregate.execute(vec![self])
    }

    pub fn sort(self, sort: &Sort) -> std::result::Result<RowStream, OpError> {
        sort.execute(vec![self])
    }
}
