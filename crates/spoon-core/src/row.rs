//! Untyped rows and their transient typed counterpart.

use indexmap::IndexMap;

use crate::schema::Schema;
use crate::value::Value;

/// Ordered column → raw field mapping. Key order always equals the owning
/// stream's schema order.
pub type Row = IndexMap<String, String>;

/// Ordered column → typed value mapping seen by formulas: a typed row
/// during apply/filter, a per-column value list during aggregation.
pub type Bindings = IndexMap<String, Value>;

/// Build a row from a schema and positional fields, padding short input with
/// empty strings.
pub fn row_from_fields<'a, I>(schema: &Schema, fields: I) -> Row
where
    I: IntoIterator<Item = &'a str>,
{
    let mut fields = fields.into_iter();
    schema
        .iter()
        .map(|name| {
            let value = fields.next().unwrap_or("");
            (name.to_string(), value.to_string())
        })
        .collect()
}

/// Reorder/complete `row` so its keys are exactly `schema`, filling gaps
/// with empty strings.
pub fn conform(row: &Row, schema: &Schema) -> Row {
    schema
        .iter()
        .map(|name| {
            let value = row.get(name).cloned().unwrap_or_default();
            (name.to_string(), value)
        })
        .collect()
}
