//! CSV source: header row, then one row per record.
//!
//! Records are read lazily. Short records are padded with empty fields and
//! extra trailing fields are dropped, so every row carries exactly the
//! stream's schema.

use std::io::Read;

use spoon_core::config::SpoonConfig;
use spoon_core::spec::FileSpec;
use spoon_core::{Error as CoreError, Row, Schema};
use spoon_operators::RowStream;
use tracing::debug;

use crate::buf::open_input;
use crate::error::Result;

/// A file specification bound to the reader settings of a run.
#[derive(Debug, Clone)]
pub struct CsvSource {
    spec: FileSpec,
    delimiter: u8,
    buffer_bytes: usize,
}

impl CsvSource {
    pub fn new(spec: FileSpec, config: &SpoonConfig) -> Self {
        Self {
            spec,
            delimiter: config.delimiter,
            buffer_bytes: config.io_buffer_bytes,
        }
    }

    pub fn spec(&self) -> &FileSpec {
        &self.spec
    }

    /// Open the file (or stdin) and read its header.
    pub fn open(&self) -> Result<RowStream> {
        let input = open_input(&self.spec.filename, self.buffer_bytes)?;
        Self::from_reader(input, &self.spec, self.delimiter)
    }

    /// Build a stream over any reader; `spec` supplies the projection and
    /// the name used in errors.
    pub fn from_reader<R: Read + 'static>(
        reader: R,
        spec: &FileSpec,
        delimiter: u8,
    ) -> Result<RowStream> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let header_schema = Schema::new(headers.iter().map(String::as_str));
        let origin = spec.to_string();

        // (exposed name, record position); a repeated header name reads its last field
        let last_index = |source: &str| headers.iter().rposition(|h| h == source);
        let mut schema = Schema::default();
        let mut columns: Vec<(String, usize)> = Vec::new();
        match &spec.columns {
            Some(selection) => {
                header_schema.require(selection.iter().map(|c| c.source.as_str()), &origin)?;
                for column in selection {
                    if let Some(idx) = last_index(&column.source) {
                        if schema.push(column.name.clone()) {
                            columns.push((column.name.clone(), idx));
                        }
                    }
                }
            }
            None => {
                for name in header_schema.iter() {
                    if let Some(idx) = last_index(name) {
                        schema.push(name);
                        columns.push((name.to_string(), idx));
                    }
                }
            }
        }
        debug!(source = %origin, columns = %schema, "opened csv source");

        let rows = rdr.into_records().map(move |record| -> spoon_core::Result<Row> {
            let record = record.map_err(|e| CoreError::IoLike(e.to_string()))?;
            Ok(columns
                .iter()
                .map(|(name, idx)| (name.clone(), record.get(*idx).unwrap_or("").to_string()))
                .collect::<Row>())
        });
        Ok(RowStream::new(schema, rows).with_origin(origin))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::Error;

    fn read(data: &str, spec: &str) -> Result<RowStream> {
        let spec = FileSpec::parse(spec).unwrap();
        CsvSource::from_reader(Cursor::new(data.to_string()), &spec, b',')
    }

    #[test]
    fn reads_header_and_rows() {
        let mut s = read("a,b\n1,2\n3,4\n", "data.csv").unwrap();
        assert_eq!(s.schema().names, vec!["a", "b"]);
        assert_eq!(s.origin(), "data.csv");
        let rows = s.collect_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["b"], "4");
    }

    #[test]
    fn ragged_records_conform_to_header() {
        let rows = read("a,b,c\n1\n1,2,3,4\n", "f").unwrap().collect_rows().unwrap();
        assert_eq!(rows[0]["b"], "");
        assert_eq!(rows[0]["c"], "");
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[1]["c"], "3");
    }

    #[test]
    fn quoted_fields_keep_delimiters_and_newlines() {
        let rows = read("a,b\n\"x,y\",\"line\nbreak\"\n", "f")
            .unwrap()
            .collect_rows()
            .unwrap();
        assert_eq!(rows[0]["a"], "x,y");
        assert_eq!(rows[0]["b"], "line\nbreak");
    }

    #[test]
    fn projection_reorders_and_renames() {
        let mut s = read("a,b,c\n1,2,3\n", "f:c,x=a").unwrap();
        assert_eq!(s.schema().names, vec!["c", "x"]);
        let rows = s.collect_rows().unwrap();
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), ["c", "x"]);
        assert_eq!(rows[0].values().collect::<Vec<_>>(), ["3", "1"]);
    }

    #[test]
    fn every_missing_column_is_reported() {
        let err = read("a,b\n1,2\n", "in.csv:z,a,y=q").unwrap_err();
        match err {
            Error::Core(CoreError::ColumnsNotFound { source_name, columns }) => {
                assert_eq!(source_name, "in.csv");
                assert_eq!(columns, vec!["q", "z"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_delimiters() {
        let spec = FileSpec::parse("f").unwrap();
        let mut s = CsvSource::from_reader(Cursor::new("a;b\n1;2\n"), &spec, b';').unwrap();
        assert_eq!(s.collect_rows().unwrap()[0]["b"], "2");
    }
}
