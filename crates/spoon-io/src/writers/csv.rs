//! CSV sink: header first, then every row after its column formats.

use std::io::{BufWriter, Write};
use std::path::Path;

use spoon_core::config::SpoonConfig;
use spoon_operators::{ColumnFormat, RowStream};
use tracing::{debug, trace};

use crate::buf::open_output;
use crate::error::{Error, Result};

pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    formats: Vec<ColumnFormat>,
}

impl CsvSink<BufWriter<Box<dyn Write>>> {
    /// Write to `path`, or stdout when `None`.
    pub fn create(path: Option<&Path>, config: &SpoonConfig) -> Result<Self> {
        let out = open_output(path, config.io_buffer_bytes)?;
        Ok(Self::from_writer(out, config.output_delimiter))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(writer: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(csv::QuoteStyle::Necessary)
            .double_quote(true)
            .terminator(csv::Terminator::CRLF)
            .from_writer(writer);
        Self {
            writer,
            formats: Vec::new(),
        }
    }

    /// Formats run in the given order on every row.
    pub fn with_formats(mut self, formats: Vec<ColumnFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Drain `stream` and flush. Returns the number of data rows written.
    pub fn write_stream(&mut self, stream: &mut RowStream) -> Result<u64> {
        let schema = stream.schema().clone();
        let origin = stream.origin().to_string();
        self.writer.write_record(schema.iter())?;

        let mut written = 0u64;
        for row in stream.rows()? {
            let mut row = row?;
            for format in &self.formats {
                format.apply(&mut row).map_err(|e| e.in_source(&origin))?;
            }
            self.writer.write_record(row.values())?;
            written += 1;
            if written % 100_000 == 0 {
                trace!(rows = written, "csv sink progress");
            }
        }
        self.writer.flush()?;
        debug!(rows = written, columns = %schema, "csv sink finished");
        Ok(written)
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::from(e.into_error()))
    }
}
