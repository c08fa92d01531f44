//! Bounded buffered access to files and stdio.
//!
//! `-` names stdin on input and stdout on output. Every handle is wrapped in
//! a buffer of fixed capacity taken from `SpoonConfig::io_buffer_bytes`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A thin wrapper over `BufReader` with a fixed capacity to bound in-flight bytes.
pub struct BoundedBufReader<R: Read> {
    inner: BufReader<R>,
}

impl<R: Read> BoundedBufReader<R> {
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity.max(1), reader),
        }
    }
}

impl<R: Read> Read for BoundedBufReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> BufRead for BoundedBufReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }
    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

pub type Input = BoundedBufReader<Box<dyn Read>>;

/// Open `path` for reading, or stdin for `-`.
pub fn open_input(path: &str, cap: usize) -> io::Result<Input> {
    let inner: Box<dyn Read> = if path == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(Path::new(path))?)
    };
    Ok(BoundedBufReader::with_capacity(cap, inner))
}

/// Create `path` for writing, or use stdout when absent or `-`.
pub fn open_output(path: Option<&Path>, cap: usize) -> io::Result<BufWriter<Box<dyn Write>>> {
    let inner: Box<dyn Write> = match path {
        Some(p) if p != Path::new("-") => Box::new(File::create(p)?),
        _ => Box::new(io::stdout()),
    };
    Ok(BufWriter::with_capacity(cap.max(1), inner))
}
