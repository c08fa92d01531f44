//! Run configuration that the binary and the engine share.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoonConfig {
    /// Input field delimiter.
    pub delimiter: u8,

    /// Output field delimiter, independent of the input one.
    pub output_delimiter: u8,

    /// Optional seed for reproducible random sorts.
    pub seed: Option<u64>,

    /// Capacity of the buffered reader/writer around each file.
    pub io_buffer_bytes: usize,
}

impl Default for SpoonConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            output_delimiter: b',',
            seed: None,
            io_buffer_bytes: 64 * 1024,
        }
    }
}

impl SpoonConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SPOON_DELIMITER`: input delimiter
    /// - `SPOON_OUTPUT_DELIMITER`: output delimiter
    /// - `SPOON_SEED`: random sort seed
    /// - `SPOON_IO_BUFFER_BYTES`: I/O buffer capacity
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("SPOON_DELIMITER") {
            if let Ok(v) = parse_delimiter(&s) {
                cfg.delimiter = v;
            }
        }

        if let Ok(s) = std::env::var("SPOON_OUTPUT_DELIMITER") {
            if let Ok(v) = parse_delimiter(&s) {
                cfg.output_delimiter = v;
            }
        }

        if let Ok(s) = std::env::var("SPOON_SEED") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.seed = Some(v);
            }
        }

        if let Ok(s) = std::env::var("SPOON_IO_BUFFER_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                if v > 0 {
                    cfg.io_buffer_bytes = v;
                }
            }
        }

        cfg
    }
}

/// Parse a single-byte delimiter. Accepts the literal byte, `\t` (typed
/// with or without shell escaping) and `tab`.
pub fn parse_delimiter(s: &str) -> Result<u8> {
    match s {
        "\\t" | "\\\\t" | "tab" => return Ok(b'\t'),
        _ => {}
    }
    match s.as_bytes() {
        [b] => Ok(*b),
        _ => Err(Error::Config(format!(
            "delimiter must be a single byte, got {s:?}"
        ))),
    }
}
