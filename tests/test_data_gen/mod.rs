//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use spoon_core::spec::FileSpec;
use spoon_core::{Row, Schema};
use spoon_io::CsvSource;
use spoon_operators::RowStream;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A fresh, empty directory under the system temp dir.
pub fn create_temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("spoon-test-{}-{nanos}-{n}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Parse CSV text with the production reader.
pub fn stream(csv: &str) -> RowStream {
    stream_with(csv, "fixture.csv", b',')
}

pub fn stream_with(csv: &str, spec: &str, delimiter: u8) -> RowStream {
    let spec = FileSpec::parse(spec).expect("file spec");
    CsvSource::from_reader(Cursor::new(csv.to_string()), &spec, delimiter).expect("read fixture")
}

pub fn rows(pairs: &[&[(&str, &str)]]) -> Vec<Row> {
    pairs
        .iter()
        .map(|r| r.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
        .collect()
}

/// One column of every row, in order.
pub fn column(rows: &[Row], name: &str) -> Vec<String> {
    rows.iter().map(|r| r.get(name).cloned().unwrap_or_default()).collect()
}

/// `n` rows of `id,group,score` with scores cycling through 0..97.
pub fn generate_scores(n: usize, groups: usize) -> RowStream {
    let schema = Schema::new(["id", "group", "score"]);
    let rows = (0..n)
        .map(|i| {
            [
                ("id".to_string(), i.to_string()),
                ("group".to_string(), format!("g{}", i % groups.max(1))),
                ("score".to_string(), ((i * 31) % 97).to_string()),
            ]
            .into_iter()
            .collect::<Row>()
        })
        .collect();
    RowStream::from_rows(schema, rows)
}

pub const GRADES: &str = "\
name,group,grade
alice,A,12
bob,A,15
carol,B,9
dave,B,17
erin,B,13
";
