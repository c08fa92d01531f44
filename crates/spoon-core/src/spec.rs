//! Parsing of the textual directives given on the command line:
//! file specifications, column formats and column types.
//!
//! Only the syntax is handled here; resolving a type expression or a format
//! specifier is left to the formula and formatter layers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `filename` or `filename:col1,new=old,...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub filename: String,
    pub columns: Option<Vec<ColumnSelection>>,
}

/// One entry of a file specification column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelection {
    /// Name exposed by the stream.
    pub name: String,
    /// Name in the source header.
    pub source: String,
}

impl ColumnSelection {
    pub fn parse(entry: &str) -> Self {
        let mut parts = entry.split('=');
        let first = parts.next().unwrap_or_default();
        match parts.next() {
            Some(source) => Self {
                name: first.to_string(),
                source: source.to_string(),
            },
            None => Self {
                name: first.to_string(),
                source: first.to_string(),
            },
        }
    }
}

impl FileSpec {
    pub fn stdin() -> Self {
        Self {
            filename: "-".to_string(),
            columns: None,
        }
    }

    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || Error::spec(format!("{spec:?} can not be interpreted as FileSpec"));
        let (filename, columns) = match spec.split_once(':') {
            Some((filename, columns)) => {
                if columns.is_empty() {
                    return Err(invalid());
                }
                (filename, Some(columns))
            }
            None => (spec, None),
        };
        if filename.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            filename: filename.to_string(),
            columns: columns.map(|c| c.split(',').map(ColumnSelection::parse).collect()),
        })
    }

    pub fn is_stdin(&self) -> bool {
        self.filename == "-"
    }
}

impl std::str::FromStr for FileSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for FileSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_stdin() {
            f.write_str("<stdin>")
        } else {
            f.write_str(&self.filename)
        }
    }
}

/// Split `column:argument` where exactly one colon is allowed.
fn split_directive(directive: &str, kind: &str) -> Result<(String, String)> {
    if directive.matches(':').count() != 1 {
        return Err(Error::spec(format!("{directive:?} is not a {kind}")));
    }
    let (column, argument) = directive
        .split_once(':')
        .ok_or_else(|| Error::spec(format!("{directive:?} is not a {kind}")))?;
    Ok((column.to_string(), argument.to_string()))
}

/// `column:formatspec` as given to `--format`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColFormatDirective {
    pub column: String,
    pub format: String,
}

impl ColFormatDirective {
    pub fn parse(directive: &str) -> Result<Self> {
        let (column, format) = split_directive(directive, "col format")?;
        Ok(Self { column, format })
    }

    /// A new-column spec: `name` alone means "no format".
    pub fn parse_new_column(colspec: &str) -> Result<Self> {
        if colspec.contains(':') {
            Self::parse(colspec)
        } else {
            Ok(Self {
                column: colspec.to_string(),
                format: String::new(),
            })
        }
    }
}

/// `column:typeexpression` as given to `--type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColTypeDirective {
    pub column: String,
    pub type_expr: String,
}

impl ColTypeDirective {
    pub fn parse(directive: &str) -> Result<Self> {
        let (column, type_expr) = split_directive(directive, "col type")?;
        Ok(Self { column, type_expr })
    }
}
