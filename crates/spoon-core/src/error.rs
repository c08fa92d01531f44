use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Malformed file specification, column format or column type directive.
    #[error("Invalid specification: {0}")]
    Spec(String),

    #[error("Columns {} are not found in {source_name}.", format_names(.columns))]
    ColumnsNotFound {
        source_name: String,
        columns: Vec<String>,
    },

    #[error("Column {0} is not found.")]
    ColumnNotFound(String),

    /// A user formula or coercion failed on a row or a group.
    #[error("Evaluation error: {0}")]
    Eval(String),

    #[error("Row stream already consumed")]
    AlreadyConsumed,

    // The core crate does not do I/O, but higher layers map their streaming
    // read failures into this variant so they travel through row iterators.
    #[error("I/O-like error (mapped into core): {0}")]
    IoLike(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn eval(msg: impl Into<String>) -> Self {
        Error::Eval(msg.into())
    }

    pub fn spec(msg: impl Into<String>) -> Self {
        Error::Spec(msg.into())
    }

    /// Attach the source name to a single missing column, so every schema
    /// error says where the column was looked up. Other errors pass through.
    pub fn in_source(self, source_name: &str) -> Self {
        match self {
            Error::ColumnNotFound(column) => Error::ColumnsNotFound {
                source_name: source_name.to_string(),
                columns: vec![column],
            },
            other => other,
        }
    }

    /// True for the schema error family (absent columns).
    pub fn is_schema(&self) -> bool {
        matches!(self, Error::ColumnsNotFound { .. } | Error::ColumnNotFound(_))
    }
}

fn format_names(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
    format!("{{{}}}", quoted.join(", "))
}
