use thiserror::Error;

/// Result of compiling formulas, preambles and type expressions.
pub type Result<T> = std::result::Result<T, ExprError>;

/// Compile-time failures. Failures while evaluating a row are reported as
/// `spoon_core::Error::Eval` instead.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("syntax error in {source_text:?} at offset {pos}: {message}")]
    Syntax {
        source_text: String,
        pos: usize,
        message: String,
    },

    #[error("no module named '{0}'")]
    UnknownModule(String),

    #[error("type '{0}' is not defined")]
    UnknownType(String),

    #[error("invalid preamble statement {statement:?}: {message}")]
    Preamble { statement: String, message: String },
}

impl From<ExprError> for spoon_core::Error {
    fn from(e: ExprError) -> Self {
        spoon_core::Error::Spec(e.to_string())
    }
}
