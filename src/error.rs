use thiserror::Error;

use crate::parse::ParseError;
use crate::types::{CompileError, EvalError};

/// Unified error type for the crate's fallible entry points.
#[derive(Debug, Error)]
pub enum ConfrontError {
    /// DSL text could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The rule set is structurally invalid.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A dataset failed its shape check before evaluation began.
    #[error("dataset '{dataset}': {source}")]
    Data {
        dataset: String,
        source: EvalError,
    },

    /// A rule failed to evaluate and the `raise` policy escalates errors.
    #[error("rule '{rule}' failed to evaluate: {source}")]
    Evaluation { rule: String, source: EvalError },

    /// A rule produced a warning and the `raise` policy escalates
    /// warnings.
    #[error("rule '{rule}': {message}")]
    Warning { rule: String, message: String },

    /// Reading a DSL file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
