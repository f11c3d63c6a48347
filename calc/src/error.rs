use std::ops::Range;
use std::path::PathBuf;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use rivet::ParseError;

/// Failures of the expression evaluator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String, span: Range<usize> },
    #[error("unknown function: {name}")]
    UnknownFunction { name: String, span: Range<usize> },
    #[error("{function}() expects {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },
    #[error("type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },
    #[error("incompatible units: {left} and {right}")]
    IncompatibleUnits { left: String, right: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("{0}")]
    Syntax(String),
}

impl EvalError {
    /// Span of the offending identifier, relative to the evaluated text.
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            EvalError::UndefinedVariable { span, .. } | EvalError::UnknownFunction { span, .. }
                if !span.is_empty() =>
            {
                Some(span.clone())
            }
            _ => None,
        }
    }
}

/// Errors that abort the conversion of a rivet string.
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("cannot read {}: {message}", path.display())]
    FileRead { path: PathBuf, message: String },
    /// A statement failed to evaluate. `span` indexes the string's joined source.
    #[error("line {}: {error}", line + 1)]
    Evaluation {
        line: usize,
        span: Range<usize>,
        error: EvalError,
    },
    #[error("plot error: {0}")]
    Plot(String),
}

impl CalcError {
    /// Classify an I/O failure on `path`.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            CalcError::FileNotFound { path }
        } else {
            CalcError::FileRead {
                path,
                message: err.to_string(),
            }
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        match self {
            CalcError::Parse(err) => err.to_diagnostic(),
            CalcError::Evaluation { span, error, .. } => Diagnostic::error()
                .with_message(error.to_string())
                .with_labels(vec![Label::primary(file_id, span.clone())]),
            other => Diagnostic::error().with_message(other.to_string()),
        }
    }
}
