use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

use crate::StringKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A block-open line named a keyword outside the string kind's vocabulary.
    UnknownCommand { kind: StringKind, command: String },
    /// The string ended while a block was still accumulating lines.
    BlockNotClosed { command: String },
    /// Malformed expression or statement text.
    Syntax,
}

/// Parse errors with source location information.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// 0-based line index within the rivet string, when known.
    pub line: Option<usize>,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            kind: ParseErrorKind::Syntax,
            message: message.into(),
            line: None,
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    pub fn unknown_command(
        kind: StringKind,
        command: &str,
        line: usize,
        span: Range<usize>,
        file_id: usize,
    ) -> Self {
        ParseError {
            kind: ParseErrorKind::UnknownCommand {
                kind,
                command: command.to_string(),
            },
            message: format!("unknown {} command '{}'", kind, command),
            line: Some(line),
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    pub fn block_not_closed(
        command: &str,
        line: usize,
        span: Range<usize>,
        file_id: usize,
    ) -> Self {
        ParseError {
            kind: ParseErrorKind::BlockNotClosed {
                command: command.to_string(),
            },
            message: format!(
                "block '{}' opened on line {} is not closed before the end of the string",
                command,
                line + 1
            ),
            line: Some(line),
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Shift a text-relative span by `offset` bytes.
    pub fn shifted(mut self, offset: usize) -> Self {
        self.span = self.span.start + offset..self.span.end + offset;
        self
    }

    /// Attach a line index and shift a text-relative span by `offset`.
    pub fn at_line(self, line: usize, offset: usize) -> Self {
        let mut err = self.shifted(offset);
        err.line = Some(line);
        err
    }

    pub fn in_file(mut self, file_id: usize) -> Self {
        self.file_id = file_id;
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}
