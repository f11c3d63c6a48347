pub mod block;
pub mod command;
pub mod expr;
pub mod parser;
pub mod scanner;
pub mod statement;

use std::fmt;
use std::ops::Range;

pub use parser::{ParseError, ParseErrorKind};
pub use scanner::{Item, scan};

/// The five kinds of rivet string. Each kind has its own command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    Repo,
    Insert,
    Value,
    Equation,
    Table,
}

impl StringKind {
    pub fn name(&self) -> &'static str {
        match self {
            StringKind::Repo => "repo",
            StringKind::Insert => "insert",
            StringKind::Value => "value",
            StringKind::Equation => "equation",
            StringKind::Table => "table",
        }
    }

    /// Map the single-letter document prefix (`r__`, `i__`, ...) to a kind.
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'r' => Some(StringKind::Repo),
            'i' => Some(StringKind::Insert),
            'v' => Some(StringKind::Value),
            'e' => Some(StringKind::Equation),
            't' => Some(StringKind::Table),
            _ => None,
        }
    }

    /// Whether bare `name = expression` lines are statements in this kind.
    pub fn accepts_statements(&self) -> bool {
        matches!(
            self,
            StringKind::Value | StringKind::Equation | StringKind::Table
        )
    }
}

impl fmt::Display for StringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed, ordered sequence of raw markup lines.
/// This is the unit of input to the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct RivetString {
    pub kind: StringKind,
    pub name: String,
    pub lines: Vec<String>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl RivetString {
    pub fn new(kind: StringKind, name: impl Into<String>, lines: Vec<String>) -> Self {
        RivetString {
            kind,
            name: name.into(),
            lines,
            source_id: 0,
        }
    }

    pub fn from_text(kind: StringKind, name: impl Into<String>, text: &str) -> Self {
        Self::new(kind, name, text.lines().map(str::to_string).collect())
    }

    pub fn with_source_id(mut self, source_id: usize) -> Self {
        self.source_id = source_id;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The lines joined with newlines; spans in errors index into this text.
    pub fn source(&self) -> String {
        self.lines.join("\n")
    }

    /// Byte span of line `index` within [`RivetString::source`].
    pub fn line_span(&self, index: usize) -> Range<usize> {
        let start: usize = self.lines.iter().take(index).map(|l| l.len() + 1).sum();
        let len = self.lines.get(index).map(|l| l.len()).unwrap_or(0);
        start..start + len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_spans_index_joined_source() {
        let s = RivetString::from_text(StringKind::Repo, "r", "ab\ncde\n\nf");
        let source = s.source();
        assert_eq!(&source[s.line_span(1)], "cde");
        assert_eq!(&source[s.line_span(3)], "f");
        assert_eq!(s.line_span(2), 7..7);
    }

    #[test]
    fn prefixes_map_to_kinds() {
        assert_eq!(StringKind::from_prefix('e'), Some(StringKind::Equation));
        assert_eq!(StringKind::from_prefix('x'), None);
        assert!(!StringKind::Insert.accepts_statements());
    }
}
