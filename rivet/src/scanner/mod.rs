//! The line scanner: turns the raw lines of a rivet string into a sequence of
//! classified items.
//!
//! Scanning is an explicit state machine over three states. Every retained
//! line becomes one event (`BlankLine`, `BlockMarker` or `Line`); fixed-length
//! blocks additionally fire `FixedCountReached` once their last line arrives.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::Block;
use crate::command::{BlockShape, Command};
use crate::parser::error::ParseError;
use crate::statement;
use crate::{RivetString, StringKind};

/// Number of leading spaces stripped from every line.
pub const INDENT: usize = 4;
/// Lines starting with this marker are dropped before anything else.
pub const REVIEW_MARKER: &str = "##";
pub const BLOCK_MARKER: &str = "||";
pub const FIELD_SEPARATOR: char = '|';
pub const COMMENT_MARKER: char = '#';
pub const PREFORMAT_MARKER: &str = "::";

/// An inline `[...]_` tag.
pub static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]_").unwrap());

/// A classified unit of scanner output.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A blank line outside any block.
    Blank,
    /// Pass-through text.
    Text { text: String, line: usize },
    /// Text containing at least one inline tag.
    Tagged { text: String, line: usize },
    /// A statement line (`name = expression | ...`, or a lookup/reprint line
    /// in value strings). `offset` is the byte offset of `text` in the
    /// string's joined source.
    Statement {
        text: String,
        line: usize,
        offset: usize,
    },
    /// A complete command block.
    Block(Block),
}

#[derive(Debug)]
enum ScanState {
    Idle,
    AccumulatingBlock(Block),
    AccumulatingFixedBlock { block: Block, required: usize },
}

#[derive(Debug)]
enum Event {
    BlankLine,
    BlockMarker(Block),
    Line { text: String, line: usize, offset: usize },
    FixedCountReached,
}

struct Scanner<'a> {
    string: &'a RivetString,
    state: ScanState,
    items: Vec<Item>,
}

/// Scan a rivet string into items.
pub fn scan(string: &RivetString) -> Result<Vec<Item>, ParseError> {
    let mut scanner = Scanner {
        string,
        state: ScanState::Idle,
        items: Vec::new(),
    };

    for (index, raw) in string.lines.iter().enumerate() {
        if raw.trim_start().starts_with(REVIEW_MARKER) {
            continue;
        }
        let text = strip_indent(raw);
        let offset = string.line_span(index).start + (raw.len() - text.len());

        let event = if text.trim().is_empty() {
            Event::BlankLine
        } else if text.starts_with(BLOCK_MARKER) && matches!(scanner.state, ScanState::Idle) {
            Event::BlockMarker(scanner.open_block(text, index)?)
        } else {
            Event::Line {
                text: text.to_string(),
                line: index,
                offset,
            }
        };
        scanner.handle(event)?;
    }

    scanner.finish()
}

/// Remove up to [`INDENT`] leading spaces.
fn strip_indent(line: &str) -> &str {
    let spaces = line.bytes().take(INDENT).take_while(|b| *b == b' ').count();
    &line[spaces..]
}

impl Scanner<'_> {
    fn handle(&mut self, event: Event) -> Result<(), ParseError> {
        let state = std::mem::replace(&mut self.state, ScanState::Idle);
        let next = match (state, event) {
            (ScanState::Idle, Event::BlankLine) => {
                self.items.push(Item::Blank);
                ScanState::Idle
            }
            (ScanState::Idle, Event::BlockMarker(block)) => {
                debug!("{} string: '{}' opened on line {}", self.string.kind, block.command, block.line + 1);
                match block.command.shape() {
                    BlockShape::Single => {
                        self.items.push(Item::Block(block));
                        ScanState::Idle
                    }
                    BlockShape::UntilBlank => ScanState::AccumulatingBlock(block),
                    BlockShape::Fixed(required) => {
                        ScanState::AccumulatingFixedBlock { block, required }
                    }
                }
            }
            (ScanState::Idle, Event::Line { text, line, offset }) => {
                if let Some(item) = self.classify(text, line, offset) {
                    self.items.push(item);
                }
                ScanState::Idle
            }

            (ScanState::AccumulatingBlock(block), Event::BlankLine) => {
                debug!("{} string: '{}' closed by blank line", self.string.kind, block.command);
                self.items.push(Item::Block(block));
                ScanState::Idle
            }
            (ScanState::AccumulatingBlock(mut block), Event::Line { text, .. }) => {
                block.body.push(text);
                ScanState::AccumulatingBlock(block)
            }

            // Blank lines inside a fixed block are skipped
            (state @ ScanState::AccumulatingFixedBlock { .. }, Event::BlankLine) => state,
            (ScanState::AccumulatingFixedBlock { mut block, required }, Event::Line { text, .. }) => {
                block.body.push(text);
                let reached = block.body.len() >= required;
                self.state = ScanState::AccumulatingFixedBlock { block, required };
                return if reached {
                    self.handle(Event::FixedCountReached)
                } else {
                    Ok(())
                };
            }
            (ScanState::AccumulatingFixedBlock { block, .. }, Event::FixedCountReached) => {
                debug!("{} string: '{}' reached its line count", self.string.kind, block.command);
                self.items.push(Item::Block(block));
                ScanState::Idle
            }

            (state, event) => {
                return Err(ParseError::error(
                    format!("scanner cannot handle {:?} in state {:?}", event, state),
                    0..0,
                    self.string.source_id,
                ));
            }
        };
        self.state = next;
        Ok(())
    }

    /// Parse a block-open line into a block. Fails with UnknownCommand when
    /// the keyword is outside the string kind's vocabulary.
    fn open_block(&self, text: &str, line: usize) -> Result<Block, ParseError> {
        let span = self.string.line_span(line);
        let mut fields = text[BLOCK_MARKER.len()..]
            .split(FIELD_SEPARATOR)
            .map(|f| f.trim().to_string());
        let head = fields.next().unwrap_or_default();
        let (keyword, option) = match head.split_once(':') {
            Some((k, o)) => (k.trim().to_string(), Some(o.trim().to_string())),
            None => (head.clone(), None),
        };

        let Some(command) = Command::lookup(self.string.kind, &keyword) else {
            return Err(ParseError::unknown_command(
                self.string.kind,
                &keyword,
                line,
                span,
                self.string.source_id,
            )
            .with_note(format!("line: {}", text.trim())));
        };

        let params: Vec<String> = option.into_iter().chain(fields).collect();
        Ok(Block::new(command, params, line, span))
    }

    /// Classify a line outside any block.
    fn classify(&self, text: String, line: usize, offset: usize) -> Option<Item> {
        if text.starts_with(COMMENT_MARKER) || text.starts_with(PREFORMAT_MARKER) {
            return None;
        }
        if TAG.is_match(&text) {
            return Some(Item::Tagged { text, line });
        }
        let kind = self.string.kind;
        let is_statement = kind.accepts_statements()
            && if kind == StringKind::Value {
                statement::is_value_line(&text)
            } else {
                statement::is_assignment(&text)
            };
        if is_statement {
            Some(Item::Statement { text, line, offset })
        } else {
            Some(Item::Text { text, line })
        }
    }

    fn finish(self) -> Result<Vec<Item>, ParseError> {
        match self.state {
            ScanState::Idle => Ok(self.items),
            ScanState::AccumulatingBlock(block)
            | ScanState::AccumulatingFixedBlock { block, .. } => {
                Err(ParseError::block_not_closed(
                    block.command.keyword(),
                    block.line,
                    block.span.clone(),
                    self.string.source_id,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseErrorKind;

    fn scan_text(kind: StringKind, text: &str) -> Result<Vec<Item>, ParseError> {
        scan(&RivetString::from_text(kind, "test", text))
    }

    #[test]
    fn review_comments_and_comments_are_dropped() {
        let items = scan_text(
            StringKind::Repo,
            "## reviewer note\n    # comment\n    :: preformat\n    kept",
        )
        .unwrap();
        assert_eq!(
            items,
            vec![Item::Text { text: "kept".into(), line: 3 }]
        );
    }

    #[test]
    fn indent_is_stripped_once() {
        let items = scan_text(StringKind::Repo, "        deep").unwrap();
        assert_eq!(items, vec![Item::Text { text: "    deep".into(), line: 0 }]);
    }

    #[test]
    fn blank_lines_pass_through_when_idle() {
        let items = scan_text(StringKind::Repo, "a\n\nb").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], Item::Blank);
    }

    #[test]
    fn until_blank_block_accumulates_body() {
        let items = scan_text(
            StringKind::Repo,
            "|| summary\nfirst line\nsecond line\n\nafter",
        )
        .unwrap();
        let Item::Block(block) = &items[0] else {
            panic!("expected block");
        };
        assert_eq!(block.command, Command::Summary);
        assert_eq!(block.body, vec!["first line", "second line"]);
        assert_eq!(items[1], Item::Text { text: "after".into(), line: 4 });
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn fixed_block_closes_without_blank_line() {
        let items = scan_text(
            StringKind::Insert,
            "|| image | beam.png | 50\n\nElevation of beam\nnext text",
        )
        .unwrap();
        let Item::Block(block) = &items[0] else {
            panic!("expected block");
        };
        assert_eq!(block.params, vec!["beam.png", "50"]);
        assert_eq!(block.body, vec!["Elevation of beam"]);
        assert_eq!(items[1], Item::Text { text: "next text".into(), line: 3 });
    }

    #[test]
    fn single_line_command_dispatches_immediately() {
        let items = scan_text(StringKind::Equation, "|| format | e:2, r:4\nx = 1").unwrap();
        assert!(matches!(&items[0], Item::Block(b) if b.command == Command::Format));
        assert!(matches!(&items[1], Item::Statement { line: 1, .. }));
    }

    #[test]
    fn keyword_option_becomes_first_param() {
        let items = scan_text(StringKind::Table, "|| data:beams | w, d").unwrap();
        let Item::Block(block) = &items[0] else {
            panic!("expected block");
        };
        assert_eq!(block.command, Command::Data);
        assert_eq!(block.params, vec!["beams", "w, d"]);
    }

    #[test]
    fn unknown_command_names_kind_and_keyword() {
        let err = scan_text(StringKind::Repo, "text\n|| plot | x").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownCommand {
                kind: StringKind::Repo,
                command: "plot".into()
            }
        );
        assert_eq!(err.line, Some(1));
        assert_eq!(err.span, 5..16);
    }

    #[test]
    fn open_block_at_end_is_an_error() {
        let err = scan_text(StringKind::Repo, "|| summary\nbody").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::BlockNotClosed { command: "summary".into() }
        );
        let err = scan_text(StringKind::Insert, "|| image2 | a.png | b.png\nonly one").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::BlockNotClosed { .. }));
    }

    #[test]
    fn tags_and_statements_are_classified() {
        let items = scan_text(
            StringKind::Value,
            "see note [#]_\nx = 3.5 | test value\nspan: | again\nGeometry:",
        )
        .unwrap();
        assert!(matches!(items[0], Item::Tagged { .. }));
        assert!(matches!(items[1], Item::Statement { offset: 14, .. }));
        assert!(matches!(items[2], Item::Statement { .. }));
        assert!(matches!(items[3], Item::Text { .. }));
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn statements_are_text_in_repo_strings() {
        let items = scan_text(StringKind::Repo, "x = 1").unwrap();
        assert!(matches!(items[0], Item::Text { .. }));
    }

    #[test]
    fn empty_string_scans_to_nothing() {
        assert!(scan_text(StringKind::Equation, "").unwrap().is_empty());
    }
}
