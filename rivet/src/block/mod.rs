use std::ops::Range;

use crate::command::Command;

/// A recognized command invocation: the keyword, its `|`-separated
/// parameter fields and any continuation lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub command: Command,
    /// Trimmed parameter fields after the keyword. An inline option written as
    /// `keyword:option` is stored as the first parameter.
    pub params: Vec<String>,
    /// Continuation lines (indent already stripped).
    pub body: Vec<String>,
    /// 0-based line index of the opening line.
    pub line: usize,
    /// Byte span of the opening line in the string's joined source.
    pub span: Range<usize>,
}

impl Block {
    pub fn new(command: Command, params: Vec<String>, line: usize, span: Range<usize>) -> Self {
        Block {
            command,
            params,
            body: Vec::new(),
            line,
            span,
        }
    }

    /// Parameter `index`, or `None` when absent or empty.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params
            .get(index)
            .map(|p| p.as_str())
            .filter(|p| !p.is_empty())
    }

    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }
}

/// Comma-separated `key:value` options such as `e:3, r:2, t:f`.
///
/// An entry without a colon continues the previous value, so `c:1,2` reads as
/// one option `c` with value `1,2`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    entries: Vec<(String, String)>,
}

impl Options {
    pub fn parse(text: &str) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        for part in text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once(':') {
                Some((key, value)) => {
                    entries.push((key.trim().to_ascii_lowercase(), value.trim().to_string()))
                }
                None => match entries.last_mut() {
                    Some((_, value)) => {
                        value.push(',');
                        value.push_str(part);
                    }
                    None => entries.push((String::new(), part.to_string())),
                },
            }
        }
        Options { entries }
    }

    /// True when the text looks like an option list rather than a plain value.
    pub fn is_option_list(text: &str) -> bool {
        text.contains(':')
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse option `key` as a number; `None` when missing or malformed.
    pub fn number<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Parse option `key` as a `t`/`f` flag.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)?.to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "1" => Some(true),
            "f" | "false" | "n" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    /// Parse option `key` as an inclusive `A-B` range.
    pub fn range(&self, key: &str) -> Option<(usize, usize)> {
        let (a, b) = self.get(key)?.split_once('-')?;
        Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
    }

    /// Parse option `key` as a comma list of indices.
    pub fn indices(&self, key: &str) -> Option<Vec<usize>> {
        self.get(key)?
            .split(',')
            .map(|s| s.trim().parse().ok())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_continue_across_commas() {
        let opts = Options::parse("m:40, r:1-3, c:0,2");
        assert_eq!(opts.number::<usize>("m"), Some(40));
        assert_eq!(opts.range("r"), Some((1, 3)));
        assert_eq!(opts.indices("c"), Some(vec![0, 2]));
    }

    #[test]
    fn malformed_numbers_are_none() {
        let opts = Options::parse("e:x, t:f");
        assert_eq!(opts.number::<usize>("e"), None);
        assert_eq!(opts.flag("t"), Some(false));
    }

    #[test]
    fn empty_params_are_absent() {
        let block = Block::new(
            Command::Text,
            vec!["notes.txt".into(), "".into()],
            0,
            0..0,
        );
        assert_eq!(block.param(0), Some("notes.txt"));
        assert_eq!(block.param(1), None);
    }
}
