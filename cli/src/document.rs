//! Splitting a document into rivet strings and assembling their calc text.

use calc::{CalcError, ChartBackend, Context, convert_string};
use codespan_reporting::files::SimpleFiles;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rivet::{RivetString, StringKind};
use thiserror::Error;

static OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*([rivet])__\(\s*"""(.*)$"#).unwrap());

const CLOSE: &str = "\"\"\")";

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("{kind} string opened on line {line} is never closed")]
    Unclosed { kind: StringKind, line: usize },
}

/// One string of a document, with its title and the 1-based line of the
/// opening marker.
#[derive(Debug, Clone)]
pub struct DocumentString {
    pub string: RivetString,
    pub title: String,
    pub line: usize,
}

/// Cut `source` into strings. Lines outside a string are ignored.
pub fn split(source: &str) -> Result<Vec<DocumentString>, DocumentError> {
    let mut strings = Vec::new();
    let mut open: Option<(StringKind, String, usize, Vec<String>)> = None;

    for (i, raw) in source.lines().enumerate() {
        let line = i + 1;
        if let Some((kind, title, start, mut lines)) = open.take() {
            if raw.trim() == CLOSE {
                let name = if title.is_empty() {
                    format!("{}{}", kind.name(), strings.len() + 1)
                } else {
                    title.clone()
                };
                strings.push(DocumentString {
                    string: RivetString::new(kind, name, lines),
                    title,
                    line: start,
                });
            } else {
                lines.push(raw.to_string());
                open = Some((kind, title, start, lines));
            }
            continue;
        }

        if let Some(caps) = OPEN.captures(raw) {
            let kind = caps[1]
                .chars()
                .next()
                .and_then(StringKind::from_prefix)
                .unwrap_or(StringKind::Repo);
            let title = caps[2].trim().to_string();
            debug!("line {}: {} string '{}'", line, kind, title);
            open = Some((kind, title, line, Vec::new()));
        }
    }

    match open {
        Some((kind, _, line, _)) => Err(DocumentError::Unclosed { kind, line }),
        None => Ok(strings),
    }
}

/// Add every string's source to `files` so diagnostics can point into it.
pub fn register(files: &mut SimpleFiles<String, String>, path: &str, strings: &mut [DocumentString]) {
    for doc in strings.iter_mut() {
        let name = format!("{}:{} ({} '{}')", path, doc.line, doc.string.kind, doc.string.name);
        let id = files.add(name, doc.string.source());
        doc.string.source_id = id;
    }
}

/// A string that failed to convert.
#[derive(Debug)]
pub struct Failure {
    pub name: String,
    pub file_id: usize,
    pub error: CalcError,
}

/// The assembled calc text plus any strings that failed.
#[derive(Debug, Default)]
pub struct Assembly {
    pub text: String,
    pub failures: Vec<Failure>,
}

/// Convert `strings` in order against one context.
///
/// A titled string of any kind but repo starts the next section; its title
/// is written as `title  [S]` over a rule. Conversion stops at the first
/// failure unless `keep_going` is set.
pub fn assemble(
    strings: &[DocumentString],
    ctx: &mut Context,
    backend: &mut dyn ChartBackend,
    keep_going: bool,
) -> Assembly {
    let mut assembly = Assembly::default();
    let mut sections = 0;

    for doc in strings {
        if doc.string.kind != StringKind::Repo && !doc.title.is_empty() {
            sections += 1;
            ctx.state.begin_section(sections);
            assembly.text.push_str(&format!("{}  [{}]\n", doc.title, sections));
            assembly.text.push_str(&"=".repeat(ctx.width()));
            assembly.text.push('\n');
        }

        match convert_string(&doc.string, ctx, backend) {
            Ok(fragment) => assembly.text.push_str(&fragment.to_string()),
            Err(error) => {
                info!("string '{}' failed: {}", doc.string.name, error);
                assembly.failures.push(Failure {
                    name: doc.string.name.clone(),
                    file_id: doc.string.source_id,
                    error,
                });
                if !keep_going {
                    break;
                }
            }
        }
    }
    assembly
}
