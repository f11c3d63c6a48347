//! Converting one rivet string into its calc fragment.

use std::fmt;

use log::debug;
use rivet::{Item, RivetString, StringKind, scan};

use crate::context::Context;
use crate::error::CalcError;
use crate::handlers;
use crate::plot::ChartBackend;
use crate::tags;

/// Rendered output of one rivet string. Lines are only ever appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalcFragment {
    lines: Vec<String>,
}

impl CalcFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text; embedded newlines become separate lines.
    pub fn push(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.extend(text.split('\n').map(str::to_string));
        }
    }

    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.push(line);
        }
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

impl fmt::Display for CalcFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Convert a rivet string against `ctx`.
///
/// The work happens on a copy of the context, which replaces `ctx` only when
/// the whole string succeeds; a failed string leaves `ctx` as it was. Files
/// written and figures exported before the failure are not undone.
pub fn convert_string(
    string: &RivetString,
    ctx: &mut Context,
    backend: &mut dyn ChartBackend,
) -> Result<CalcFragment, CalcError> {
    if string.is_empty() {
        return Ok(CalcFragment::new());
    }
    debug!("converting {} string '{}' ({} lines)", string.kind, string.name, string.lines.len());

    let items = scan(string)?;
    let mut work = ctx.clone();
    let mut fragment = CalcFragment::new();
    for item in &items {
        dispatch(string, item, &mut work, backend, &mut fragment)?;
    }

    *ctx = work;
    Ok(fragment)
}

fn dispatch(
    string: &RivetString,
    item: &Item,
    ctx: &mut Context,
    backend: &mut dyn ChartBackend,
    out: &mut CalcFragment,
) -> Result<(), CalcError> {
    match item {
        Item::Blank => out.blank(),
        Item::Text { text, .. } => out.push(text),
        Item::Tagged { text, .. } => out.push(tags::expand_all(text, &mut ctx.state)),
        Item::Statement { text, line, offset } => {
            let at = handlers::Location {
                line: *line,
                offset: *offset,
                file_id: string.source_id,
            };
            match string.kind {
                StringKind::Value => handlers::value::line(text, at, ctx, out)?,
                StringKind::Equation => handlers::equation::statement(text, at, ctx, out)?,
                StringKind::Table => handlers::table::statement(text, at, ctx, out)?,
                // the scanner never yields statements for these kinds
                StringKind::Repo | StringKind::Insert => out.push(text),
            }
        }
        Item::Block(block) => {
            debug!("{} string: dispatching '{}'", string.kind, block.command);
            match string.kind {
                StringKind::Repo => handlers::repo::dispatch(block, string.source_id, ctx, out)?,
                StringKind::Insert => handlers::insert::dispatch(block, string.source_id, ctx, out)?,
                StringKind::Value => handlers::value::dispatch(block, string, ctx, out)?,
                StringKind::Equation => handlers::equation::dispatch(block, string.source_id, ctx, out)?,
                StringKind::Table => handlers::table::dispatch(block, string, ctx, backend, out)?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::RecordingBackend;

    #[test]
    fn fragments_split_embedded_newlines() {
        let mut f = CalcFragment::new();
        f.push("a\nb");
        f.blank();
        f.push("");
        assert_eq!(f.lines(), &["a", "b", "", ""]);
        assert_eq!(f.to_string(), "a\nb\n\n\n");
    }

    #[test]
    fn pass_through_and_blank_lines() {
        let string = RivetString::from_text(StringKind::Repo, "r", "    first\n\n    second");
        let mut ctx = Context::new();
        let out = convert_string(&string, &mut ctx, &mut RecordingBackend::new()).unwrap();
        assert_eq!(out.lines(), &["first", "", "second"]);
    }
}
