//! Command handlers, one module per string kind.

pub mod equation;
pub mod insert;
pub mod repo;
pub mod table;
pub mod value;

use std::path::Path;

use rivet::{ParseError, RivetString, StringKind};
use rivet::block::{Block, Options};
use rivet::statement::Statement;

use crate::context::Context;
use crate::error::{CalcError, EvalError};
use crate::evaluator::{convert, evaluate};
use crate::executor::CalcFragment;
use crate::format::{ljust, number_or};
use crate::value::Value;

/// Where a statement line sits in its rivet string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    /// Byte offset of the statement text in the string's joined source.
    pub offset: usize,
    pub file_id: usize,
}

impl Location {
    /// Location of body line `index` of `block`.
    pub fn in_block(string: &RivetString, block: &Block, index: usize) -> Location {
        let line = block.line + 1 + index;
        let start = string.line_span(line).start;
        let within = match (string.lines.get(line), block.body.get(index)) {
            (Some(raw), Some(text)) => raw.find(text.as_str()).unwrap_or(0),
            _ => 0,
        };
        Location {
            line,
            offset: start + within,
            file_id: string.source_id,
        }
    }
}

/// Parse a statement line, locating parse errors in the string.
pub fn parse_statement(text: &str, at: Location) -> Result<Statement, CalcError> {
    Statement::parse(text, at.file_id).map_err(|e| CalcError::Parse(e.at_line(at.line, at.offset)))
}

/// Attach `at` to an evaluation error raised while evaluating `stmt`.
pub fn evaluation_error(error: EvalError, stmt: &Statement, at: Location) -> CalcError {
    let base = at.offset + stmt.expression_span.start;
    let span = match error.span() {
        Some(s) => base + s.start..base + s.end,
        None => at.offset + stmt.expression_span.start..at.offset + stmt.expression_span.end,
    };
    CalcError::Evaluation {
        line: at.line,
        span,
        error,
    }
}

/// Evaluate `stmt`, convert to its unit field when given, and bind the
/// target. Errors propagate; nothing is bound on failure.
pub fn assign(stmt: &Statement, at: Location, ctx: &mut Context) -> Result<Value, CalcError> {
    let mut value = evaluate(&stmt.expr, &ctx.env).map_err(|e| evaluation_error(e, stmt, at))?;
    if let Some(unit) = &stmt.unit {
        value = convert(value, unit).map_err(|e| evaluation_error(e, stmt, at))?;
    }
    ctx.env.set(&stmt.target, value.clone(), &stmt.description);
    Ok(value)
}

/// Width of the `name = value` column in value rows.
pub const VALUE_COLUMN: usize = 40;

/// `name = value` padded to [`VALUE_COLUMN`], then `| description`.
pub fn value_row(name: &str, value: &Value, description: &str, ctx: &Context) -> String {
    let text = value.format(ctx.settings.result_decimals, ctx.settings.trim);
    let assignment = format!("{} = {}", name, text);
    if description.is_empty() {
        assignment
    } else {
        format!("{} | {}", ljust(&assignment, VALUE_COLUMN), description)
    }
}

/// A width parameter given either as a bare number or as `m:W` inside an
/// option list. Returns the width and any options.
pub fn width_param(param: Option<&str>, default: usize) -> (usize, Options) {
    match param {
        Some(raw) if Options::is_option_list(raw) => {
            let options = Options::parse(raw);
            let width = number_or(options.get("m"), default);
            (width, options)
        }
        other => (number_or(other, default), Options::default()),
    }
}

/// A required block parameter is absent.
pub fn missing_param(block: &Block, what: &str, file_id: usize) -> CalcError {
    let mut err = ParseError::error(
        format!("'{}' needs {}", block.command, what),
        block.span.clone(),
        file_id,
    );
    err.line = Some(block.line);
    CalcError::Parse(err)
}

/// A command from another kind's vocabulary reached this kind's handler.
pub fn misplaced(block: &Block, kind: StringKind, file_id: usize) -> CalcError {
    CalcError::Parse(ParseError::unknown_command(
        kind,
        block.command.keyword(),
        block.line,
        block.span.clone(),
        file_id,
    ))
}

/// Fail with `FileNotFound` unless `path` exists.
pub fn require_file(path: &Path) -> Result<(), CalcError> {
    if path.exists() {
        Ok(())
    } else {
        Err(CalcError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// `Figure S.N  caption` and `path: ...` for each image of an image block.
pub fn images(
    block: &Block,
    count: usize,
    file_id: usize,
    ctx: &mut Context,
    out: &mut CalcFragment,
) -> Result<(), CalcError> {
    let scale = number_or(block.param(count), ctx.settings.scale);
    for i in 0..count {
        let Some(file) = block.param(i) else {
            return Err(missing_param(block, "an image file", file_id));
        };
        let path = ctx.folders.figure_path(file);
        require_file(&path)?;
        let n = ctx.state.next_figure();
        let caption = block.body.get(i).map(|c| c.trim()).unwrap_or("");
        out.push(format!("Figure {}  {}", ctx.state.section_label(n), caption).trim_end());
        out.push(format!("path: {}  (scale {}%)", path.display(), scale));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_rows_pad_the_assignment() {
        let ctx = Context::new();
        let row = value_row("x", &Value::Scalar(3.5), "test value", &ctx);
        assert_eq!(row, format!("x = 3.500{} | test value", " ".repeat(31)));
        assert_eq!(value_row("y", &Value::Scalar(1.0), "", &ctx), "y = 1.000");
    }

    #[test]
    fn width_params_accept_numbers_and_options() {
        assert_eq!(width_param(Some("40"), 30).0, 40);
        assert_eq!(width_param(Some("wide"), 30).0, 30);
        let (w, opts) = width_param(Some("m:25, r:1-2"), 30);
        assert_eq!(w, 25);
        assert_eq!(opts.range("r"), Some((1, 2)));
        assert_eq!(width_param(None, 30).0, 30);
    }

    #[test]
    fn block_body_locations_point_into_the_source() {
        let string = RivetString::from_text(StringKind::Value, "v", "|| values\n    a = 1\n");
        let mut block = Block::new(rivet::command::Command::Values, vec![], 0, 0..9);
        block.body.push("a = 1".into());
        let at = Location::in_block(&string, &block, 0);
        assert_eq!(at.line, 1);
        assert_eq!(&string.source()[at.offset..at.offset + 5], "a = 1");
    }
}
