use std::fs;

use log::{debug, warn};
use rivet::StringKind;
use rivet::block::Block;
use rivet::command::Command;
use rivet::parser::{parse_latex, parse_symbolic};

use crate::context::Context;
use crate::error::CalcError;
use crate::executor::CalcFragment;
use crate::format::{number_or, width, wrap};
use crate::grid::grid;
use crate::handlers::{images, misplaced, missing_param, width_param};
use crate::pretty::layout_symbolic;
use crate::table::DataTable;

pub fn dispatch(
    block: &Block,
    file_id: usize,
    ctx: &mut Context,
    out: &mut CalcFragment,
) -> Result<(), CalcError> {
    match block.command {
        Command::Tex => symbolic(block, true, ctx, out),
        Command::Sym => symbolic(block, false, ctx, out),
        Command::Table => table(block, file_id, ctx, out),
        Command::Image => images(block, 1, file_id, ctx, out),
        Command::Image2 => images(block, 2, file_id, ctx, out),
        Command::Text => text(block, file_id, ctx, out),
        _ => Err(misplaced(block, StringKind::Insert, file_id)),
    }
}

/// Pretty-print a LaTeX or plain expression, centered in the section width.
/// Text that does not parse is emitted as written.
fn symbolic(block: &Block, latex: bool, ctx: &Context, out: &mut CalcFragment) -> Result<(), CalcError> {
    let source = block.param(0).unwrap_or("");
    let parsed = if latex {
        parse_latex(source, 0)
    } else {
        parse_symbolic(source, 0)
    };
    match parsed {
        Ok(symbolic) => {
            let lines = layout_symbolic(&symbolic).render();
            let w = lines.iter().map(|l| width(l)).max().unwrap_or(0);
            let indent = " ".repeat(ctx.width().saturating_sub(w) / 2);
            for line in lines {
                out.push(format!("{}{}", indent, line));
            }
        }
        Err(err) => {
            warn!("'{}' has no symbolic form ({}); emitting it as written", source, err);
            out.push(source);
        }
    }
    out.blank();
    Ok(())
}

/// `|| table | source | width` with the title on the first body line.
fn table(block: &Block, file_id: usize, ctx: &mut Context, out: &mut CalcFragment) -> Result<(), CalcError> {
    let source = block.param(0).unwrap_or("inline");
    let (max_width, options) = width_param(block.param(1), ctx.settings.table_width);
    let title = block.body.first().map(|t| t.trim()).unwrap_or("");
    let inline = block.body.iter().skip(1).cloned().collect::<Vec<_>>().join("\n");

    let lines = if source.eq_ignore_ascii_case("inline") {
        let data = DataTable::parse_csv(&inline);
        grid(&data.headers, &data.rows, max_width)
    } else if source.to_ascii_lowercase().ends_with(".rst") {
        let path = ctx.folders.table_path(source);
        let text = fs::read_to_string(&path).map_err(|e| CalcError::from_io(&path, e))?;
        text.lines().map(str::to_string).collect()
    } else if source.to_ascii_lowercase().ends_with(".csv") {
        let data = DataTable::read_csv(&ctx.folders.table_path(source))?;
        let columns = options.indices("c");
        let data = data.slice(options.range("r"), columns.as_deref());
        grid(&data.headers, &data.rows, max_width)
    } else {
        return Err(missing_param(block, "a source of 'inline', *.csv or *.rst", file_id));
    };

    let n = ctx.state.next_table();
    out.push(format!("Table {}  {}", ctx.state.section_label(n), title).trim_end());
    out.extend(lines);
    out.blank();
    Ok(())
}

/// Word-wrap a text file and indent it to the middle of the section.
fn text(block: &Block, file_id: usize, ctx: &Context, out: &mut CalcFragment) -> Result<(), CalcError> {
    let Some(name) = block.param(0) else {
        return Err(missing_param(block, "a text file", file_id));
    };
    let path = ctx.folders.text_path(name);
    let body = fs::read_to_string(&path).map_err(|e| CalcError::from_io(&path, e))?;
    let max = number_or(block.param(1), ctx.settings.text_width);
    let indent = " ".repeat(ctx.width().saturating_sub(max) / 2);
    debug!("wrapping {} to {} columns", path.display(), max);

    let mut first = true;
    for paragraph in body.split("\n\n").filter(|p| !p.trim().is_empty()) {
        if !first {
            out.blank();
        }
        first = false;
        for line in wrap(paragraph, max) {
            out.push(format!("{}{}", indent, line));
        }
    }
    out.blank();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Folders;

    fn block(command: Command, params: &[&str], body: &[&str]) -> Block {
        let mut b = Block::new(command, params.iter().map(|p| p.to_string()).collect(), 0, 0..0);
        b.body = body.iter().map(|l| l.to_string()).collect();
        b
    }

    #[test]
    fn inline_tables_are_numbered() {
        let mut ctx = Context::new();
        let mut out = CalcFragment::new();
        let b = block(Command::Table, &["inline"], &["Loads", "case,kips", "dead,1.2"]);
        dispatch(&b, 0, &mut ctx, &mut out).unwrap();
        dispatch(&b, 0, &mut ctx, &mut out).unwrap();
        assert_eq!(out.lines()[0], "Table 1.1  Loads");
        assert_eq!(out.lines()[1], "+------+------+");
        assert!(out.lines().iter().any(|l| l == "Table 1.2  Loads"));
    }

    #[test]
    fn unparsable_symbolic_text_is_kept() {
        let mut ctx = Context::new();
        let mut out = CalcFragment::new();
        dispatch(&block(Command::Sym, &["a + * b"], &[]), 0, &mut ctx, &mut out).unwrap();
        assert_eq!(out.lines()[0], "a + * b");
    }

    #[test]
    fn text_files_wrap_and_indent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "alpha beta gamma\n\ndelta").unwrap();
        let mut ctx = Context::new().with_folders(Folders::all(dir.path()));
        ctx.state.section_width = 20;
        let mut out = CalcFragment::new();
        dispatch(&block(Command::Text, &["notes.txt", "10"], &[]), 0, &mut ctx, &mut out).unwrap();
        assert_eq!(out.lines(), &["     alpha beta", "     gamma", "", "     delta", ""]);
    }

    #[test]
    fn missing_images_fail() {
        let mut ctx = Context::new();
        let mut out = CalcFragment::new();
        let err = dispatch(&block(Command::Image, &["nope.png"], &["caption"]), 0, &mut ctx, &mut out)
            .unwrap_err();
        assert!(matches!(err, CalcError::FileNotFound { .. }));
        assert_eq!(ctx.state.figure_number, 0);
    }
}
