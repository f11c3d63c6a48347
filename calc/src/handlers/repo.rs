use rivet::StringKind;
use rivet::block::Block;
use rivet::command::Command;

use crate::context::Context;
use crate::error::CalcError;
use crate::executor::CalcFragment;
use crate::grid::grid;
use crate::handlers::misplaced;
use crate::table::parse_record;
use crate::tags;

/// Filler for cells missing from short label rows.
pub const FILLER: &str = "-";

pub fn dispatch(block: &Block, file_id: usize, ctx: &mut Context, out: &mut CalcFragment) -> Result<(), CalcError> {
    match block.command {
        Command::Summary => heading("Summary", block, ctx, out),
        Command::Append => heading("Appendices", block, ctx, out),
        Command::Labels => labels(block, ctx, out),
        _ => return Err(misplaced(block, StringKind::Repo, file_id)),
    }
    Ok(())
}

fn heading(title: &str, block: &Block, ctx: &mut Context, out: &mut CalcFragment) {
    out.push(title);
    out.push("-".repeat(title.len()));
    for line in &block.body {
        out.push(tags::expand_all(line, &mut ctx.state));
    }
    out.blank();
}

/// Comma-separated label rows as a grid under `category | label | label ...`.
fn labels(block: &Block, ctx: &Context, out: &mut CalcFragment) {
    let rows: Vec<Vec<String>> = block.body.iter().map(|l| parse_record(l)).collect();
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(1).max(1);
    let headers: Vec<String> = std::iter::once("category".to_string())
        .chain((1..columns).map(|_| "label".to_string()))
        .collect();
    let padded: Vec<Vec<String>> = rows
        .into_iter()
        .map(|mut r| {
            r.resize(columns, FILLER.to_string());
            r
        })
        .collect();
    out.extend(grid(&headers, &padded, ctx.settings.table_width));
    out.blank();
}
