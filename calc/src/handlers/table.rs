use std::path::Path;

use log::debug;
use rivet::block::{Block, Options};
use rivet::command::Command;
use rivet::{RivetString, StringKind};

use crate::context::Context;
use crate::error::CalcError;
use crate::executor::CalcFragment;
use crate::grid::grid;
use crate::handlers::{Location, assign, images, misplaced, missing_param, parse_statement, value_row, width_param};
use crate::plot::{ChartBackend, PlotSpec};
use crate::table::{DataTable, parse_record};

/// Table strings accept plain assignments, rendered like value rows.
pub fn statement(text: &str, at: Location, ctx: &mut Context, out: &mut CalcFragment) -> Result<(), CalcError> {
    let stmt = parse_statement(text, at)?;
    let value = assign(&stmt, at, ctx)?;
    out.push(value_row(&stmt.target, &value, &stmt.description, ctx));
    Ok(())
}

pub fn dispatch(
    block: &Block,
    string: &RivetString,
    ctx: &mut Context,
    backend: &mut dyn ChartBackend,
    out: &mut CalcFragment,
) -> Result<(), CalcError> {
    let file_id = string.source_id;
    match block.command {
        Command::Read => read(block, file_id, ctx),
        Command::Save => save(block, file_id, ctx, backend, out),
        Command::Data => data(block, file_id, ctx),
        Command::Table => table(block, file_id, ctx, out),
        Command::Plot => plot(block, file_id, ctx, backend),
        Command::Add => {
            let options = Options::parse(&block.params.join(", "));
            let spec = ctx
                .plot
                .as_mut()
                .ok_or_else(|| CalcError::Plot("'add' needs a preceding 'plot'".to_string()))?;
            spec.add_series(&options)?;
            backend.draw(spec)
        }
        Command::Image => images(block, 1, file_id, ctx, out),
        Command::Image2 => images(block, 2, file_id, ctx, out),
        _ => Err(misplaced(block, StringKind::Table, file_id)),
    }
}

/// Table name from parameter `index`, or the file stem of `file`.
fn name_or_stem(block: &Block, index: usize, file: &str) -> String {
    match block.param(index) {
        Some(name) => name.to_string(),
        None => Path::new(file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string()),
    }
}

fn read(block: &Block, file_id: usize, ctx: &mut Context) -> Result<(), CalcError> {
    let file = block
        .param(0)
        .ok_or_else(|| missing_param(block, "a CSV file", file_id))?;
    let table = DataTable::read_csv(&ctx.folders.table_path(file))?;
    let name = name_or_stem(block, 1, file);
    debug!("table '{}' read with {} rows", name, table.rows.len());
    ctx.tables.insert(&name, table);
    Ok(())
}

/// `.csv` persists a named table; an image extension exports the current
/// plot as a numbered figure.
fn save(
    block: &Block,
    file_id: usize,
    ctx: &mut Context,
    backend: &mut dyn ChartBackend,
    out: &mut CalcFragment,
) -> Result<(), CalcError> {
    let file = block
        .param(0)
        .ok_or_else(|| missing_param(block, "a file name", file_id))?;
    let lower = file.to_ascii_lowercase();

    if lower.ends_with(".csv") {
        let name = name_or_stem(block, 1, file);
        let table = ctx
            .tables
            .get(&name)
            .ok_or_else(|| CalcError::Plot(format!("no table named '{}'", name)))?;
        return table.write_csv(&ctx.folders.table_path(file));
    }

    if [".png", ".jpg", ".jpeg", ".svg"].iter().any(|ext| lower.ends_with(ext)) {
        let spec = ctx
            .plot
            .as_ref()
            .ok_or_else(|| CalcError::Plot("'save' of an image needs a preceding 'plot'".to_string()))?;
        let path = ctx.folders.figure_path(file);
        backend.export(spec, &path)?;
        let caption = block.param(1).unwrap_or(spec.table.as_str()).to_string();
        let n = ctx.state.next_figure();
        out.push(format!("Figure {}  {}", ctx.state.section_label(n), caption));
        out.push(format!("path: {}", path.display()));
        out.blank();
        return Ok(());
    }

    Err(missing_param(block, "a .csv or image file name", file_id))
}

/// `|| data | name | col1, col2` creates an empty table.
fn data(block: &Block, file_id: usize, ctx: &mut Context) -> Result<(), CalcError> {
    let name = block
        .param(0)
        .ok_or_else(|| missing_param(block, "a table name", file_id))?;
    let headers = block.param(1).map(parse_record).unwrap_or_default();
    ctx.tables.insert(name, DataTable::new(headers));
    Ok(())
}

/// Render a stored table or a CSV file. Body lines after the title are
/// appended to a stored table as rows first.
fn table(block: &Block, file_id: usize, ctx: &mut Context, out: &mut CalcFragment) -> Result<(), CalcError> {
    let source = block
        .param(0)
        .ok_or_else(|| missing_param(block, "a table name or CSV file", file_id))?;
    let (max_width, options) = width_param(block.param(1), ctx.settings.table_width);
    let title = block.body.first().map(|t| t.trim()).unwrap_or("");
    let extra: Vec<Vec<String>> = block.body.iter().skip(1).map(|l| parse_record(l)).collect();

    let data = if let Some(stored) = ctx.tables.get_mut(source) {
        stored.rows.extend(extra);
        stored.clone()
    } else if source.to_ascii_lowercase().ends_with(".csv") {
        let mut data = DataTable::read_csv(&ctx.folders.table_path(source))?;
        data.rows.extend(extra);
        data
    } else {
        return Err(CalcError::FileNotFound {
            path: ctx.folders.table_path(source),
        });
    };
    let columns = options.indices("c");
    let data = data.slice(options.range("r"), columns.as_deref());

    let n = ctx.state.next_table();
    out.push(format!("Table {}  {}", ctx.state.section_label(n), title).trim_end());
    out.extend(grid(&data.headers, &data.rows, max_width));
    out.blank();
    Ok(())
}

/// Start a new figure from a stored table.
fn plot(block: &Block, file_id: usize, ctx: &mut Context, backend: &mut dyn ChartBackend) -> Result<(), CalcError> {
    let name = block
        .param(0)
        .ok_or_else(|| missing_param(block, "a table name", file_id))?;
    let table = ctx
        .tables
        .get(name)
        .ok_or_else(|| CalcError::Plot(format!("no table named '{}'", name)))?;
    let options = Options::parse(&block.params[1..].join(", "));
    let spec = PlotSpec::from_options(name, &options)?;
    for column in std::iter::once(&spec.x_column).chain(spec.series.iter().map(|s| &s.y_column)) {
        if table.column_index(column).is_none() {
            return Err(CalcError::Plot(format!("table '{}' has no column '{}'", name, column)));
        }
    }
    backend.draw(&spec)?;
    ctx.plot = Some(spec);
    Ok(())
}
