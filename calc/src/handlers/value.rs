use std::fs;

use log::debug;
use rivet::block::Block;
use rivet::command::Command;
use rivet::statement::{Lookup, Selector, ValueLine, is_value_line};
use rivet::{RivetString, StringKind};

use crate::context::Context;
use crate::error::{CalcError, EvalError};
use crate::executor::CalcFragment;
use crate::handlers::{Location, assign, misplaced, value_row};
use crate::table::DataTable;
use crate::value::Value;

/// One value-string line: an assignment, a CSV lookup or a reprint.
pub fn line(text: &str, at: Location, ctx: &mut Context, out: &mut CalcFragment) -> Result<(), CalcError> {
    let parsed = ValueLine::parse(text, at.file_id).map_err(|e| CalcError::Parse(e.at_line(at.line, at.offset)))?;
    match parsed {
        ValueLine::Assign(stmt) => {
            let value = assign(&stmt, at, ctx)?;
            out.push(value_row(&stmt.target, &value, &stmt.description, ctx));
        }
        ValueLine::Lookup(lookup) => {
            let value = look_up(&lookup, at, ctx)?;
            ctx.env.set(&lookup.target, value.clone(), &lookup.description);
            out.push(value_row(&lookup.target, &value, &lookup.description, ctx));
        }
        ValueLine::Reprint { name, note } => {
            let Some(entry) = ctx.env.entry(&name) else {
                return Err(CalcError::Evaluation {
                    line: at.line,
                    span: at.offset..at.offset + name.len(),
                    error: EvalError::UndefinedVariable {
                        name,
                        span: 0..0,
                    },
                });
            };
            let description = if note.is_empty() { entry.description.as_str() } else { note.as_str() };
            out.push(value_row(&name, &entry.value, description, ctx));
        }
    }
    Ok(())
}

/// Row or column of a CSV file as an array value.
fn look_up(lookup: &Lookup, at: Location, ctx: &Context) -> Result<Value, CalcError> {
    let data = DataTable::read_csv(&ctx.folders.table_path(&lookup.file))?;
    let (cells, len) = match lookup.selector {
        Selector::Row(n) => (data.record(n).map(|r| r.to_vec()), data.rows.len() + 1),
        Selector::Column(n) => (data.column(n), data.headers.len()),
    };
    let index = match lookup.selector {
        Selector::Row(n) | Selector::Column(n) => n,
    };
    let cells = cells.ok_or_else(|| CalcError::Evaluation {
        line: at.line,
        span: at.offset..at.offset + lookup.file.len(),
        error: EvalError::IndexOutOfBounds {
            index: index as i64,
            len,
        },
    })?;
    Ok(Value::Array(cells.iter().map(|c| Value::from_cell(c)).collect()))
}

pub fn dispatch(
    block: &Block,
    string: &RivetString,
    ctx: &mut Context,
    out: &mut CalcFragment,
) -> Result<(), CalcError> {
    if block.command != Command::Values {
        return Err(misplaced(block, StringKind::Value, string.source_id));
    }
    if let Some(source) = block.param(0) {
        bulk(source, ctx, out)?;
    }
    for (i, text) in block.body.iter().enumerate() {
        if is_value_line(text) {
            line(text, Location::in_block(string, block, i), ctx, out)?;
        } else {
            out.push(text.trim());
        }
    }
    out.blank();
    Ok(())
}

/// Assign every definition in a file. `.csv` files hold `name, expression,
/// description` records under a header; other files hold
/// `name = literal # description` lines.
fn bulk(source: &str, ctx: &mut Context, out: &mut CalcFragment) -> Result<(), CalcError> {
    let path = ctx.folders.table_path(source);
    debug!("loading values from {}", path.display());
    let lines: Vec<String> = if source.to_ascii_lowercase().ends_with(".csv") {
        DataTable::read_csv(&path)?
            .rows
            .iter()
            .filter(|r| r.first().is_some_and(|n| !n.is_empty()))
            .map(|r| {
                let cell = |i: usize| r.get(i).map(|s| s.as_str()).unwrap_or("");
                format!("{} = {} | {}", cell(0), cell(1), cell(2))
            })
            .collect()
    } else {
        let text = fs::read_to_string(&path).map_err(|e| CalcError::from_io(&path, e))?;
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| match l.split_once('#') {
                Some((assignment, description)) => {
                    format!("{} | {}", assignment.trim(), description.trim())
                }
                None => l.to_string(),
            })
            .collect()
    };

    for (i, text) in lines.iter().enumerate() {
        let at = Location {
            line: i,
            offset: 0,
            file_id: 0,
        };
        // the definition file has no source id, so report by line number
        line(text, at, ctx, out).map_err(|e| match e {
            CalcError::Parse(_) | CalcError::Evaluation { .. } => CalcError::FileRead {
                path: path.clone(),
                message: match &e {
                    CalcError::Evaluation { error, .. } => format!("line {}: {}", i + 1, error),
                    other => format!("line {}: {}", i + 1, other),
                },
            },
            other => other,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Folders;

    fn at() -> Location {
        Location {
            line: 0,
            offset: 0,
            file_id: 0,
        }
    }

    #[test]
    fn assignments_bind_and_render() {
        let mut ctx = Context::new();
        let mut out = CalcFragment::new();
        line("x = 10.1 * IN | length of beam", at(), &mut ctx, &mut out).unwrap();
        assert_eq!(ctx.env.get("x").map(|v| v.format(3, false)), Some("10.100 in".to_string()));
        assert!(out.lines()[0].starts_with("x = 10.100 in "));
        assert!(out.lines()[0].ends_with("| length of beam"));
    }

    #[test]
    fn reprint_uses_the_stored_description() {
        let mut ctx = Context::new();
        let mut out = CalcFragment::new();
        line("w = 2 | unit weight", at(), &mut ctx, &mut out).unwrap();
        line("w: |", at(), &mut ctx, &mut out).unwrap();
        assert_eq!(out.lines()[0], out.lines()[1]);
        assert!(matches!(
            line("q: | nothing", at(), &mut ctx, &mut out),
            Err(CalcError::Evaluation { error: EvalError::UndefinedVariable { .. }, .. })
        ));
    }

    #[test]
    fn csv_lookups_read_rows_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("d.csv"), "a,b\n1,2\n3,4\n").unwrap();
        let mut ctx = Context::new().with_folders(Folders::all(dir.path()));
        let mut out = CalcFragment::new();
        line("d.csv[1] => r1 | first row", at(), &mut ctx, &mut out).unwrap();
        line("d.csv[:,1] => cb", at(), &mut ctx, &mut out).unwrap();
        assert_eq!(ctx.env.get("r1"), Some(&Value::Array(vec![Value::Scalar(1.0), Value::Scalar(2.0)])));
        assert_eq!(ctx.env.get("cb"), Some(&Value::Array(vec![Value::Scalar(2.0), Value::Scalar(4.0)])));
        assert!(line("d.csv[9] => bad", at(), &mut ctx, &mut out).is_err());
    }

    #[test]
    fn bulk_definition_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("defs.txt"), "# loads\nfc = 4000 # concrete strength\nfy = 60000\n").unwrap();
        let mut ctx = Context::new().with_folders(Folders::all(dir.path()));
        let mut out = CalcFragment::new();
        bulk("defs.txt", &mut ctx, &mut out).unwrap();
        assert_eq!(ctx.env.get("fy"), Some(&Value::Scalar(60000.0)));
        assert_eq!(ctx.env.entry("fc").unwrap().description, "concrete strength");
        assert_eq!(out.len(), 2);
    }
}
