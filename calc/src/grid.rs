//! Grid-format text tables.
//!
//! ```text
//! +------+------+
//! | name | load |
//! +======+======+
//! | dead |  1.2 |
//! +------+------+
//! ```

use crate::format::{ljust, rjust, width, wrap};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Render `rows` under `headers` as a grid table, wrapping every cell to at
/// most `max_width` characters per line. An empty `headers` renders rows only.
pub fn grid(headers: &[String], rows: &[Vec<String>], max_width: usize) -> Vec<String> {
    let columns = rows
        .iter()
        .map(|r| r.len())
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }

    let split = |row: &[String]| -> Vec<Vec<String>> {
        (0..columns)
            .map(|c| {
                let cell = row.get(c).map(|s| s.as_str()).unwrap_or("");
                cell.split('\n').flat_map(|part| wrap(part, max_width)).collect()
            })
            .collect()
    };
    let header_cells = if headers.is_empty() { None } else { Some(split(headers)) };
    let body: Vec<Vec<Vec<String>>> = rows.iter().map(|r| split(r.as_slice())).collect();

    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            header_cells
                .iter()
                .chain(body.iter())
                .flat_map(|row| row[c].iter())
                .map(|l| width(l))
                .max()
                .unwrap_or(0)
                .max(1)
        })
        .collect();

    let aligns: Vec<Align> = (0..columns)
        .map(|c| {
            let mut cells = rows
                .iter()
                .filter_map(|r| r.get(c))
                .filter(|s| !s.trim().is_empty())
                .peekable();
            let numeric = cells.peek().is_some()
                && cells.all(|s| matches!(Value::from_cell(s), Value::Scalar(_)));
            if numeric { Align::Right } else { Align::Left }
        })
        .collect();

    let border = |fill: &str| -> String {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&fill.repeat(w + 2));
            line.push('+');
        }
        line
    };
    let render_row = |row: &[Vec<String>], out: &mut Vec<String>| {
        let height = row.iter().map(|c| c.len()).max().unwrap_or(1);
        for i in 0..height {
            let mut line = String::from("|");
            for (c, cell) in row.iter().enumerate() {
                let text = cell.get(i).map(|s| s.as_str()).unwrap_or("");
                let padded = match aligns[c] {
                    Align::Left => ljust(text, widths[c]),
                    Align::Right => rjust(text, widths[c]),
                };
                line.push(' ');
                line.push_str(&padded);
                line.push_str(" |");
            }
            out.push(line);
        }
    };

    let mut out = vec![border("-")];
    if let Some(header) = &header_cells {
        render_row(header.as_slice(), &mut out);
        out.push(border("="));
    }
    for row in &body {
        render_row(row.as_slice(), &mut out);
        out.push(border("-"));
    }
    if body.is_empty() && header_cells.is_some() {
        // header-only table closes with a plain border
        out.pop();
        out.push(border("-"));
    }
    out
}
