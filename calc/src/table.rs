//! Named tabular structures and their CSV form.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::CalcError;

/// A header row plus data rows of text cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>) -> Self {
        DataTable {
            headers,
            rows: Vec::new(),
        }
    }

    /// Parse comma-separated text; the first record is the header.
    pub fn parse_csv(text: &str) -> Self {
        let mut records = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(parse_record);
        let headers = records.next().unwrap_or_default();
        DataTable {
            headers,
            rows: records.collect(),
        }
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for record in std::iter::once(&self.headers).chain(self.rows.iter()) {
            let fields: Vec<String> = record.iter().map(|f| quote(f)).collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }

    pub fn read_csv(path: &Path) -> Result<Self, CalcError> {
        debug!("reading table {}", path.display());
        let text = fs::read_to_string(path).map_err(|e| CalcError::from_io(path, e))?;
        Ok(Self::parse_csv(&text))
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), CalcError> {
        debug!("writing table {}", path.display());
        fs::write(path, self.to_csv()).map_err(|e| CalcError::from_io(path, e))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name.trim())
    }

    /// Column `index` over the data rows. Short rows contribute empty cells.
    pub fn column(&self, index: usize) -> Option<Vec<String>> {
        let width = self.rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if index >= self.headers.len().max(width) {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|r| r.get(index).cloned().unwrap_or_default())
                .collect(),
        )
    }

    /// Record `index` counting the header as record 0.
    pub fn record(&self, index: usize) -> Option<&[String]> {
        if index == 0 {
            Some(&self.headers)
        } else {
            self.rows.get(index - 1).map(|r| r.as_slice())
        }
    }

    /// Keep data rows `first..=last` and the listed columns.
    pub fn slice(&self, rows: Option<(usize, usize)>, columns: Option<&[usize]>) -> DataTable {
        let pick = |record: &Vec<String>| -> Vec<String> {
            match columns {
                Some(cols) => cols
                    .iter()
                    .map(|c| record.get(*c).cloned().unwrap_or_default())
                    .collect(),
                None => record.clone(),
            }
        };
        let data: Vec<Vec<String>> = match rows {
            Some((first, last)) => self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, _)| *i >= first && *i <= last)
                .map(|(_, r)| pick(r))
                .collect(),
            None => self.rows.iter().map(pick).collect(),
        };
        DataTable {
            headers: pick(&self.headers),
            rows: data,
        }
    }
}

/// Split one CSV record. Double quotes group fields; `""` inside quotes is
/// a literal quote.
pub fn parse_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

fn quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Named tables created by `read` and `data` commands.
#[derive(Debug, Clone, Default)]
pub struct TableStore {
    tables: BTreeMap<String, DataTable>,
}

impl TableStore {
    pub fn insert(&mut self, name: &str, table: DataTable) {
        self.tables.insert(name.to_string(), table);
    }

    pub fn get(&self, name: &str) -> Option<&DataTable> {
        self.tables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataTable> {
        self.tables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_keep_commas() {
        assert_eq!(
            parse_record(r#"a, "b, c", "say ""hi""""#),
            vec!["a", "b, c", r#"say "hi""#]
        );
    }

    #[test]
    fn first_record_is_the_header() {
        let t = DataTable::parse_csv("span,load\n10,1.5\n\n20,2.5\n");
        assert_eq!(t.headers, vec!["span", "load"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.column(1), Some(vec!["1.5".to_string(), "2.5".to_string()]));
        assert_eq!(t.column(2), None);
        assert_eq!(t.record(0).map(|r| r.to_vec()), Some(t.headers.clone()));
        assert_eq!(t.record(2).map(|r| r[0].clone()), Some("20".to_string()));
    }

    #[test]
    fn csv_round_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let t = DataTable {
            headers: vec!["name".into(), "note".into()],
            rows: vec![vec!["w1".into(), "dead, live".into()]],
        };
        t.write_csv(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "name,note\nw1,\"dead, live\"\n");
        assert_eq!(DataTable::read_csv(&path).unwrap(), t);
    }

    #[test]
    fn missing_files_are_reported() {
        let err = DataTable::read_csv(Path::new("/nonexistent/t.csv")).unwrap_err();
        assert!(matches!(err, CalcError::FileNotFound { .. }));
    }

    #[test]
    fn slicing_rows_and_columns() {
        let t = DataTable::parse_csv("a,b,c\n1,2,3\n4,5,6\n7,8,9");
        let s = t.slice(Some((1, 2)), Some(&[2, 0]));
        assert_eq!(s.headers, vec!["c", "a"]);
        assert_eq!(s.rows, vec![vec!["6", "4"], vec!["9", "7"]]);
    }
}
