//! Statement lines of value, equation and table strings.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::expr::Expr;
use crate::parser::error::ParseError;
use crate::parser::expression::parse_expression;

static ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\p{L}_][\w]*\s*=([^=]|$)").unwrap());

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L}_][\w]*$").unwrap());

static LOOKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([^\[\s]+)\[\s*(:\s*,\s*)?(\d+)\s*\]\s*=>\s*([\p{L}_][\w]*)\s*(?:\|\s*(.*))?$")
        .unwrap()
});

static REPRINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([\p{L}_][\w]*)\s*:\s*\|\s*(.*)$").unwrap());

/// `target = expression | description | unit`
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: String,
    /// The right-hand side as written.
    pub expression: String,
    pub expr: Expr,
    pub description: String,
    /// Optional display unit for the result, as written.
    pub unit: Option<String>,
    /// Byte span of the right-hand side within the statement text.
    pub expression_span: Range<usize>,
}

impl Statement {
    /// Parse a statement line. Spans in errors are relative to `text`.
    pub fn parse(text: &str, file_id: usize) -> Result<Statement, ParseError> {
        let (assignment, rest) = match text.split_once('|') {
            Some((a, rest)) => (a, Some(rest)),
            None => (text, None),
        };
        let Some((lhs, rhs)) = assignment.split_once('=') else {
            return Err(ParseError::error(
                "expected 'name = expression'",
                0..text.len(),
                file_id,
            ));
        };

        let target = lhs.trim();
        if !IDENTIFIER.is_match(target) {
            let start = lhs.len() - lhs.trim_start().len();
            return Err(ParseError::error(
                format!("'{}' is not a valid variable name", target),
                start..start + target.len(),
                file_id,
            ));
        }

        let rhs_start = lhs.len() + 1 + (rhs.len() - rhs.trim_start().len());
        let expression = rhs.trim();
        let expression_span = rhs_start..rhs_start + expression.len();
        let expr = parse_expression(expression, file_id).map_err(|e| e.shifted(rhs_start))?;

        let mut fields = rest.into_iter().flat_map(|r| r.split('|')).map(str::trim);
        let description = fields.next().unwrap_or("").to_string();
        let unit = fields.next().filter(|u| !u.is_empty()).map(str::to_string);

        Ok(Statement {
            target: target.to_string(),
            expression: expression.to_string(),
            expr,
            description,
            unit,
            expression_span,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// `file.csv[N]`: row N, counting the header as row 0.
    Row(usize),
    /// `file.csv[:,N]`: column N over the data rows.
    Column(usize),
}

/// `file.csv[N] => name | description`
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub file: String,
    pub selector: Selector,
    pub target: String,
    pub description: String,
}

/// One line of a value string.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueLine {
    Assign(Statement),
    Lookup(Lookup),
    /// `name: | note` re-renders an existing value.
    Reprint { name: String, note: String },
}

impl ValueLine {
    pub fn parse(text: &str, file_id: usize) -> Result<ValueLine, ParseError> {
        if let Some(caps) = LOOKUP.captures(text) {
            let index: usize = caps[3].parse().map_err(|_| {
                ParseError::error("lookup index is out of range", 0..text.len(), file_id)
            })?;
            let selector = if caps.get(2).is_some() {
                Selector::Column(index)
            } else {
                Selector::Row(index)
            };
            return Ok(ValueLine::Lookup(Lookup {
                file: caps[1].to_string(),
                selector,
                target: caps[4].to_string(),
                description: caps.get(5).map(|m| m.as_str().trim()).unwrap_or("").to_string(),
            }));
        }
        if let Some(caps) = REPRINT.captures(text) {
            return Ok(ValueLine::Reprint {
                name: caps[1].to_string(),
                note: caps.get(2).map(|m| m.as_str().trim()).unwrap_or("").to_string(),
            });
        }
        Statement::parse(text, file_id).map(ValueLine::Assign)
    }
}

/// Whether `text` is an assignment (`name = ...`, not `name == ...`).
pub fn is_assignment(text: &str) -> bool {
    ASSIGNMENT.is_match(text)
}

/// Whether `text` is a value-string line: an assignment, a lookup or a reprint.
pub fn is_value_line(text: &str) -> bool {
    is_assignment(text) || LOOKUP.is_match(text) || REPRINT.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_fields() {
        let s = Statement::parse("M = w*L^2/8 | midspan moment | KIP*FT", 0).unwrap();
        assert_eq!(s.target, "M");
        assert_eq!(s.expression, "w*L^2/8");
        assert_eq!(s.description, "midspan moment");
        assert_eq!(s.unit.as_deref(), Some("KIP*FT"));
        assert_eq!(s.expression_span, 4..11);
    }

    #[test]
    fn description_is_optional() {
        let s = Statement::parse("x = 3.5", 0).unwrap();
        assert_eq!(s.description, "");
        assert_eq!(s.unit, None);
    }

    #[test]
    fn expression_errors_point_into_the_line() {
        let err = Statement::parse("x = 2 $ 3 | bad", 0).unwrap_err();
        assert_eq!(err.span, 6..7);
    }

    #[test]
    fn invalid_target_is_rejected() {
        assert!(Statement::parse("2x = 3", 0).is_err());
    }

    #[test]
    fn assignment_detection_ignores_comparisons() {
        assert!(is_assignment("x = 1"));
        assert!(is_assignment("  area_1 =b*h"));
        assert!(!is_assignment("x == 1"));
        assert!(!is_assignment("The load = 3 kips is large"));
    }

    #[test]
    fn lookup_lines() {
        let line = ValueLine::parse("beams.csv[:,2] => depths | beam depths", 0).unwrap();
        assert_eq!(
            line,
            ValueLine::Lookup(Lookup {
                file: "beams.csv".into(),
                selector: Selector::Column(2),
                target: "depths".into(),
                description: "beam depths".into(),
            })
        );
        let ValueLine::Lookup(row) = ValueLine::parse("beams.csv[1] => w12", 0).unwrap() else {
            panic!("expected lookup");
        };
        assert_eq!(row.selector, Selector::Row(1));
    }

    #[test]
    fn reprint_lines() {
        assert_eq!(
            ValueLine::parse("span: | from above", 0).unwrap(),
            ValueLine::Reprint { name: "span".into(), note: "from above".into() }
        );
        assert!(is_value_line("span: |"));
        assert!(!is_value_line("Geometry:"));
        assert!(!is_value_line("Note: loads are factored"));
    }
}
