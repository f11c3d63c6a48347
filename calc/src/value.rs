use std::fmt;

use crate::format::format_number;
use crate::units::Quantity;

/// Wrap width for rendered arrays.
pub const ARRAY_WIDTH: usize = 40;

/// A value produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(Vec<Value>),
    Quantity(Quantity),
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "Scalar",
            Value::Array(_) => "Array",
            Value::Quantity(_) => "Quantity",
            Value::Text(_) => "Text",
        }
    }

    /// Interpret a table cell: numbers become scalars, anything else text.
    pub fn from_cell(cell: &str) -> Value {
        match cell.trim().replace(',', "").parse::<f64>() {
            Ok(n) if !cell.trim().is_empty() => Value::Scalar(n),
            _ => Value::Text(cell.trim().to_string()),
        }
    }

    /// Render with `decimals` places, one rule per variant.
    pub fn format(&self, decimals: usize, trim: bool) -> String {
        match self {
            Value::Scalar(n) => format_number(*n, decimals, trim),
            Value::Quantity(q) => {
                let label = q.label();
                let number = format_number(q.display_value(), decimals, trim);
                if label.is_empty() {
                    number
                } else {
                    format!("{} {}", number, label)
                }
            }
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.format(decimals, trim)).collect();
                wrap_list(&parts, ARRAY_WIDTH)
            }
            Value::Text(s) => s.clone(),
        }
    }
}

/// `[a, b, c]`, broken after commas so no line exceeds `max` columns.
fn wrap_list(parts: &[String], max: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::from("[");
    for (i, part) in parts.iter().enumerate() {
        let piece = if i + 1 < parts.len() {
            format!("{},", part)
        } else {
            format!("{}]", part)
        };
        let sep = if current == "[" || current.trim().is_empty() { "" } else { " " };
        if current.chars().count() + sep.len() + piece.chars().count() > max && current.trim() != "[" {
            lines.push(current);
            current = format!(" {}", piece);
        } else {
            current.push_str(sep);
            current.push_str(&piece);
        }
    }
    if parts.is_empty() {
        current.push(']');
    }
    lines.push(current);
    lines.join("\n")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(3, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units;

    #[test]
    fn scalars_use_fixed_decimals() {
        assert_eq!(Value::Scalar(3.5).format(3, false), "3.500");
        assert_eq!(Value::Scalar(1234.5).format(1, false), "1,234.5");
    }

    #[test]
    fn quantities_show_their_unit() {
        let inch = Quantity::of_unit(units::lookup("IN").unwrap()).scale(10.1);
        assert_eq!(Value::Quantity(inch).format(3, false), "10.100 in");
    }

    #[test]
    fn short_arrays_stay_on_one_line() {
        let v = Value::Array(vec![Value::Scalar(1.0), Value::Scalar(2.0)]);
        assert_eq!(v.format(1, false), "[1.0, 2.0]");
        assert_eq!(Value::Array(vec![]).format(1, false), "[]");
    }

    #[test]
    fn long_arrays_wrap() {
        let v = Value::Array((0..12).map(|i| Value::Scalar(i as f64 * 1000.0)).collect());
        let text = v.format(2, false);
        assert!(text.lines().count() > 1);
        assert!(text.lines().all(|l| l.chars().count() <= ARRAY_WIDTH));
        assert!(text.starts_with("[0.00, 1,000.00,"));
        assert!(text.ends_with("11,000.00]"));
    }

    #[test]
    fn cells_parse_as_numbers_when_possible() {
        assert_eq!(Value::from_cell(" 1,200 "), Value::Scalar(1200.0));
        assert_eq!(Value::from_cell("W12x26"), Value::Text("W12x26".into()));
    }
}
