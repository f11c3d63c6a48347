//! Symbol-for-value substitution into the 2-D layout of an equation.
//!
//! Each variable on the right-hand side is renamed to a run of a private-use
//! filler character exactly as wide as its formatted value. The renamed
//! equation is laid out, and the runs are then swapped for the values, so
//! fraction bars and raised exponents size themselves to the numbers.

use std::collections::HashMap;

use rivet::expr::{Expr, Symbolic};

use crate::environment::Environment;
use crate::format::width;
use crate::pretty::layout_symbolic;
use crate::value::Value;

/// First filler character; variable `i` uses `FILLER_BASE + i`.
const FILLER_BASE: u32 = 0xE000;
const FILLER_LIMIT: u32 = 0xF8FF;

/// Format a value for inline substitution: single-line, negatives in
/// parentheses.
pub fn inline_value(value: &Value, decimals: usize, trim: bool) -> String {
    let text = match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(|v| inline_value(v, decimals, trim)).collect();
            format!("[{}]", parts.join(", "))
        }
        other => other.format(decimals, trim),
    };
    if text.starts_with('-') {
        format!("({})", text)
    } else {
        text
    }
}

/// Lay out `symbolic` with every right-hand-side variable known to `env`
/// replaced by its value. Unit names and constants stay symbolic.
pub fn substituted(symbolic: &Symbolic, env: &Environment, decimals: usize, trim: bool) -> Vec<String> {
    let rhs = match symbolic {
        Symbolic::Expression(expr) => expr,
        Symbolic::Equation { rhs, .. } => rhs,
    };

    let mut fillers: HashMap<String, String> = HashMap::new();
    let mut swaps: Vec<(String, String)> = Vec::new();
    for (i, name) in rhs.variables().into_iter().enumerate() {
        let Some(value) = env.get(name) else { continue };
        let Some(c) = char::from_u32(FILLER_BASE + i as u32).filter(|c| (*c as u32) <= FILLER_LIMIT)
        else {
            break;
        };
        let text = inline_value(value, decimals, trim);
        let run: String = std::iter::repeat_n(c, width(&text)).collect();
        fillers.insert(name.to_string(), run.clone());
        swaps.push((run, text));
    }

    let renamed = match symbolic {
        Symbolic::Expression(expr) => Symbolic::Expression(rename(expr, &fillers)),
        Symbolic::Equation { lhs, rhs } => Symbolic::Equation {
            lhs: lhs.clone(),
            rhs: rename(rhs, &fillers),
        },
    };

    layout_symbolic(&renamed)
        .render()
        .into_iter()
        .map(|line| {
            swaps
                .iter()
                .fold(line, |acc, (run, text)| acc.replace(run.as_str(), text))
        })
        .collect()
}

fn rename(expr: &Expr, fillers: &HashMap<String, String>) -> Expr {
    let boxed = |e: &Expr| Box::new(rename(e, fillers));
    match expr {
        Expr::Variable(name, span) => match fillers.get(name) {
            Some(run) => Expr::Variable(run.clone(), span.clone()),
            None => expr.clone(),
        },
        Expr::Number { .. } => expr.clone(),
        Expr::Array(items) => Expr::Array(items.iter().map(|e| rename(e, fillers)).collect()),
        Expr::Call {
            function,
            arguments,
            span,
        } => Expr::Call {
            function: function.clone(),
            arguments: arguments.iter().map(|e| rename(e, fillers)).collect(),
            span: span.clone(),
        },
        Expr::Index { target, index } => Expr::Index {
            target: boxed(target),
            index: boxed(index),
        },
        Expr::Unary { operator, operand } => Expr::Unary {
            operator: *operator,
            operand: boxed(operand),
        },
        Expr::Binary {
            operator,
            left,
            right,
        } => Expr::Binary {
            operator: *operator,
            left: boxed(left),
            right: boxed(right),
        },
        Expr::Group(inner) => Expr::Group(boxed(inner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet::parser::parse_symbolic;

    fn env(values: &[(&str, f64)]) -> Environment {
        let mut env = Environment::new();
        for (name, v) in values {
            env.set(name, Value::Scalar(*v), "");
        }
        env
    }

    #[test]
    fn fraction_bars_widen_to_fit_values() {
        let sym = parse_symbolic("c = a/b", 0).unwrap();
        let lines = substituted(&sym, &env(&[("a", 2.0), ("b", 3.0)]), 1, false);
        assert_eq!(lines, vec!["     2.0", "c = ─────", "     3.0"]);
    }

    #[test]
    fn lhs_and_unknown_names_stay_symbolic() {
        let sym = parse_symbolic("y = x + 1*IN", 0).unwrap();
        let lines = substituted(&sym, &env(&[("x", 1500.0), ("y", 9.0)]), 2, false);
        assert_eq!(lines, vec!["y = 1,500.00 + 1·IN"]);
    }

    #[test]
    fn negative_values_are_parenthesized() {
        let sym = parse_symbolic("z = 2*x", 0).unwrap();
        let lines = substituted(&sym, &env(&[("x", -4.0)]), 0, false);
        assert_eq!(lines, vec!["z = 2·(-4)"]);
    }

    #[test]
    fn repeated_variables_are_all_replaced() {
        let sym = parse_symbolic("A = s*s", 0).unwrap();
        let lines = substituted(&sym, &env(&[("s", 1.5)]), 1, false);
        assert_eq!(lines, vec!["A = 1.5·1.5"]);
    }
}
