//! Two-dimensional text layout of expressions: fractions stacked over a bar,
//! powers raised one row, tall parentheses around multi-row groups.

use rivet::expr::{BinaryOperator, Expr, Symbolic, UnaryOperator};

use crate::format::width;

/// A rectangular block of text with a baseline row.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    lines: Vec<String>,
    baseline: usize,
}

impl TextBox {
    pub fn text(s: &str) -> Self {
        TextBox {
            lines: vec![s.to_string()],
            baseline: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.lines.iter().map(|l| width(l)).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines with trailing spaces removed.
    pub fn render(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.trim_end().to_string()).collect()
    }

    fn padded(&self) -> Vec<String> {
        let w = self.width();
        self.lines
            .iter()
            .map(|l| format!("{}{}", l, " ".repeat(w - width(l))))
            .collect()
    }

    /// Place boxes side by side, aligned on their baselines.
    pub fn hcat(parts: &[TextBox]) -> TextBox {
        let above = parts.iter().map(|p| p.baseline).max().unwrap_or(0);
        let below = parts
            .iter()
            .map(|p| p.height() - p.baseline - 1)
            .max()
            .unwrap_or(0);
        let height = above + below + 1;
        let mut lines = vec![String::new(); height];
        for part in parts {
            let w = part.width();
            let top = above - part.baseline;
            let padded = part.padded();
            for (row, line) in lines.iter_mut().enumerate() {
                match row.checked_sub(top).and_then(|r| padded.get(r)) {
                    Some(text) => line.push_str(text),
                    None => line.push_str(&" ".repeat(w)),
                }
            }
        }
        TextBox {
            lines,
            baseline: above,
        }
    }

    /// Stack `top` over `bottom` separated by a fraction bar.
    fn fraction(top: TextBox, bottom: TextBox) -> TextBox {
        let w = top.width().max(bottom.width()) + 2;
        let center = |b: &TextBox| -> Vec<String> {
            let left = (w - b.width()) / 2;
            b.padded()
                .into_iter()
                .map(|l| format!("{}{}{}", " ".repeat(left), l, " ".repeat(w - left - width(&l))))
                .collect()
        };
        let mut lines = center(&top);
        let baseline = lines.len();
        lines.push("─".repeat(w));
        lines.extend(center(&bottom));
        TextBox { lines, baseline }
    }

    /// Raise `exponent` to the upper right of `base`.
    fn power(base: TextBox, exponent: TextBox) -> TextBox {
        let bw = base.width();
        let ew = exponent.width();
        let mut lines: Vec<String> = exponent
            .padded()
            .into_iter()
            .map(|l| format!("{}{}", " ".repeat(bw), l))
            .collect();
        let raise = lines.len();
        lines.extend(base.padded().into_iter().map(|l| format!("{}{}", l, " ".repeat(ew))));
        TextBox {
            lines,
            baseline: raise + base.baseline,
        }
    }

    /// Wrap in parentheses sized to the box height.
    fn parenthesized(inner: TextBox) -> TextBox {
        let h = inner.height();
        if h == 1 {
            return TextBox::hcat(&[TextBox::text("("), inner, TextBox::text(")")]);
        }
        let column = |top: &str, mid: &str, bottom: &str| -> TextBox {
            let mut lines = vec![top.to_string()];
            lines.extend((0..h - 2).map(|_| mid.to_string()));
            lines.push(bottom.to_string());
            TextBox {
                lines,
                baseline: inner.baseline,
            }
        };
        let open = column("⎛", "⎜", "⎝");
        let close = column("⎞", "⎟", "⎠");
        TextBox::hcat(&[open, inner, close])
    }
}

/// Lay out an expression.
pub fn layout(expr: &Expr) -> TextBox {
    match expr {
        Expr::Number { text, .. } => TextBox::text(text),
        Expr::Variable(name, _) => TextBox::text(name),
        Expr::Array(items) => list("[", items, "]"),
        Expr::Call {
            function,
            arguments,
            ..
        } => {
            let args = list("", arguments, "");
            TextBox::hcat(&[TextBox::text(function), TextBox::parenthesized(args)])
        }
        Expr::Index { target, index } => TextBox::hcat(&[
            layout(target),
            TextBox::text("["),
            layout(index),
            TextBox::text("]"),
        ]),
        Expr::Unary { operator, operand } => {
            let sign = match operator {
                UnaryOperator::Negation => "-",
                UnaryOperator::Plus => "+",
            };
            TextBox::hcat(&[TextBox::text(sign), layout(operand)])
        }
        Expr::Binary {
            operator,
            left,
            right,
        } => match operator {
            BinaryOperator::Division => {
                TextBox::fraction(layout(left.ungrouped()), layout(right.ungrouped()))
            }
            BinaryOperator::Power => {
                let base = match left.as_ref() {
                    Expr::Binary { .. } | Expr::Unary { .. } => {
                        TextBox::parenthesized(layout(left.ungrouped()))
                    }
                    other => layout(other),
                };
                TextBox::power(base, layout(right.ungrouped()))
            }
            BinaryOperator::Multiplication => {
                TextBox::hcat(&[layout(left), TextBox::text("·"), layout(right)])
            }
            BinaryOperator::Addition | BinaryOperator::Subtraction => TextBox::hcat(&[
                layout(left),
                TextBox::text(&format!(" {} ", operator.symbol())),
                layout(right),
            ]),
        },
        Expr::Group(inner) => TextBox::parenthesized(layout(inner)),
    }
}

fn list(open: &str, items: &[Expr], close: &str) -> TextBox {
    let mut parts = vec![TextBox::text(open)];
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            parts.push(TextBox::text(", "));
        }
        parts.push(layout(item));
    }
    parts.push(TextBox::text(close));
    TextBox::hcat(&parts)
}

/// Lay out an expression or `lhs = rhs`.
pub fn layout_symbolic(symbolic: &Symbolic) -> TextBox {
    match symbolic {
        Symbolic::Expression(expr) => layout(expr),
        Symbolic::Equation { lhs, rhs } => {
            TextBox::hcat(&[layout(lhs), TextBox::text(" = "), layout(rhs)])
        }
    }
}
