//! Translation of the LaTeX subset used in `|| tex` and `|| sym` blocks into
//! the plain expression grammar.

use crate::expr::Symbolic;
use crate::parser::error::ParseError;
use crate::parser::expression::{insert_implicit_products, parse_symbolic_tokens, tokenize_text};

/// Function names that keep call syntax when implicit products are inserted.
pub const KNOWN_FUNCTIONS: &[&str] = &[
    "sqrt", "abs", "sin", "cos", "tan", "asin", "acos", "atan", "exp", "ln", "log", "log10", "min",
    "max", "sum", "len", "floor", "ceil", "round",
];

const GREEK: &[(&str, &str)] = &[
    ("alpha", "α"),
    ("beta", "β"),
    ("gamma", "γ"),
    ("delta", "δ"),
    ("epsilon", "ε"),
    ("zeta", "ζ"),
    ("eta", "η"),
    ("theta", "θ"),
    ("kappa", "κ"),
    ("lambda", "λ"),
    ("mu", "μ"),
    ("nu", "ν"),
    ("xi", "ξ"),
    ("pi", "π"),
    ("rho", "ρ"),
    ("sigma", "σ"),
    ("tau", "τ"),
    ("phi", "φ"),
    ("chi", "χ"),
    ("psi", "ψ"),
    ("omega", "ω"),
    ("Gamma", "Γ"),
    ("Delta", "Δ"),
    ("Theta", "Θ"),
    ("Lambda", "Λ"),
    ("Sigma", "Σ"),
    ("Phi", "Φ"),
    ("Psi", "Ψ"),
    ("Omega", "Ω"),
];

/// Parse a LaTeX formula (`\frac{P L^{3}}{48 E I}`) into a symbolic form.
/// Errors carry a span covering the whole formula.
pub fn parse_latex(text: &str, file_id: usize) -> Result<Symbolic, ParseError> {
    let whole = 0..text.len();
    let plain = translate(text)
        .map_err(|msg| ParseError::error(msg, whole.clone(), file_id))?;
    let mut tokens = tokenize_text(&plain, file_id).map_err(|e| relocate(e, &whole))?;
    insert_implicit_products(&mut tokens, KNOWN_FUNCTIONS);
    parse_symbolic_tokens(tokens, plain.len(), file_id).map_err(|e| relocate(e, &whole))
}

fn relocate(mut err: ParseError, whole: &std::ops::Range<usize>) -> ParseError {
    err.span = whole.clone();
    err
}

/// Rewrite LaTeX markup into the plain expression syntax.
pub fn translate(text: &str) -> Result<String, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    translate_range(&chars, &mut 0, &mut out, None)?;
    Ok(out)
}

/// Translate until `close` (exclusive) or the end of input.
fn translate_range(
    chars: &[char],
    i: &mut usize,
    out: &mut String,
    close: Option<char>,
) -> Result<(), String> {
    while *i < chars.len() {
        let c = chars[*i];
        if Some(c) == close {
            return Ok(());
        }
        match c {
            '\\' => {
                *i += 1;
                let start = *i;
                while *i < chars.len() && chars[*i].is_ascii_alphabetic() {
                    *i += 1;
                }
                let command: String = chars[start..*i].iter().collect();
                if command.is_empty() {
                    // Spacing commands such as `\,` and `\;`
                    *i += 1;
                    out.push(' ');
                    continue;
                }
                translate_command(&command, chars, i, out)?;
            }
            '{' => {
                *i += 1;
                out.push('(');
                translate_range(chars, i, out, Some('}'))?;
                expect(chars, i, '}')?;
                out.push(')');
            }
            '_' => {
                // Subscripts become part of the identifier: x_{max} → x_max
                *i += 1;
                out.push('_');
                if *i < chars.len() && chars[*i] == '{' {
                    *i += 1;
                    while *i < chars.len() && chars[*i] != '}' {
                        if chars[*i].is_alphanumeric() {
                            out.push(chars[*i]);
                        }
                        *i += 1;
                    }
                    expect(chars, i, '}')?;
                } else if *i < chars.len() {
                    out.push(chars[*i]);
                    *i += 1;
                }
            }
            '}' => return Err("unbalanced '}'".to_string()),
            other => {
                out.push(other);
                *i += 1;
            }
        }
    }
    match close {
        Some(c) => Err(format!("missing '{}'", c)),
        None => Ok(()),
    }
}

fn translate_command(
    command: &str,
    chars: &[char],
    i: &mut usize,
    out: &mut String,
) -> Result<(), String> {
    match command {
        "frac" | "dfrac" | "tfrac" => {
            let numerator = group(chars, i)?;
            let denominator = group(chars, i)?;
            out.push_str(&format!("({})/({})", numerator, denominator));
        }
        "sqrt" => {
            let radicand = group(chars, i)?;
            out.push_str(&format!("sqrt({})", radicand));
        }
        "cdot" | "times" => out.push('*'),
        "left" | "right" | "big" | "Big" | "bigg" | "Bigg" => {}
        "quad" | "qquad" => out.push(' '),
        "ln" | "sin" | "cos" | "tan" | "exp" | "min" | "max" => out.push_str(command),
        "log" => out.push_str("log10"),
        "text" | "mathrm" | "operatorname" => {
            let inner = group(chars, i)?;
            out.push_str(&inner.replace(' ', ""));
        }
        other => match GREEK.iter().find(|(name, _)| *name == other) {
            Some((_, letter)) => out.push_str(letter),
            None => return Err(format!("unsupported LaTeX command '\\{}'", other)),
        },
    }
    Ok(())
}

/// Translate a `{...}` argument, skipping leading whitespace.
fn group(chars: &[char], i: &mut usize) -> Result<String, String> {
    while *i < chars.len() && chars[*i].is_whitespace() {
        *i += 1;
    }
    expect(chars, i, '{')?;
    let mut inner = String::new();
    translate_range(chars, i, &mut inner, Some('}'))?;
    expect(chars, i, '}')?;
    Ok(inner)
}

fn expect(chars: &[char], i: &mut usize, c: char) -> Result<(), String> {
    if chars.get(*i) == Some(&c) {
        *i += 1;
        Ok(())
    } else {
        Err(format!("expected '{}'", c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    #[test]
    fn fractions_and_products() {
        assert_eq!(translate(r"\frac{a}{b} \cdot c").unwrap(), "(a)/(b) * c");
    }

    #[test]
    fn subscripts_join_identifiers() {
        assert_eq!(translate(r"M_{max} = w_u").unwrap(), "M_max = w_u");
    }

    #[test]
    fn greek_letters_become_identifiers() {
        let sym = parse_latex(r"\sigma = \frac{M}{S}", 0).unwrap();
        let Symbolic::Equation { lhs, .. } = sym else {
            panic!("expected equation");
        };
        assert_eq!(lhs, Expr::Variable("σ".into(), 0..2));
    }

    #[test]
    fn implicit_products_are_inserted() {
        let sym = parse_latex(r"\frac{P L^{3}}{48 E I}", 0).unwrap();
        let Symbolic::Expression(expr) = sym else {
            panic!("expected expression");
        };
        assert_eq!(expr.variables(), vec!["P", "L", "E", "I"]);
    }

    #[test]
    fn unknown_commands_are_errors() {
        let err = parse_latex(r"\int x", 0).unwrap_err();
        assert!(err.message.contains("int"));
        assert_eq!(err.span, 0..6);
    }
}
