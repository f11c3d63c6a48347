use log::warn;
use rivet::StringKind;
use rivet::block::{Block, Options};
use rivet::command::Command;
use rivet::expr::{Expr, Symbolic};

use crate::context::Context;
use crate::error::CalcError;
use crate::executor::CalcFragment;
use crate::format::{rjust, rule};
use crate::handlers::{Location, assign, misplaced, parse_statement};
use crate::pretty::layout_symbolic;
use crate::substitute::substituted;

/// `result = expression | description | unit`
///
/// Evaluates and binds `result`, then renders, depending on the print mode:
/// the numbered description, the symbolic layout, the layout with values
/// substituted, the right-justified result and a closing rule.
pub fn statement(text: &str, at: Location, ctx: &mut Context, out: &mut CalcFragment) -> Result<(), CalcError> {
    let stmt = parse_statement(text, at)?;
    let settings = ctx.settings.clone();
    let width = ctx.width();

    let symbolic = Symbolic::Equation {
        lhs: Expr::variable(&stmt.target),
        rhs: stmt.expr.clone(),
    };
    // substitute before binding so `x = x + 1` shows the old value
    let with_values = substituted(&symbolic, &ctx.env, settings.equation_decimals, settings.trim);
    let value = assign(&stmt, at, ctx)?;

    let header = if settings.numbering {
        let n = ctx.state.next_equation();
        format!("{} [{}]", stmt.description, ctx.state.section_label(n))
    } else {
        stmt.description.clone()
    };
    if !header.trim().is_empty() {
        out.push(rjust(header.trim(), width));
    }

    let symbolic_lines = layout_symbolic(&symbolic).render();
    if settings.print_mode >= 1 {
        out.extend(&symbolic_lines);
        out.blank();
    }
    if settings.print_mode >= 2 && with_values != symbolic_lines {
        out.extend(with_values);
        out.blank();
    }

    let result = value.format(settings.result_decimals, settings.trim);
    for (i, line) in result.split('\n').enumerate() {
        let shown = if i == 0 {
            format!("{} = {}", stmt.target, line)
        } else {
            line.to_string()
        };
        out.push(rjust(&shown, width));
    }
    out.push(rule(width));
    Ok(())
}

pub fn dispatch(block: &Block, file_id: usize, ctx: &mut Context, _out: &mut CalcFragment) -> Result<(), CalcError> {
    match block.command {
        Command::Format => {
            let options = Options::parse(&block.params.join(", "));
            ctx.settings.apply_options(&options);
        }
        Command::Func => {
            warn!(
                "'func' on line {} is not supported; the block is skipped",
                block.line + 1
            );
        }
        _ => return Err(misplaced(block, StringKind::Equation, file_id)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::value::Value;

    fn at() -> Location {
        Location {
            line: 0,
            offset: 0,
            file_id: 0,
        }
    }

    fn ctx(width: usize) -> Context {
        let mut ctx = Context::new();
        ctx.state.section_width = width;
        ctx
    }

    #[test]
    fn full_print_mode() {
        let mut ctx = ctx(20);
        ctx.env.set("a", Value::Scalar(6.0), "");
        ctx.settings.equation_decimals = 1;
        ctx.settings.result_decimals = 2;
        let mut out = CalcFragment::new();
        statement("b = a/2 | half", at(), &mut ctx, &mut out).unwrap();
        assert_eq!(
            out.lines(),
            &[
                "          half [1.1]",
                "     a",
                "b = ───",
                "     2",
                "",
                "     6.0",
                "b = ─────",
                "      2",
                "",
                "            b = 3.00",
                "└──────────────────┘",
            ]
        );
        assert_eq!(ctx.env.get("b"), Some(&Value::Scalar(3.0)));
    }

    #[test]
    fn self_reference_substitutes_the_previous_value() {
        let mut ctx = ctx(20);
        ctx.env.set("n", Value::Scalar(1.0), "");
        ctx.settings.apply_options(&Options::parse("e:0, n:f"));
        let mut out = CalcFragment::new();
        statement("n = n + 1", at(), &mut ctx, &mut out).unwrap();
        assert!(out.lines().iter().any(|l| l == "n = 1 + 1"));
        assert_eq!(ctx.env.get("n"), Some(&Value::Scalar(2.0)));
    }

    #[test]
    fn result_only_without_numbering() {
        let mut ctx = ctx(12);
        ctx.settings.apply_options(&Options::parse("p:0, n:f, r:1"));
        let mut out = CalcFragment::new();
        statement("c = 2 + 2", at(), &mut ctx, &mut out).unwrap();
        assert_eq!(out.lines(), &["     c = 4.0", "└──────────┘"]);
        assert_eq!(ctx.state.equation_number, 0);
    }

    #[test]
    fn evaluation_errors_propagate_with_spans() {
        let mut ctx = ctx(40);
        let mut out = CalcFragment::new();
        let at = Location {
            line: 3,
            offset: 100,
            file_id: 0,
        };
        let err = statement("y = 2*missing", at, &mut ctx, &mut out).unwrap_err();
        match err {
            CalcError::Evaluation { line, span, error } => {
                assert_eq!(line, 3);
                assert_eq!(span, 106..113);
                assert!(matches!(error, EvalError::UndefinedVariable { .. }));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!ctx.env.contains("y"));
    }

    #[test]
    fn unit_field_converts_the_result() {
        let mut ctx = ctx(30);
        ctx.settings.apply_options(&Options::parse("p:0, n:f"));
        let mut out = CalcFragment::new();
        statement("L = 18*IN | length | FT", at(), &mut ctx, &mut out).unwrap();
        assert_eq!(out.lines()[1].trim(), "L = 1.500 ft");
    }

    #[test]
    fn format_updates_settings_and_func_is_skipped() {
        let mut ctx = Context::new();
        let mut out = CalcFragment::new();
        let format = Block::new(Command::Format, vec!["e:4, r:1".into(), "t:t".into()], 0, 0..0);
        dispatch(&format, 0, &mut ctx, &mut out).unwrap();
        assert_eq!(ctx.settings.equation_decimals, 4);
        assert_eq!(ctx.settings.result_decimals, 1);
        assert!(ctx.settings.trim);
        let func = Block::new(Command::Func, vec!["lib.py".into()], 1, 0..0);
        dispatch(&func, 0, &mut ctx, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn misplaced_commands_point_at_their_string() {
        let mut ctx = Context::new();
        let mut out = CalcFragment::new();
        let plot = Block::new(Command::Plot, vec!["t".into()], 2, 10..20);
        match dispatch(&plot, 3, &mut ctx, &mut out) {
            Err(CalcError::Parse(e)) => {
                assert_eq!(e.file_id, 3);
                assert_eq!(e.line, Some(2));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
