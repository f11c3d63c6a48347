use std::ops::Range;

use rivet::expr::{BinaryOperator, Expr, UnaryOperator};
use rivet::parser::parse_expression;

use crate::environment::Environment;
use crate::error::EvalError;
use crate::units::{self, DisplayUnit, Dimension, Quantity};
use crate::value::Value;

const MAX_DEPTH: usize = 256;

/// Evaluate an expression against the environment. Identifiers resolve to
/// variables first, then units, then the constants `pi` and `e`.
pub fn evaluate(expr: &Expr, env: &Environment) -> Result<Value, EvalError> {
    eval(expr, env, 0)
}

fn eval(expr: &Expr, env: &Environment, depth: usize) -> Result<Value, EvalError> {
    if depth > MAX_DEPTH {
        return Err(EvalError::Syntax("expression nested too deeply".to_string()));
    }

    match expr {
        // --- Literals ---
        Expr::Number { value, .. } => Ok(Value::Scalar(*value)),
        Expr::Array(items) => items
            .iter()
            .map(|item| eval(item, env, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),

        // --- References ---
        Expr::Variable(name, span) => resolve(name, span, env),

        Expr::Index { target, index } => {
            let target = eval(target, env, depth + 1)?;
            let index = eval(index, env, depth + 1)?;
            index_value(&target, &index)
        }

        Expr::Call {
            function,
            arguments,
            span,
        } => {
            let args = arguments
                .iter()
                .map(|a| eval(a, env, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(function, span, args)
        }

        // --- Operations ---
        Expr::Unary { operator, operand } => {
            let val = eval(operand, env, depth + 1)?;
            match operator {
                UnaryOperator::Plus => Ok(val),
                UnaryOperator::Negation => map_numeric(val, &|v| match v {
                    Value::Scalar(n) => Ok(Value::Scalar(-n)),
                    Value::Quantity(q) => Ok(Value::Quantity(q.scale(-1.0))),
                    other => Err(type_error("Scalar or Quantity", &other)),
                }),
            }
        }

        Expr::Binary {
            operator,
            left,
            right,
        } => {
            let l = eval(left, env, depth + 1)?;
            let r = eval(right, env, depth + 1)?;
            eval_binary_op(*operator, l, r)
        }

        Expr::Group(inner) => eval(inner, env, depth + 1),
    }
}

fn resolve(name: &str, span: &Range<usize>, env: &Environment) -> Result<Value, EvalError> {
    if let Some(value) = env.get(name) {
        return Ok(value.clone());
    }
    if let Some(unit) = units::lookup(name) {
        return Ok(Value::Quantity(Quantity::of_unit(unit)));
    }
    match name {
        "pi" | "π" => Ok(Value::Scalar(std::f64::consts::PI)),
        "e" => Ok(Value::Scalar(std::f64::consts::E)),
        _ => Err(EvalError::UndefinedVariable {
            name: name.to_string(),
            span: span.clone(),
        }),
    }
}

/// Re-express `value` in the unit written as `unit_text` (e.g. `KIP*FT`).
pub fn convert(value: Value, unit_text: &str) -> Result<Value, EvalError> {
    let expr = parse_expression(unit_text, 0).map_err(|e| EvalError::Syntax(e.message))?;
    let target = match evaluate(&expr, &Environment::new())? {
        Value::Quantity(q) => q,
        other => return Err(type_error("unit", &other)),
    };
    map_numeric(value, &|v| match v {
        Value::Quantity(q) => Ok(Value::Quantity(q.convert_to(&target)?)),
        other => Err(EvalError::IncompatibleUnits {
            left: other.type_name().to_string(),
            right: target.label(),
        }),
    })
}

fn type_error(expected: &str, got: &Value) -> EvalError {
    EvalError::TypeError {
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}

/// A quantity whose dimensions cancel collapses to a scalar.
fn collapse(q: Quantity) -> Value {
    if q.dim.is_none() {
        Value::Scalar(q.si)
    } else {
        Value::Quantity(q)
    }
}

fn dimensionless(n: f64) -> Quantity {
    Quantity {
        si: n,
        dim: Dimension::NONE,
        unit: DisplayUnit {
            terms: Vec::new(),
            factor: 1.0,
        },
    }
}

/// Apply `f` to a value, elementwise through arrays.
fn map_numeric(
    value: Value,
    f: &dyn Fn(Value) -> Result<Value, EvalError>,
) -> Result<Value, EvalError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|v| map_numeric(v, f))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => f(other),
    }
}

fn eval_binary_op(op: BinaryOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return Err(EvalError::TypeError {
                    expected: format!("array of length {}", a.len()),
                    got: format!("array of length {}", b.len()),
                });
            }
            a.into_iter()
                .zip(b)
                .map(|(x, y)| eval_binary_op(op, x, y))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        (Value::Array(a), r) => a
            .into_iter()
            .map(|x| eval_binary_op(op, x, r.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (l, Value::Array(b)) => b
            .into_iter()
            .map(|y| eval_binary_op(op, l.clone(), y))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (Value::Text(a), Value::Text(b)) if op == BinaryOperator::Addition => {
            Ok(Value::Text(format!("{}{}", a, b)))
        }
        (l, r) => numeric_binop(op, l, r),
    }
}

fn numeric_binop(op: BinaryOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    use BinaryOperator::*;

    match (left, right) {
        (Value::Scalar(a), Value::Scalar(b)) => match op {
            Addition => Ok(Value::Scalar(a + b)),
            Subtraction => Ok(Value::Scalar(a - b)),
            Multiplication => Ok(Value::Scalar(a * b)),
            Division => {
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Scalar(a / b))
            }
            Power => Ok(Value::Scalar(a.powf(b))),
        },
        (Value::Quantity(q), Value::Scalar(s)) => match op {
            Multiplication => Ok(Value::Quantity(q.scale(s))),
            Division => {
                if s == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Quantity(q.scale(1.0 / s)))
            }
            Power => quantity_power(&q, s),
            Addition | Subtraction => Err(EvalError::IncompatibleUnits {
                left: q.label(),
                right: "dimensionless".to_string(),
            }),
        },
        (Value::Scalar(s), Value::Quantity(q)) => match op {
            Multiplication => Ok(Value::Quantity(q.scale(s))),
            Division => {
                if q.si == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                dimensionless(s).div(&q).map(collapse)
            }
            Power => Err(EvalError::TypeError {
                expected: "dimensionless exponent".to_string(),
                got: q.label(),
            }),
            Addition | Subtraction => Err(EvalError::IncompatibleUnits {
                left: "dimensionless".to_string(),
                right: q.label(),
            }),
        },
        (Value::Quantity(a), Value::Quantity(b)) => match op {
            Addition => a.add(&b, 1.0).map(Value::Quantity),
            Subtraction => a.add(&b, -1.0).map(Value::Quantity),
            Multiplication => a.mul(&b).map(collapse),
            Division => {
                if b.si == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                a.div(&b).map(collapse)
            }
            Power => Err(EvalError::TypeError {
                expected: "dimensionless exponent".to_string(),
                got: b.label(),
            }),
        },
        (l, r) => {
            let offender = if matches!(l, Value::Text(_)) { l } else { r };
            Err(type_error("Scalar or Quantity", &offender))
        }
    }
}

fn quantity_power(q: &Quantity, exponent: f64) -> Result<Value, EvalError> {
    if exponent == 0.5 {
        return q.sqrt().map(collapse);
    }
    if exponent.fract() != 0.0 || exponent.abs() > 64.0 {
        return Err(EvalError::TypeError {
            expected: "integer exponent for a quantity".to_string(),
            got: exponent.to_string(),
        });
    }
    q.powi(exponent as i32).map(collapse)
}

fn index_value(target: &Value, index: &Value) -> Result<Value, EvalError> {
    let Value::Array(items) = target else {
        return Err(type_error("Array", target));
    };
    let Value::Scalar(raw) = index else {
        return Err(type_error("integer index", index));
    };
    if raw.fract() != 0.0 {
        return Err(EvalError::TypeError {
            expected: "integer index".to_string(),
            got: raw.to_string(),
        });
    }
    let i = *raw as i64;
    let resolved = if i < 0 { items.len() as i64 + i } else { i };
    if resolved < 0 || resolved as usize >= items.len() {
        return Err(EvalError::IndexOutOfBounds {
            index: i,
            len: items.len(),
        });
    }
    Ok(items[resolved as usize].clone())
}

// ---------------------------------------------------------------------------
// Builtin functions
// ---------------------------------------------------------------------------

fn expect_arity(function: &str, args: &[Value], range: Range<usize>) -> Result<(), EvalError> {
    if range.contains(&args.len()) {
        return Ok(());
    }
    let expected = if range.end - range.start == 1 {
        range.start.to_string()
    } else {
        format!("{} to {}", range.start, range.end - 1)
    };
    Err(EvalError::Arity {
        function: function.to_string(),
        expected,
        got: args.len(),
    })
}

fn call_builtin(name: &str, span: &Range<usize>, mut args: Vec<Value>) -> Result<Value, EvalError> {
    let scalar_fn: Option<fn(f64) -> f64> = match name {
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        "asin" => Some(f64::asin),
        "acos" => Some(f64::acos),
        "atan" => Some(f64::atan),
        "exp" => Some(f64::exp),
        "ln" | "log" => Some(f64::ln),
        "log10" => Some(f64::log10),
        _ => None,
    };
    if let Some(f) = scalar_fn {
        expect_arity(name, &args, 1..2)?;
        return map_numeric(args.remove(0), &|v| match v {
            Value::Scalar(n) => Ok(Value::Scalar(f(n))),
            other => Err(type_error("dimensionless Scalar", &other)),
        });
    }

    match name {
        "sqrt" => {
            expect_arity(name, &args, 1..2)?;
            map_numeric(args.remove(0), &|v| match v {
                Value::Scalar(n) => Ok(Value::Scalar(n.sqrt())),
                Value::Quantity(q) => q.sqrt().map(collapse),
                other => Err(type_error("Scalar or Quantity", &other)),
            })
        }
        "abs" => {
            expect_arity(name, &args, 1..2)?;
            map_numeric(args.remove(0), &|v| match v {
                Value::Scalar(n) => Ok(Value::Scalar(n.abs())),
                Value::Quantity(q) => Ok(Value::Quantity(Quantity { si: q.si.abs(), ..q })),
                other => Err(type_error("Scalar or Quantity", &other)),
            })
        }
        "floor" | "ceil" | "round" => {
            expect_arity(name, &args, 1..3)?;
            let digits = match args.get(1) {
                Some(Value::Scalar(d)) => *d as i32,
                Some(other) => return Err(type_error("Scalar", other)),
                None => 0,
            };
            let scale = 10f64.powi(digits);
            let op: fn(f64) -> f64 = match name {
                "floor" => f64::floor,
                "ceil" => f64::ceil,
                _ => f64::round,
            };
            let rounded = move |n: f64| op(n * scale) / scale;
            map_numeric(args.remove(0), &|v| match v {
                Value::Scalar(n) => Ok(Value::Scalar(rounded(n))),
                // Rounding applies to the displayed magnitude
                Value::Quantity(q) => {
                    let shown = rounded(q.display_value());
                    Ok(Value::Quantity(Quantity {
                        si: shown * q.unit.factor,
                        ..q
                    }))
                }
                other => Err(type_error("Scalar or Quantity", &other)),
            })
        }
        "min" | "max" => {
            let items = spread(name, args)?;
            let mut best: Option<Value> = None;
            for item in items {
                best = Some(match best {
                    None => item,
                    Some(current) => {
                        let ordering = compare(&item, &current)?;
                        let better = if name == "min" {
                            ordering == std::cmp::Ordering::Less
                        } else {
                            ordering == std::cmp::Ordering::Greater
                        };
                        if better { item } else { current }
                    }
                });
            }
            best.ok_or_else(|| EvalError::Arity {
                function: name.to_string(),
                expected: "at least 1".to_string(),
                got: 0,
            })
        }
        "sum" => {
            let items = spread(name, args)?;
            let mut iter = items.into_iter();
            let Some(first) = iter.next() else {
                return Ok(Value::Scalar(0.0));
            };
            iter.try_fold(first, |acc, v| eval_binary_op(BinaryOperator::Addition, acc, v))
        }
        "len" => {
            expect_arity(name, &args, 1..2)?;
            match &args[0] {
                Value::Array(items) => Ok(Value::Scalar(items.len() as f64)),
                Value::Text(s) => Ok(Value::Scalar(s.chars().count() as f64)),
                other => Err(type_error("Array", other)),
            }
        }
        _ => Err(EvalError::UnknownFunction {
            name: name.to_string(),
            span: span.clone(),
        }),
    }
}

/// `f([a, b, c])` and `f(a, b, c)` both operate over a, b, c.
fn spread(name: &str, mut args: Vec<Value>) -> Result<Vec<Value>, EvalError> {
    if args.is_empty() {
        return Err(EvalError::Arity {
            function: name.to_string(),
            expected: "at least 1".to_string(),
            got: 0,
        });
    }
    if args.len() == 1
        && let Value::Array(items) = &mut args[0]
    {
        return Ok(std::mem::take(items));
    }
    Ok(args)
}

fn compare(a: &Value, b: &Value) -> Result<std::cmp::Ordering, EvalError> {
    let (x, y) = match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => (*x, *y),
        (Value::Quantity(p), Value::Quantity(q)) => {
            if p.dim != q.dim {
                return Err(EvalError::IncompatibleUnits {
                    left: p.label(),
                    right: q.label(),
                });
            }
            (p.si, q.si)
        }
        (Value::Scalar(_), other) | (other, _) => return Err(type_error("Scalar", other)),
    };
    Ok(x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(text: &str, env: &Environment) -> Result<Value, EvalError> {
        evaluate(&parse_expression(text, 0).unwrap(), env)
    }

    fn scalar(text: &str) -> f64 {
        match eval_str(text, &Environment::new()).unwrap() {
            Value::Scalar(n) => n,
            other => panic!("expected scalar, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(scalar("2 + 3 * 4"), 14.0);
        assert_eq!(scalar("(2 + 3) * 4"), 20.0);
        assert_eq!(scalar("2^3^2"), 512.0);
        assert_eq!(scalar("-2^2"), -4.0);
    }

    #[test]
    fn variables_resolve_before_constants() {
        let mut env = Environment::new();
        assert!((scalar("pi") - std::f64::consts::PI).abs() < 1e-12);
        env.set("e", Value::Scalar(2.0), "");
        assert_eq!(eval_str("e * 3", &env).unwrap(), Value::Scalar(6.0));
    }

    #[test]
    fn undefined_variables_carry_spans() {
        let err = eval_str("1 + missing", &Environment::new()).unwrap_err();
        assert_eq!(
            err,
            EvalError::UndefinedVariable { name: "missing".into(), span: 4..11 }
        );
    }

    #[test]
    fn units_multiply_into_quantities() {
        let value = eval_str("10.1 * IN", &Environment::new()).unwrap();
        assert_eq!(value.format(3, false), "10.100 in");
        let area = eval_str("2*FT * 3*FT", &Environment::new()).unwrap();
        assert_eq!(area.format(1, false), "6.0 ft^2");
    }

    #[test]
    fn cancelled_units_collapse_to_scalars() {
        assert!((scalar("6*IN / (1*FT)") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn mismatched_units_cannot_be_added() {
        let err = eval_str("1*FT + 1*KIPS", &Environment::new()).unwrap_err();
        assert!(matches!(err, EvalError::IncompatibleUnits { .. }));
    }

    #[test]
    fn arrays_broadcast() {
        let value = eval_str("[1, 2, 3] * 2 + [1, 1, 1]", &Environment::new()).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::Scalar(3.0), Value::Scalar(5.0), Value::Scalar(7.0)])
        );
        assert_eq!(scalar("[4, 5, 6][-1]"), 6.0);
        assert!(matches!(
            eval_str("[1][3]", &Environment::new()),
            Err(EvalError::IndexOutOfBounds { index: 3, len: 1 })
        ));
    }

    #[test]
    fn builtins() {
        assert_eq!(scalar("sqrt(16)"), 4.0);
        assert_eq!(scalar("max(1, 7, 3)"), 7.0);
        assert_eq!(scalar("min([4, 2, 9])"), 2.0);
        assert_eq!(scalar("sum([1, 2, 3])"), 6.0);
        assert_eq!(scalar("len([1, 2, 3])"), 3.0);
        assert_eq!(scalar("round(2.346, 2)"), 2.35);
        assert_eq!(scalar("floor(2.9)"), 2.0);
        assert!((scalar("log10(1000)") - 3.0).abs() < 1e-12);
    }

    #[test]
    fn builtin_errors() {
        let env = Environment::new();
        assert!(matches!(eval_str("frob(1)", &env), Err(EvalError::UnknownFunction { .. })));
        assert!(matches!(eval_str("sqrt(1, 2)", &env), Err(EvalError::Arity { .. })));
        assert!(matches!(eval_str("1 / 0", &env), Err(EvalError::DivisionByZero)));
        assert!(matches!(eval_str("sin(1*FT)", &env), Err(EvalError::TypeError { .. })));
    }

    #[test]
    fn conversion_to_a_written_unit() {
        let moment = eval_str("2*KIPS * 6*IN", &Environment::new()).unwrap();
        let converted = convert(moment, "FT_KIPS").unwrap();
        assert_eq!(converted.format(2, false), "1.00 ft-kips");
        assert!(convert(Value::Scalar(1.0), "FT").is_err());
    }
}
