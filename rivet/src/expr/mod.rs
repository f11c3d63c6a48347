use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Arithmetic negation: -x
    Negation,
    /// Explicit sign: +x
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Power,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Addition => "+",
            BinaryOperator::Subtraction => "-",
            BinaryOperator::Multiplication => "*",
            BinaryOperator::Division => "/",
            BinaryOperator::Power => "^",
        }
    }
}

/// An expression AST node of the calculation grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal; `text` keeps the spelling used in the source.
    Number { value: f64, text: String },
    Variable(String, Range<usize>),
    /// `[a, b, c]`
    Array(Vec<Expr>),
    /// `f(a, b)`
    Call {
        function: String,
        arguments: Vec<Expr>,
        span: Range<usize>,
    },
    /// `v[i]`
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Parentheses as written.
    Group(Box<Expr>),
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::Number {
            value,
            text: value.to_string(),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into(), 0..0)
    }

    /// Strip any number of enclosing parentheses.
    pub fn ungrouped(&self) -> &Expr {
        match self {
            Expr::Group(inner) => inner.ungrouped(),
            other => other,
        }
    }

    /// Variable names in order of first appearance, without duplicates.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number { .. } => {}
            Expr::Variable(name, _) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Array(items) => items.iter().for_each(|e| e.collect_variables(names)),
            Expr::Call { arguments, .. } => {
                arguments.iter().for_each(|e| e.collect_variables(names))
            }
            Expr::Index { target, index } => {
                target.collect_variables(names);
                index.collect_variables(names);
            }
            Expr::Unary { operand, .. } => operand.collect_variables(names),
            Expr::Binary { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Expr::Group(inner) => inner.collect_variables(names),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number { text, .. } => write!(f, "{}", text),
            Expr::Variable(name, _) => write!(f, "{}", name),
            Expr::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expr::Call {
                function,
                arguments,
                ..
            } => {
                write!(f, "{}(", function)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Index { target, index } => write!(f, "{}[{}]", target, index),
            Expr::Unary { operator, operand } => match operator {
                UnaryOperator::Negation => write!(f, "-{}", operand),
                UnaryOperator::Plus => write!(f, "+{}", operand),
            },
            Expr::Binary {
                operator,
                left,
                right,
            } => match operator {
                BinaryOperator::Addition | BinaryOperator::Subtraction => {
                    write!(f, "{} {} {}", left, operator.symbol(), right)
                }
                _ => write!(f, "{}{}{}", left, operator.symbol(), right),
            },
            Expr::Group(inner) => write!(f, "({})", inner),
        }
    }
}

/// A symbolic form: either a bare expression or `lhs = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbolic {
    Expression(Expr),
    Equation { lhs: Expr, rhs: Expr },
}
