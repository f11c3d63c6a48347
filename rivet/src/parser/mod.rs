pub mod error;
pub mod expression;
pub mod latex;

pub use error::{ParseError, ParseErrorKind};
pub use expression::{parse_expression, parse_symbolic};
pub use latex::parse_latex;
