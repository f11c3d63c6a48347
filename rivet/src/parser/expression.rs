use std::ops::Range;

use crate::expr::{BinaryOperator, Expr, Symbolic, UnaryOperator};
use crate::parser::error::ParseError;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    // Literals
    Number(f64, String),

    // Identifiers
    Ident(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret, // ^ or **
    Eq,
    Comma,

    // Grouping
    LParen,
    RParen,
    LBracket,
    RBracket,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a single calculation expression such as `b * h^2 / 6`.
pub fn parse_expression(text: &str, file_id: usize) -> Result<Expr, ParseError> {
    let tokens = tokenize_text(text, file_id)?;
    let mut parser = ExprParser::new(tokens, text.len(), file_id);
    let expr = parser.parse_expr(0)?;
    if !parser.at_end() {
        return Err(parser.error("unexpected tokens after expression"));
    }
    Ok(expr)
}

/// Parse an expression or a one-`=` equation (`M = w*L^2/8`).
pub fn parse_symbolic(text: &str, file_id: usize) -> Result<Symbolic, ParseError> {
    let tokens = tokenize_text(text, file_id)?;
    parse_symbolic_tokens(tokens, text.len(), file_id)
}

pub(crate) fn parse_symbolic_tokens(
    tokens: Vec<(Token, Range<usize>)>,
    text_len: usize,
    file_id: usize,
) -> Result<Symbolic, ParseError> {
    let eq_positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, (t, _))| *t == Token::Eq)
        .map(|(i, _)| i)
        .collect();

    match eq_positions.as_slice() {
        [] => {
            let mut parser = ExprParser::new(tokens, text_len, file_id);
            let expr = parser.parse_expr(0)?;
            if !parser.at_end() {
                return Err(parser.error("unexpected tokens after expression"));
            }
            Ok(Symbolic::Expression(expr))
        }
        [split] => {
            let mut lhs_tokens = tokens;
            let mut rhs_tokens = lhs_tokens.split_off(*split);
            rhs_tokens.remove(0);

            let mut lhs_parser = ExprParser::new(lhs_tokens, text_len, file_id);
            let lhs = lhs_parser.parse_expr(0)?;
            if !lhs_parser.at_end() {
                return Err(lhs_parser.error("unexpected tokens before '='"));
            }
            let mut rhs_parser = ExprParser::new(rhs_tokens, text_len, file_id);
            let rhs = rhs_parser.parse_expr(0)?;
            if !rhs_parser.at_end() {
                return Err(rhs_parser.error("unexpected tokens after expression"));
            }
            Ok(Symbolic::Equation { lhs, rhs })
        }
        [_, second, ..] => {
            let span = tokens[*second].1.clone();
            Err(ParseError::error("more than one '=' in equation", span, file_id))
        }
    }
}

// ---------------------------------------------------------------------------
// Text tokenizer: raw text string → Token stream
// ---------------------------------------------------------------------------

pub(crate) fn tokenize_text(
    text: &str,
    file_id: usize,
) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    // Map character indices to byte offsets within the text
    let byte_pos: Vec<usize> = {
        let mut bp = Vec::with_capacity(len + 1);
        let mut offset = 0;
        for c in &chars {
            bp.push(offset);
            offset += c.len_utf8();
        }
        bp.push(offset);
        bp
    };

    while i < len {
        let c = chars[i];
        let start = i;
        let token = match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
                continue;
            }

            // Numbers, including a leading '.' and an exponent part
            '0'..='9' | '.' if c != '.' || chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()) => {
                while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < len && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < len && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < len && chars[j].is_ascii_digit() {
                        while j < len && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let num_str: String = chars[start..i].iter().collect();
                match num_str.parse::<f64>() {
                    Ok(n) => Token::Number(n, num_str),
                    Err(_) => {
                        return Err(ParseError::error(
                            format!("invalid number '{}'", num_str),
                            byte_pos[start]..byte_pos[i],
                            file_id,
                        ));
                    }
                }
            }

            // Identifiers (Greek letters arrive here from LaTeX translation)
            c if c.is_alphabetic() || c == '_' => {
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                Token::Ident(chars[start..i].iter().collect())
            }

            '*' => {
                i += 1;
                if i < len && chars[i] == '*' {
                    i += 1;
                    Token::Caret
                } else {
                    Token::Star
                }
            }

            // Single-character operators
            '+' => { i += 1; Token::Plus }
            '-' => { i += 1; Token::Minus }
            '/' => { i += 1; Token::Slash }
            '^' => { i += 1; Token::Caret }
            '=' => { i += 1; Token::Eq }
            ',' => { i += 1; Token::Comma }
            '(' => { i += 1; Token::LParen }
            ')' => { i += 1; Token::RParen }
            '[' => { i += 1; Token::LBracket }
            ']' => { i += 1; Token::RBracket }

            other => {
                return Err(ParseError::error(
                    format!("unexpected character '{}'", other),
                    byte_pos[start]..byte_pos[start + 1],
                    file_id,
                ));
            }
        };
        tokens.push((token, byte_pos[start]..byte_pos[i]));
    }

    Ok(tokens)
}

/// Insert explicit `*` where two operands are written side by side, as in
/// typeset math (`2x`, `a(b+c)`, `(a)(b)`). Identifiers in `functions` keep
/// their call syntax.
pub(crate) fn insert_implicit_products(
    tokens: &mut Vec<(Token, Range<usize>)>,
    functions: &[&str],
) {
    let mut i = 0;
    while i + 1 < tokens.len() {
        let ends_operand = match &tokens[i].0 {
            Token::Number(..) | Token::RParen | Token::RBracket => true,
            Token::Ident(name) => !functions.contains(&name.as_str()),
            _ => false,
        };
        let starts_operand = matches!(
            tokens[i + 1].0,
            Token::Number(..) | Token::Ident(_) | Token::LParen
        );
        if ends_operand && starts_operand {
            let at = tokens[i + 1].1.start;
            tokens.insert(i + 1, (Token::Star, at..at));
            i += 2;
        } else {
            i += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Token kind (for matching without payloads)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind {
    Number,
    Ident,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Eq,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

fn token_kind(t: &Token) -> TokenKind {
    match t {
        Token::Number(..) => TokenKind::Number,
        Token::Ident(_) => TokenKind::Ident,
        Token::Plus => TokenKind::Plus,
        Token::Minus => TokenKind::Minus,
        Token::Star => TokenKind::Star,
        Token::Slash => TokenKind::Slash,
        Token::Caret => TokenKind::Caret,
        Token::Eq => TokenKind::Eq,
        Token::Comma => TokenKind::Comma,
        Token::LParen => TokenKind::LParen,
        Token::RParen => TokenKind::RParen,
        Token::LBracket => TokenKind::LBracket,
        Token::RBracket => TokenKind::RBracket,
    }
}

fn describe(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Number => "number",
        TokenKind::Ident => "identifier",
        TokenKind::Plus => "'+'",
        TokenKind::Minus => "'-'",
        TokenKind::Star => "'*'",
        TokenKind::Slash => "'/'",
        TokenKind::Caret => "'^'",
        TokenKind::Eq => "'='",
        TokenKind::Comma => "','",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::LBracket => "'['",
        TokenKind::RBracket => "']'",
    }
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

struct ExprParser {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    text_len: usize,
    file_id: usize,
}

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
const BP_ADDITIVE: u8 = 12; // + -
const BP_MULTIPLICATIVE: u8 = 14; // * /
const BP_UNARY: u8 = 16; // - +
const BP_POWER: u8 = 18; // ^
const BP_POSTFIX: u8 = 20; // v[i]

impl ExprParser {
    fn new(tokens: Vec<(Token, Range<usize>)>, text_len: usize, file_id: usize) -> Self {
        ExprParser {
            tokens,
            pos: 0,
            text_len,
            file_id,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(token_kind)
    }

    fn advance(&mut self) -> Option<(Token, Range<usize>)> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Span of the current token, or the end of the text when exhausted.
    fn current_span(&self) -> Range<usize> {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.clone(),
            None => self.text_len..self.text_len,
        }
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::error(msg, self.current_span(), self.file_id)
    }

    fn expect_token_kind(&mut self, kind: TokenKind) -> Result<Range<usize>, ParseError> {
        match self.tokens.get(self.pos) {
            Some((t, span)) if token_kind(t) == kind => {
                let span = span.clone();
                self.pos += 1;
                Ok(span)
            }
            _ => Err(self.error(format!("expected {}", describe(kind)))),
        }
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix()?;

        loop {
            let Some(kind) = self.peek_kind() else { break };

            // Postfix indexing binds tighter than everything else
            if kind == TokenKind::LBracket {
                if BP_POSTFIX < min_bp {
                    break;
                }
                self.advance();
                let index = self.parse_expr(0)?;
                self.expect_token_kind(TokenKind::RBracket)?;
                left = Expr::Index {
                    target: Box::new(left),
                    index: Box::new(index),
                };
                continue;
            }

            let Some((l_bp, r_bp)) = infix_bp(kind) else { break };

            if l_bp < min_bp {
                break;
            }

            self.advance();
            let right = self.parse_expr(r_bp)?;

            let operator = match kind {
                TokenKind::Plus => BinaryOperator::Addition,
                TokenKind::Minus => BinaryOperator::Subtraction,
                TokenKind::Star => BinaryOperator::Multiplication,
                TokenKind::Slash => BinaryOperator::Division,
                TokenKind::Caret => BinaryOperator::Power,
                _ => return Err(self.error("unexpected infix operator")),
            };

            left = Expr::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let (token, span) = self
            .advance()
            .ok_or_else(|| self.error("unexpected end of expression"))?;

        match token {
            Token::Number(value, text) => Ok(Expr::Number { value, text }),

            // Variable or function call
            Token::Ident(name) => {
                if self.peek_kind() == Some(TokenKind::LParen) {
                    self.advance();
                    let arguments = self.parse_list(TokenKind::RParen)?;
                    let end = self.tokens[self.pos - 1].1.end;
                    Ok(Expr::Call {
                        function: name,
                        arguments,
                        span: span.start..end,
                    })
                } else {
                    Ok(Expr::Variable(name, span))
                }
            }

            // Unary operators
            Token::Minus => {
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expr::Unary {
                    operator: UnaryOperator::Negation,
                    operand: Box::new(operand),
                })
            }
            Token::Plus => {
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expr::Unary {
                    operator: UnaryOperator::Plus,
                    operand: Box::new(operand),
                })
            }

            // Parenthesized expression
            Token::LParen => {
                let expr = self.parse_expr(0)?;
                self.expect_token_kind(TokenKind::RParen)?;
                Ok(Expr::Group(Box::new(expr)))
            }

            // Array literal
            Token::LBracket => Ok(Expr::Array(self.parse_list(TokenKind::RBracket)?)),

            other => Err(ParseError::error(
                format!("unexpected {}", describe(token_kind(&other))),
                span,
                self.file_id,
            )),
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_list(&mut self, close: TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.peek_kind() == Some(close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr(0)?);
            match self.peek_kind() {
                Some(TokenKind::Comma) => {
                    self.advance();
                }
                Some(k) if k == close => {
                    self.advance();
                    return Ok(items);
                }
                _ => {
                    return Err(self.error(format!("expected ',' or {}", describe(close))));
                }
            }
        }
    }
}

/// Infix binding powers: returns (left_bp, right_bp) or None if not infix.
fn infix_bp(kind: TokenKind) -> Option<(u8, u8)> {
    match kind {
        TokenKind::Plus | TokenKind::Minus => Some((BP_ADDITIVE, BP_ADDITIVE + 1)),
        TokenKind::Star | TokenKind::Slash => Some((BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1)),
        TokenKind::Caret => Some((BP_POWER, BP_POWER)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expr {
        parse_expression(text, 0).unwrap()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse("a + b * c");
        let Expr::Binary { operator, right, .. } = expr else {
            panic!("expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Addition);
        assert!(matches!(
            *right,
            Expr::Binary { operator: BinaryOperator::Multiplication, .. }
        ));
    }

    #[test]
    fn power_is_right_associative() {
        let expr = parse("2^3^2");
        let Expr::Binary { left, right, .. } = expr else {
            panic!("expected binary expression");
        };
        assert!(matches!(*left, Expr::Number { value, .. } if value == 2.0));
        assert!(matches!(*right, Expr::Binary { operator: BinaryOperator::Power, .. }));
    }

    #[test]
    fn double_star_is_power() {
        assert_eq!(parse("x**2"), parse("x^2"));
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        let expr = parse("-x^2");
        assert!(matches!(
            expr,
            Expr::Unary { operator: UnaryOperator::Negation, ref operand }
                if matches!(**operand, Expr::Binary { operator: BinaryOperator::Power, .. })
        ));
    }

    #[test]
    fn calls_arrays_and_indexing() {
        let expr = parse("max([1, 2, 3][0], sqrt(x))");
        let Expr::Call { function, arguments, .. } = expr else {
            panic!("expected call");
        };
        assert_eq!(function, "max");
        assert_eq!(arguments.len(), 2);
        assert!(matches!(arguments[0], Expr::Index { .. }));
    }

    #[test]
    fn exponent_literals_keep_their_spelling() {
        let expr = parse("1.5e3");
        assert_eq!(expr, Expr::Number { value: 1500.0, text: "1.5e3".into() });
        assert_eq!(parse("2*e").variables(), vec!["e"]);
    }

    #[test]
    fn symbolic_splits_on_single_equals() {
        let sym = parse_symbolic("M = w*L^2/8", 0).unwrap();
        let Symbolic::Equation { lhs, rhs } = sym else {
            panic!("expected equation");
        };
        assert_eq!(lhs.variables(), vec!["M"]);
        assert_eq!(rhs.variables(), vec!["w", "L"]);
        assert!(parse_symbolic("a = b = c", 0).is_err());
    }

    #[test]
    fn unknown_character_reports_its_span() {
        let err = parse_expression("a + $b", 0).unwrap_err();
        assert_eq!(err.span, 4..5);
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(parse_expression("a b", 0).is_err());
        assert!(parse_expression("(a", 0).is_err());
    }

    #[test]
    fn implicit_products_skip_function_calls() {
        let mut tokens = tokenize_text("2x sqrt(y)(z)", 0).unwrap();
        insert_implicit_products(&mut tokens, &["sqrt"]);
        let kinds: Vec<_> = tokens.iter().map(|(t, _)| token_kind(t)).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Number,
                TokenKind::Star,
                TokenKind::Ident,
                TokenKind::Star,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::Star,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen,
            ]
        );
    }
}
