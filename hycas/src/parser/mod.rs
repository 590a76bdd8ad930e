//! Text to expression tree.
//!
//! Role
//! - Precedence-climbing parser over the tokens of [`tokenizer`]. It builds the raw tree
//!   (explicit parentheses, binary left-nested operator chains) through the pool builders.
//! - On error the whole input is rejected; nodes built so far are released as their handles
//!   drop.
//!
//! Example
//! ```rust
//! use hycas::{Pool, expr::variant::ExprType};
//! let pool = Pool::new();
//! let tree = pool.parse("2x^2+1").unwrap();
//! assert_eq!(tree.kind(), ExprType::Addition);
//! assert!(pool.parse("1=2=3").is_err());
//! ```

pub mod error;
pub mod tokenizer;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;

use crate::{
    expr::{
        Expression,
        variant::{ConstantKind, ExprType, MAX_IDENTIFIER_LENGTH, is_reserved_name, reserved_function},
    },
    pool::{Payload, Pool, PoolResult},
};

pub use error::{ParserError, ParserResult};
use tokenizer::{EXPONENT_MARKER, Token, TokenKind, Tokenizer};

/// Deepest tree the parser accepts.
pub const MAX_TREE_DEPTH: usize = 256;
const MAX_RECURSION_DEPTH: usize = 128;

/// Binding strength of infix operators, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Store,
    Comparison,
    Plus,
    Minus,
    Times,
    Slash,
    ImplicitTimes,
    Power,
    Factorial,
}

fn infix_precedence(kind: TokenKind) -> Option<Precedence> {
    match kind {
        TokenKind::Plus => Some(Precedence::Plus),
        TokenKind::Minus => Some(Precedence::Minus),
        TokenKind::Times => Some(Precedence::Times),
        TokenKind::Slash => Some(Precedence::Slash),
        TokenKind::Caret => Some(Precedence::Power),
        TokenKind::Bang => Some(Precedence::Factorial),
        TokenKind::Comparison(_) => Some(Precedence::Comparison),
        kind if kind.starts_operand() => Some(Precedence::ImplicitTimes),
        _ => None,
    }
}

/// Parse `text` into `pool`.
pub fn parse(pool: &Pool, text: &str) -> ParserResult<Expression> {
    Parser::new(pool, text).parse()
}

impl Pool {
    pub fn parse(&self, text: &str) -> ParserResult<Expression> {
        parse(self, text)
    }
}

pub struct Parser<'a> {
    pool: &'a Pool,
    text: &'a str,
    tokenizer: Tokenizer<'a>,
    current: Token<'a>,
    previous: TokenKind,
    previous_end: usize,
    last_argument_count: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(pool: &'a Pool, text: &'a str) -> Self {
        let mut tokenizer = Tokenizer::new(text);
        let current = tokenizer.pop_token();
        Self {
            pool,
            text,
            tokenizer,
            current,
            previous: TokenKind::EndOfStream,
            previous_end: 0,
            last_argument_count: 0,
            depth: 0,
        }
    }

    fn advance(&mut self) -> Token<'a> {
        let next = self.tokenizer.pop_token();
        let token = std::mem::replace(&mut self.current, next);
        self.previous = token.kind;
        self.previous_end = token.span.end;
        token
    }

    fn unexpected(&self) -> ParserError {
        let span = self.current.span.clone();
        match self.current.kind {
            TokenKind::Undefined => ParserError::InvalidToken { text: self.current.text.into(), span },
            TokenKind::EndOfStream => {
                ParserError::UnexpectedToken { found: "end of input".into(), span }
            }
            _ => ParserError::UnexpectedToken { found: format!("`{}`", self.current.text), span },
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParserResult<Token<'a>> {
        if self.current.kind == kind { Ok(self.advance()) } else { Err(self.unexpected()) }
    }

    fn allocation<T>(&self, result: PoolResult<T>) -> ParserResult<T> {
        result.map_err(|source| ParserError::AllocationFailure { source, span: self.current.span.clone() })
    }

    pub fn parse(mut self) -> ParserResult<Expression> {
        let value = self.parse_until(Precedence::Store)?;
        let result = if self.current.kind == TokenKind::Store {
            let arrow = self.advance();
            if value.kind() == ExprType::Comparison {
                return Err(ParserError::InvalidStoreTarget { span: arrow.span });
            }
            let target = self.parse_store_target()?;
            self.allocation(self.pool.operator(ExprType::Store, [value, target]))?
        } else {
            value
        };

        if self.current.kind != TokenKind::EndOfStream {
            return Err(self.unexpected());
        }
        if result.depth() > MAX_TREE_DEPTH {
            return Err(ParserError::NestingTooDeep { span: 0..self.text.len() });
        }
        Ok(result)
    }

    fn parse_until(&mut self, stop: Precedence) -> ParserResult<Expression> {
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(ParserError::NestingTooDeep { span: self.current.span.clone() });
        }
        self.depth += 1;
        let result = self.parse_operators(stop);
        self.depth -= 1;
        result
    }

    fn parse_operators(&mut self, stop: Precedence) -> ParserResult<Expression> {
        let mut lhs = self.parse_prefix(stop)?;
        loop {
            let kind = self.current.kind;
            let Some(precedence) = infix_precedence(kind) else {
                break;
            };
            if precedence <= stop {
                break;
            }

            lhs = match kind {
                TokenKind::Plus => self.binary(lhs, ExprType::Addition, Precedence::Plus)?,
                TokenKind::Minus => self.binary(lhs, ExprType::Subtraction, Precedence::Minus)?,
                TokenKind::Times => self.binary(lhs, ExprType::Multiplication, Precedence::Times)?,
                TokenKind::Slash => self.binary(lhs, ExprType::Division, Precedence::Slash)?,
                // Right-associative; the exponent stops at implicit multiplication.
                TokenKind::Caret => self.binary(lhs, ExprType::Power, Precedence::ImplicitTimes)?,
                TokenKind::Bang => {
                    self.advance();
                    self.allocation(self.pool.operator(ExprType::Factorial, [lhs]))?
                }
                TokenKind::Comparison(operator) => {
                    if lhs.kind() == ExprType::Comparison {
                        return Err(ParserError::ChainedComparison { span: self.current.span.clone() });
                    }
                    self.advance();
                    let rhs = self.parse_until(Precedence::Comparison)?;
                    self.allocation(self.pool.comparison(operator, lhs, rhs))?
                }
                _ => {
                    if kind == TokenKind::Number && self.previous == TokenKind::Number {
                        return Err(self.unexpected());
                    }
                    let rhs = self.parse_until(Precedence::ImplicitTimes)?;
                    self.allocation(self.pool.operator(ExprType::Multiplication, [lhs, rhs]))?
                }
            };
        }
        Ok(lhs)
    }

    fn binary(&mut self, lhs: Expression, kind: ExprType, precedence: Precedence) -> ParserResult<Expression> {
        self.advance();
        let rhs = self.parse_until(precedence)?;
        self.allocation(self.pool.operator(kind, [lhs, rhs]))
    }

    fn parse_prefix(&mut self, stop: Precedence) -> ParserResult<Expression> {
        match self.current.kind {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_until(stop.max(Precedence::Minus))?;
                self.allocation(self.pool.operator(ExprType::Opposite, [operand]))
            }
            TokenKind::Number => {
                let token = self.advance();
                let (kind, payload) = number_payload(token.text);
                self.allocation(self.pool.leaf(kind, payload))
            }
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::ReservedFunction => self.parse_reserved_function(),
            TokenKind::LeftParenthesis => {
                self.advance();
                let inner = self.parse_until(Precedence::Store)?;
                self.expect(TokenKind::RightParenthesis)?;
                self.allocation(self.pool.operator(ExprType::Parenthesis, [inner]))
            }
            TokenKind::LeftBracket => self.parse_matrix(),
            TokenKind::LeftBrace => self.parse_list(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_identifier(&mut self) -> ParserResult<Expression> {
        let token = self.advance();
        let name = token.text;
        if let Some(constant) = ConstantKind::from_symbol(name) {
            return self.allocation(self.pool.constant(constant));
        }
        match name {
            "inf" => return self.allocation(self.pool.infinity(false)),
            "undef" => return self.allocation(self.pool.undefined()),
            "nonreal" => return self.allocation(self.pool.nonreal()),
            _ => {}
        }
        if name.chars().count() > MAX_IDENTIFIER_LENGTH {
            return Err(ParserError::IdentifierTooLong {
                name: name.into(),
                max: MAX_IDENTIFIER_LENGTH,
                span: token.span,
            });
        }
        if matches!(name, "u" | "v" | "w") {
            return Err(ParserError::ReservedName { name: name.into(), span: token.span });
        }
        if self.current.kind == TokenKind::LeftParenthesis && name != "ans" {
            return self.parse_user_function(token);
        }
        self.allocation(self.pool.symbol(name))
    }

    fn parse_user_function(&mut self, name: Token<'a>) -> ParserResult<Expression> {
        self.advance();
        let arguments = self.parse_arguments()?;
        let span = name.span.start..self.previous_end;
        let Ok([argument]) = <[Expression; 1]>::try_from(arguments) else {
            return Err(ParserError::ArityMismatch {
                name: name.text.into(),
                expected: "1".into(),
                found: self.last_argument_count,
                span,
            });
        };
        if argument.kind() == ExprType::Symbol && argument.name().as_deref() == Some(name.text) {
            return Err(ParserError::RecursiveFunctionArgument { name: name.text.into(), span });
        }
        self.allocation(self.pool.function(name.text, argument))
    }

    /// Comma-separated arguments, the opening parenthesis already consumed.
    fn parse_arguments(&mut self) -> ParserResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        if self.current.kind == TokenKind::RightParenthesis {
            self.advance();
        } else {
            loop {
                arguments.push(self.parse_until(Precedence::Store)?);
                match self.current.kind {
                    TokenKind::Comma => {
                        self.advance();
                    }
                    TokenKind::RightParenthesis => {
                        self.advance();
                        break;
                    }
                    _ => return Err(self.unexpected()),
                }
            }
        }
        self.last_argument_count = arguments.len();
        Ok(arguments)
    }

    fn parse_reserved_function(&mut self) -> ParserResult<Expression> {
        let token = self.advance();
        let Some(info) = reserved_function(token.text) else {
            return Err(ParserError::UnexpectedToken { found: format!("`{}`", token.text), span: token.span });
        };

        if info.kind == ExprType::CommonLogarithm && self.current.kind == TokenKind::Underscore {
            return self.parse_logarithm_with_subscript(token);
        }

        if self.current.kind != TokenKind::LeftParenthesis {
            return Err(ParserError::ExpectedArguments { name: token.text.into(), span: token.span });
        }
        self.advance();
        let arguments = self.parse_arguments()?;
        let span = token.span.start..self.previous_end;
        if arguments.len() != info.min_arity && arguments.len() != info.max_arity {
            let expected = if info.min_arity == info.max_arity {
                info.min_arity.to_string()
            } else {
                format!("{} or {}", info.min_arity, info.max_arity)
            };
            return Err(ParserError::ArityMismatch {
                name: token.text.into(),
                expected,
                found: arguments.len(),
                span,
            });
        }

        let kind = match (info.kind, arguments.len()) {
            (ExprType::CommonLogarithm, 2) => ExprType::Logarithm,
            (ExprType::Sum, 1) => ExprType::ListSum,
            (kind, _) => kind,
        };
        if kind.is_parametered() {
            let variable = &arguments[1];
            let valid = variable.kind() == ExprType::Symbol
                && variable.name().is_some_and(|name| !is_reserved_name(&name));
            if !valid {
                return Err(ParserError::ParameterNotSymbol { name: token.text.into(), span });
            }
        }
        self.allocation(self.pool.operator(kind, arguments))
    }

    /// `log_{base}(argument)`, positioned on the underscore.
    fn parse_logarithm_with_subscript(&mut self, token: Token<'a>) -> ParserResult<Expression> {
        self.advance();
        self.expect(TokenKind::LeftBrace)?;
        let base = self.parse_until(Precedence::Store)?;
        self.expect(TokenKind::RightBrace)?;
        if self.current.kind != TokenKind::LeftParenthesis {
            return Err(ParserError::ExpectedArguments { name: token.text.into(), span: token.span });
        }
        self.advance();
        let arguments = self.parse_arguments()?;
        let span = token.span.start..self.previous_end;
        let Ok([argument]) = <[Expression; 1]>::try_from(arguments) else {
            return Err(ParserError::ArityMismatch {
                name: token.text.into(),
                expected: "1".into(),
                found: self.last_argument_count,
                span,
            });
        };
        self.allocation(self.pool.operator(ExprType::Logarithm, [argument, base]))
    }

    /// `[[a,b][c,d]]`, rows optionally separated by commas.
    fn parse_matrix(&mut self) -> ParserResult<Expression> {
        let open = self.advance();
        let mut entries = Vec::new();
        let mut columns: Option<usize> = None;
        let mut rows = 0;
        loop {
            if self.current.kind != TokenKind::LeftBracket {
                if rows == 0 && self.current.kind == TokenKind::RightBracket {
                    return Err(ParserError::EmptyMatrix { span: open.span.start..self.current.span.end });
                }
                return Err(self.unexpected());
            }
            let row_start = self.advance().span.start;
            if self.current.kind == TokenKind::RightBracket {
                return Err(ParserError::EmptyMatrix { span: row_start..self.current.span.end });
            }

            let mut count = 0;
            loop {
                entries.push(self.parse_until(Precedence::Store)?);
                count += 1;
                match self.current.kind {
                    TokenKind::Comma => {
                        self.advance();
                    }
                    TokenKind::RightBracket => {
                        self.advance();
                        break;
                    }
                    _ => return Err(self.unexpected()),
                }
            }
            match columns {
                None => columns = Some(count),
                Some(expected) if expected != count => {
                    return Err(ParserError::RaggedMatrix { expected, span: row_start..self.previous_end });
                }
                Some(_) => {}
            }
            rows += 1;

            match self.current.kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBracket => {
                    self.advance();
                    break;
                }
                _ => {}
            }
        }
        self.allocation(self.pool.matrix(rows, columns.unwrap_or(0), entries))
    }

    /// `{a,b,c}`, possibly empty.
    fn parse_list(&mut self) -> ParserResult<Expression> {
        self.advance();
        let mut elements = Vec::new();
        if self.current.kind == TokenKind::RightBrace {
            self.advance();
            return self.allocation(self.pool.list(elements));
        }
        loop {
            elements.push(self.parse_until(Precedence::Store)?);
            match self.current.kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBrace => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected()),
            }
        }
        self.allocation(self.pool.list(elements))
    }

    fn parse_store_target(&mut self) -> ParserResult<Expression> {
        let span = self.current.span.clone();
        if self.current.kind != TokenKind::Identifier {
            return Err(ParserError::InvalidStoreTarget { span });
        }
        let token = self.advance();
        let name = token.text;
        if is_reserved_name(name) {
            return Err(ParserError::InvalidStoreTarget { span });
        }
        if name.chars().count() > MAX_IDENTIFIER_LENGTH {
            return Err(ParserError::IdentifierTooLong { name: name.into(), max: MAX_IDENTIFIER_LENGTH, span });
        }
        if self.current.kind != TokenKind::LeftParenthesis {
            return self.allocation(self.pool.symbol(name));
        }

        self.advance();
        let parameter = self.current.clone();
        let valid = parameter.kind == TokenKind::Identifier
            && !is_reserved_name(parameter.text)
            && parameter.text != name
            && parameter.text.chars().count() <= MAX_IDENTIFIER_LENGTH;
        if !valid {
            return Err(ParserError::InvalidStoreTarget { span: parameter.span });
        }
        self.advance();
        self.expect(TokenKind::RightParenthesis)?;
        let argument = self.allocation(self.pool.symbol(parameter.text))?;
        self.allocation(self.pool.function(name, argument))
    }
}

/// Kind and payload of a number token: integers (with an optional trailing point) are
/// rationals, anything with fractional digits or an exponent is a decimal.
fn number_payload(text: &str) -> (ExprType, Payload) {
    let (mantissa, exponent) = match text.split_once(EXPONENT_MARKER) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (text, None),
    };
    let (integer_part, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits: BigInt = format!("{integer_part}{fraction}").parse().unwrap_or_default();

    if exponent.is_none() && fraction.is_empty() {
        return (ExprType::Rational, Payload::Rational(BigRational::from_integer(digits)));
    }
    let exponent = exponent.map_or(0, parse_exponent);
    let scale = fraction.len() as i64 - exponent;
    (ExprType::Decimal, Payload::Decimal(BigDecimal::new(digits, scale)))
}

/// Exponents are clamped far beyond the range where decimals collapse to infinity or zero.
fn parse_exponent(text: &str) -> i64 {
    const LIMIT: i64 = 1_000_000_000;
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };
    let magnitude = digits.parse::<i64>().unwrap_or(LIMIT).min(LIMIT);
    if negative { -magnitude } else { magnitude }
}
