//! UTF-8 tokenizer.
//!
//! [`Tokenizer::pop_token`] consumes one token per call and keeps returning
//! [`TokenKind::EndOfStream`] once the input is exhausted. Malformed numbers and unknown
//! characters come back as [`TokenKind::Undefined`] tokens; the parser turns them into errors.

use std::ops::Range;

use crate::expr::variant::{ComparisonOperator, ConstantKind, reserved_function};

/// Exponent marker of decimal literals.
pub const EXPONENT_MARKER: char = 'ᴇ';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Identifier,
    ReservedFunction,
    Plus,
    Minus,
    Times,
    Slash,
    Caret,
    Bang,
    Comparison(ComparisonOperator),
    Store,
    Comma,
    LeftParenthesis,
    RightParenthesis,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Underscore,
    EndOfStream,
    Undefined,
}

impl TokenKind {
    /// Tokens that can open an operand.
    pub fn starts_operand(self) -> bool {
        matches!(
            self,
            TokenKind::Number
                | TokenKind::Identifier
                | TokenKind::ReservedFunction
                | TokenKind::LeftParenthesis
                | TokenKind::LeftBracket
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte range in the source text.
    pub span: Range<usize>,
}

pub struct Tokenizer<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn peek(&self) -> Option<char> {
        self.text[self.position..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.text[self.position..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_digits(&mut self) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.position += 1;
            count += 1;
        }
        count
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token { kind, text: &self.text[start..self.position], span: start..self.position }
    }

    pub fn pop_token(&mut self) -> Token<'a> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }

        let start = self.position;
        let Some(c) = self.bump() else {
            return self.token(TokenKind::EndOfStream, start);
        };

        let kind = match c {
            '0'..='9' | '.' => return self.pop_number(start),
            c if c.is_ascii_alphabetic() => return self.pop_identifier(start),
            'π' | 'ℯ' | '𝐢' => TokenKind::Identifier,
            '√' => TokenKind::ReservedFunction,
            '+' => TokenKind::Plus,
            '-' if self.eat('>') => TokenKind::Store,
            '-' | '−' => TokenKind::Minus,
            '×' | '*' | '·' => TokenKind::Times,
            '/' | '÷' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '!' => TokenKind::Bang,
            '→' => TokenKind::Store,
            '=' => TokenKind::Comparison(ComparisonOperator::Equal),
            '≠' => TokenKind::Comparison(ComparisonOperator::NotEqual),
            '≤' => TokenKind::Comparison(ComparisonOperator::LessOrEqual),
            '≥' => TokenKind::Comparison(ComparisonOperator::GreaterOrEqual),
            '<' if self.eat('=') => TokenKind::Comparison(ComparisonOperator::LessOrEqual),
            '<' => TokenKind::Comparison(ComparisonOperator::Less),
            '>' if self.eat('=') => TokenKind::Comparison(ComparisonOperator::GreaterOrEqual),
            '>' => TokenKind::Comparison(ComparisonOperator::Greater),
            ',' => TokenKind::Comma,
            '(' => TokenKind::LeftParenthesis,
            ')' => TokenKind::RightParenthesis,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '_' => TokenKind::Underscore,
            _ => TokenKind::Undefined,
        };
        self.token(kind, start)
    }

    /// `digits ['.' digits] ['ᴇ' ['-'] digits]`, the first character already consumed.
    fn pop_number(&mut self, start: usize) -> Token<'a> {
        let mut mantissa_digits = usize::from(self.text.as_bytes()[start] != b'.');
        mantissa_digits += self.eat_digits();
        let mut seen_point = self.text.as_bytes()[start] == b'.';
        if !seen_point && self.eat('.') {
            seen_point = true;
        }
        if seen_point {
            mantissa_digits += self.eat_digits();
        }
        if mantissa_digits == 0 {
            return self.token(TokenKind::Undefined, start);
        }

        if self.eat(EXPONENT_MARKER) {
            self.eat('-');
            if self.eat_digits() == 0 {
                return self.token(TokenKind::Undefined, start);
            }
        }

        if matches!(self.peek(), Some('.') | Some(EXPONENT_MARKER)) {
            self.bump();
            return self.token(TokenKind::Undefined, start);
        }
        self.token(TokenKind::Number, start)
    }

    fn pop_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            let continues = c.is_ascii_alphanumeric() || (c == '_' && self.peek_second() != Some('{'));
            if !continues {
                break;
            }
            self.position += 1;
        }
        let text = &self.text[start..self.position];
        let kind = if reserved_function(text).is_some() {
            TokenKind::ReservedFunction
        } else {
            TokenKind::Identifier
        };
        self.token(kind, start)
    }
}

/// Whether `text` is one of the single-character constant identifiers.
pub fn is_constant_identifier(text: &str) -> bool {
    ConstantKind::from_symbol(text).is_some()
}
