//! Expression to text.
//!
//! Role
//! - Write a tree back in the surface syntax the parser reads: `×` for products, `ᴇ` for
//!   decimal exponents, function call syntax for reserved functions.
//! - Parenthesize generously from operator precedence so that reparsing the text gives back
//!   a tree of the same value.
//! - Format floating-point and complex results for display.
//!
//! Example
//! ```rust
//! use hycas::{Pool, settings::PrintFloatMode};
//! let pool = Pool::new();
//! let e = pool.parse("-(a+b)^2").unwrap();
//! assert_eq!(e.serialize(PrintFloatMode::Decimal, 10), "-(a+b)^2");
//! let mut buffer = [0u8; 4];
//! assert_eq!(e.serialize_into(&mut buffer, PrintFloatMode::Decimal, 10), 8);
//! assert_eq!(&buffer, b"-(a\0");
//! ```

use std::fmt::{self, Write as _};

use bigdecimal::BigDecimal;
use num_complex::Complex;
use num_traits::{Signed, Zero};
use thiserror::Error;

use crate::{
    approx::Precision,
    expr::{Expression, number::decimal_exponent, variant::ExprType},
    parser::tokenizer::EXPONENT_MARKER,
    settings::{ComplexFormat, DEFAULT_SIGNIFICANT_DIGITS, PrintFloatMode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SerializationError {
    #[error("serialization needs {required} bytes, buffer holds {available}")]
    Overflow { required: usize, available: usize },
}

/// Binding strength of an atom.
pub(crate) const ATOM_PRECEDENCE: u8 = 10;

/// Precedence of the operator that spells `e` at its top.
///
/// Negative literals bind like a unary minus and fractions like a division.
pub(crate) fn precedence(e: &Expression) -> u8 {
    use ExprType::*;
    match e.kind() {
        Store => 1,
        Comparison => 2,
        Addition => 3,
        Subtraction | Opposite => 4,
        Multiplication => 5,
        Division => 6,
        Power => 8,
        Factorial => 9,
        Rational => match e.rational() {
            Some(value) if value.is_negative() => 4,
            Some(value) if !value.is_integer() => 6,
            _ => ATOM_PRECEDENCE,
        },
        Decimal => match e.decimal() {
            Some(value) if value.is_negative() => 4,
            _ => ATOM_PRECEDENCE,
        },
        Infinity => match e.infinity_is_negative() {
            Some(true) => 4,
            _ => ATOM_PRECEDENCE,
        },
        _ => ATOM_PRECEDENCE,
    }
}

/// Whether `child`, the `index`-th operand of a `parent` node, must be parenthesized.
pub(crate) fn needs_parentheses(parent: ExprType, index: usize, child: &Expression) -> bool {
    use ExprType::*;
    let p = precedence(child);
    match parent {
        Addition => p < 3,
        Subtraction if index == 0 => p < 3,
        Subtraction => p <= 4,
        Multiplication => p < 5,
        Division if index == 0 => p < 5,
        Division => p <= 6,
        Power if index == 0 => p < 9,
        Power => p < 8,
        Factorial => p < ATOM_PRECEDENCE,
        Opposite => p <= 4,
        Comparison => p <= 2,
        Store => index == 0 && p <= 2,
        _ => false,
    }
}

fn infix_symbol(kind: ExprType) -> Option<&'static str> {
    match kind {
        ExprType::Addition => Some("+"),
        ExprType::Subtraction => Some("-"),
        ExprType::Multiplication => Some("×"),
        ExprType::Division => Some("/"),
        ExprType::Power => Some("^"),
        ExprType::Store => Some("→"),
        _ => None,
    }
}

struct Serializer {
    mode: PrintFloatMode,
    significant_digits: usize,
    out: String,
}

impl Serializer {
    fn operand(&mut self, parent: ExprType, index: usize, child: &Expression) {
        if needs_parentheses(parent, index, child) {
            self.out.push('(');
            self.write(child);
            self.out.push(')');
        } else {
            self.write(child);
        }
    }

    fn arguments(&mut self, children: &[Expression]) {
        self.out.push('(');
        for (index, child) in children.iter().enumerate() {
            if index > 0 {
                self.out.push(',');
            }
            self.write(child);
        }
        self.out.push(')');
    }

    fn write(&mut self, e: &Expression) {
        use ExprType::*;
        let kind = e.kind();
        match kind {
            Undefined => self.out.push_str("undef"),
            Nonreal => self.out.push_str("nonreal"),
            Rational => {
                if let Some(value) = e.rational() {
                    let _ = write!(self.out, "{value}");
                }
            }
            Decimal => {
                if let Some(value) = e.decimal() {
                    self.out.push_str(&format_decimal(&value, self.mode, self.significant_digits));
                }
            }
            Infinity => match e.infinity_is_negative() {
                Some(true) => self.out.push_str("-inf"),
                _ => self.out.push_str("inf"),
            },
            Constant => {
                if let Some(constant) = e.constant() {
                    self.out.push_str(constant.symbol());
                }
            }
            Symbol => self.out.push_str(&e.name().unwrap_or_default()),
            Function => {
                self.out.push_str(&e.name().unwrap_or_default());
                self.arguments(&e.children());
            }
            Addition | Subtraction | Multiplication | Division | Power | Store => {
                let symbol = infix_symbol(kind).unwrap_or_default();
                for (index, child) in e.children().iter().enumerate() {
                    if index > 0 {
                        self.out.push_str(symbol);
                    }
                    self.operand(kind, index, child);
                }
            }
            Comparison => {
                let symbol = e.comparison_operator().map(|op| op.symbol()).unwrap_or("=");
                for (index, child) in e.children().iter().enumerate() {
                    if index > 0 {
                        self.out.push_str(symbol);
                    }
                    self.operand(kind, index, child);
                }
            }
            Opposite => {
                self.out.push('-');
                if let Some(child) = e.child(0) {
                    self.operand(kind, 0, &child);
                }
            }
            Factorial => {
                if let Some(child) = e.child(0) {
                    self.operand(kind, 0, &child);
                }
                self.out.push('!');
            }
            Parenthesis => self.arguments(&e.children()),
            Matrix => {
                let (_, columns) = e.matrix_dimensions().unwrap_or((0, 0));
                self.out.push('[');
                for row in e.children().chunks(columns.max(1)) {
                    self.out.push('[');
                    for (index, entry) in row.iter().enumerate() {
                        if index > 0 {
                            self.out.push(',');
                        }
                        self.write(entry);
                    }
                    self.out.push(']');
                }
                self.out.push(']');
            }
            List => {
                self.out.push('{');
                for (index, element) in e.children().iter().enumerate() {
                    if index > 0 {
                        self.out.push(',');
                    }
                    self.write(element);
                }
                self.out.push('}');
            }
            _ => {
                self.out.push_str(kind.function_name().unwrap_or("undef"));
                self.arguments(&e.children());
            }
        }
    }
}

impl Expression {
    /// Render the tree as parseable text.
    pub fn serialize(&self, mode: PrintFloatMode, significant_digits: usize) -> String {
        let mut serializer = Serializer { mode, significant_digits, out: String::new() };
        serializer.write(self);
        serializer.out
    }

    /// Write the text into `buffer`, `snprintf` style.
    ///
    /// At most `buffer.len() - 1` bytes are written, cut on a character boundary and followed
    /// by a NUL byte. The full length is returned, so a result `>= buffer.len()` means the
    /// text was truncated.
    pub fn serialize_into(&self, buffer: &mut [u8], mode: PrintFloatMode, significant_digits: usize) -> usize {
        let text = self.serialize(mode, significant_digits);
        if let Some(capacity) = buffer.len().checked_sub(1) {
            let mut end = text.len().min(capacity);
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            buffer[..end].copy_from_slice(&text.as_bytes()[..end]);
            buffer[end] = 0;
        }
        text.len()
    }

    /// [`Expression::serialize_into`], failing instead of truncating.
    pub fn serialize_checked(
        &self,
        buffer: &mut [u8],
        mode: PrintFloatMode,
        significant_digits: usize,
    ) -> Result<usize, SerializationError> {
        let length = self.serialize_into(buffer, mode, significant_digits);
        if length >= buffer.len() {
            return Err(SerializationError::Overflow { required: length + 1, available: buffer.len() });
        }
        Ok(length)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize(PrintFloatMode::Decimal, DEFAULT_SIGNIFICANT_DIGITS))
    }
}

/// Round a digit string to `significant` digits, half away from zero.
///
/// Returns the rounded digits (trailing zeros removed) and the possibly bumped exponent.
fn round_digits(digits: &str, exponent: i64, significant: usize) -> (String, i64) {
    let significant = significant.max(1);
    if digits.len() <= significant {
        return (digits.trim_end_matches('0').to_owned(), exponent);
    }
    let mut kept: Vec<u8> = digits.as_bytes()[..significant].to_vec();
    let mut exponent = exponent;
    if digits.as_bytes()[significant] >= b'5' {
        let mut index = kept.len();
        loop {
            if index == 0 {
                kept.insert(0, b'1');
                kept.pop();
                exponent += 1;
                break;
            }
            index -= 1;
            if kept[index] == b'9' {
                kept[index] = b'0';
            } else {
                kept[index] += 1;
                break;
            }
        }
    }
    let text = String::from_utf8(kept).unwrap_or_default();
    (text.trim_end_matches('0').to_owned(), exponent)
}

/// `digits` placed with `integer_length` digits before the point, zero padded.
fn place_point(digits: &str, integer_length: i64) -> String {
    if integer_length <= 0 {
        let zeros = "0".repeat(integer_length.unsigned_abs() as usize);
        return format!("0.{zeros}{digits}");
    }
    let integer_length = integer_length as usize;
    if digits.len() <= integer_length {
        format!("{digits}{}", "0".repeat(integer_length - digits.len()))
    } else {
        format!("{}.{}", &digits[..integer_length], &digits[integer_length..])
    }
}

/// Format `0.d₁d₂… × 10^(exponent+1)`, i.e. a leading digit `d₁` at `10^exponent`.
fn format_digits(negative: bool, digits: &str, exponent: i64, mode: PrintFloatMode, significant: usize) -> String {
    let (digits, exponent) = round_digits(digits, exponent, significant);
    if digits.is_empty() {
        return "0".into();
    }
    let body = match mode {
        PrintFloatMode::Decimal if exponent > -5 && exponent < significant.max(1) as i64 => {
            place_point(&digits, exponent + 1)
        }
        PrintFloatMode::Decimal | PrintFloatMode::Scientific => {
            format!("{}{EXPONENT_MARKER}{exponent}", place_point(&digits, 1))
        }
        PrintFloatMode::Engineering => {
            let engineering = exponent.div_euclid(3) * 3;
            format!("{}{EXPONENT_MARKER}{engineering}", place_point(&digits, exponent - engineering + 1))
        }
    };
    if negative { format!("-{body}") } else { body }
}

/// Format an exact decimal literal.
pub fn format_decimal(value: &BigDecimal, mode: PrintFloatMode, significant_digits: usize) -> String {
    let (mantissa, _) = value.as_bigint_and_exponent();
    if mantissa.is_zero() {
        return "0".into();
    }
    let digits = mantissa.abs().to_string();
    format_digits(mantissa.is_negative(), &digits, decimal_exponent(value), mode, significant_digits)
}

/// Format a float, printing at most the digits its precision carries.
pub fn format_float<T: Precision>(value: T, mode: PrintFloatMode, significant_digits: usize) -> String {
    if value.is_nan() {
        return "undef".into();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() { "-inf".into() } else { "inf".into() };
    }
    if value.is_zero() {
        return "0".into();
    }
    let wide = value.to_f64().unwrap_or(f64::NAN);
    let scientific = format!("{:.16e}", wide.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return "undef".into();
    };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exponent = exponent.parse::<i64>().unwrap_or(0);
    let significant = significant_digits.clamp(1, T::SIGNIFICANT_DIGITS);
    format_digits(wide.is_sign_negative(), &digits, exponent, mode, significant)
}

/// Format a complex approximation in the requested presentation.
pub fn format_complex<T: Precision>(
    value: Complex<T>,
    mode: PrintFloatMode,
    significant_digits: usize,
    format: ComplexFormat,
) -> String {
    if value.re.is_nan() || value.im.is_nan() {
        return "undef".into();
    }
    let real = |x: T| format_float(x, mode, significant_digits);
    if value.im.is_zero() {
        return real(value.re);
    }
    match format {
        ComplexFormat::Real => "nonreal".into(),
        ComplexFormat::Cartesian => {
            let imaginary = match value.im {
                im if im == T::one() => "𝐢".to_owned(),
                im if im == -T::one() => "-𝐢".to_owned(),
                im => format!("{}×𝐢", real(im)),
            };
            if value.re.is_zero() {
                imaginary
            } else if imaginary.starts_with('-') {
                format!("{}{}", real(value.re), imaginary)
            } else {
                format!("{}+{}", real(value.re), imaginary)
            }
        }
        ComplexFormat::Polar => {
            let modulus = value.norm();
            let argument = value.arg();
            let angle = if argument.is_sign_negative() {
                format!("({})", real(argument))
            } else {
                real(argument)
            };
            format!("{}×ℯ^({}×𝐢)", real(modulus), angle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rounding_carries_into_the_exponent() {
        assert_eq!(round_digits("9996", 0, 3), ("1".to_owned(), 1));
        assert_eq!(round_digits("12345", 2, 3), ("123".to_owned(), 2));
        assert_eq!(round_digits("12500", 0, 10), ("125".to_owned(), 0));
    }

    #[test]
    fn float_modes() {
        assert_eq!(format_float(1234.5f64, PrintFloatMode::Decimal, 10), "1234.5");
        assert_eq!(format_float(1234.5f64, PrintFloatMode::Scientific, 10), "1.2345ᴇ3");
        assert_eq!(format_float(12345.0f64, PrintFloatMode::Engineering, 10), "12.345ᴇ3");
        assert_eq!(format_float(0.000012f64, PrintFloatMode::Decimal, 10), "1.2ᴇ-5");
        assert_eq!(format_float(-0.25f64, PrintFloatMode::Decimal, 10), "-0.25");
        assert_eq!(format_float(2.0f64 / 3.0, PrintFloatMode::Decimal, 5), "0.66667");
        assert_eq!(format_float(0.1f32, PrintFloatMode::Decimal, 14), "0.1");
        assert_eq!(format_float(f64::NAN, PrintFloatMode::Decimal, 10), "undef");
        assert_eq!(format_float(f64::NEG_INFINITY, PrintFloatMode::Decimal, 10), "-inf");
    }

    #[test]
    fn decimals() {
        let value = BigDecimal::from_str("0.5").unwrap();
        assert_eq!(format_decimal(&value, PrintFloatMode::Decimal, 10), "0.5");
        let value = BigDecimal::from_str("1300").unwrap();
        assert_eq!(format_decimal(&value, PrintFloatMode::Decimal, 10), "1300");
        let value = BigDecimal::from_str("3e-33").unwrap();
        assert_eq!(format_decimal(&value, PrintFloatMode::Decimal, 10), "3ᴇ-33");
    }

    #[test]
    fn complex_formats() {
        let value = Complex::new(1.0f64, -2.0);
        assert_eq!(format_complex(value, PrintFloatMode::Decimal, 10, ComplexFormat::Cartesian), "1-2×𝐢");
        let value = Complex::new(0.0f64, 1.0);
        assert_eq!(format_complex(value, PrintFloatMode::Decimal, 10, ComplexFormat::Cartesian), "𝐢");
        assert_eq!(format_complex(value, PrintFloatMode::Decimal, 10, ComplexFormat::Real), "nonreal");
    }

    #[test]
    fn bounded_buffers() {
        let pool = crate::Pool::with_capacity(4096);
        let e = pool.parse("π+1").unwrap();
        let mut buffer = [0xffu8; 8];
        assert_eq!(e.serialize_checked(&mut buffer, PrintFloatMode::Decimal, 10), Ok(4));
        assert_eq!(&buffer[..5], "π+1\0".as_bytes());

        // Truncation never splits a character.
        let mut buffer = [0xffu8; 2];
        assert_eq!(e.serialize_into(&mut buffer, PrintFloatMode::Decimal, 10), 4);
        assert_eq!(buffer[0], 0);
        let error = e.serialize_checked(&mut buffer, PrintFloatMode::Decimal, 10).unwrap_err();
        assert_eq!(error, SerializationError::Overflow { required: 5, available: 2 });
        assert_eq!(e.serialize_into(&mut [], PrintFloatMode::Decimal, 10), 4);
    }
}
