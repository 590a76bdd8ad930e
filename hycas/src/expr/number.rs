use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero, pow};

/// Decimal exponents beyond this magnitude collapse to infinity or zero.
pub const MAX_DECIMAL_EXPONENT: i64 = 1000;

/// Exact value of a decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DecimalValue {
    Overflow { negative: bool },
    Underflow,
    Finite(BigRational),
}

/// Base-ten exponent of the leading digit: `1.5ᴇ3` gives 3.
pub fn decimal_exponent(value: &BigDecimal) -> i64 {
    let (mantissa, scale) = value.as_bigint_and_exponent();
    if mantissa.is_zero() {
        return 0;
    }
    mantissa.abs().to_string().len() as i64 - 1 - scale
}

pub fn decimal_value(value: &BigDecimal) -> DecimalValue {
    let (mantissa, scale) = value.as_bigint_and_exponent();
    if mantissa.is_zero() {
        return DecimalValue::Finite(BigRational::zero());
    }
    let exponent = decimal_exponent(value);
    if exponent > MAX_DECIMAL_EXPONENT {
        return DecimalValue::Overflow { negative: mantissa.is_negative() };
    }
    if exponent < -MAX_DECIMAL_EXPONENT {
        return DecimalValue::Underflow;
    }
    let ten = BigInt::from(10);
    let rational = if scale >= 0 {
        BigRational::new(mantissa, pow(ten, scale as usize))
    } else {
        BigRational::from_integer(mantissa * pow(ten, scale.unsigned_abs() as usize))
    };
    DecimalValue::Finite(rational)
}

/// Ordering key placing infinities around every finite value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum NumberKey {
    NegativeInfinity,
    Finite(BigRational),
    PositiveInfinity,
}

impl From<DecimalValue> for NumberKey {
    fn from(value: DecimalValue) -> Self {
        match value {
            DecimalValue::Overflow { negative: true } => NumberKey::NegativeInfinity,
            DecimalValue::Overflow { negative: false } => NumberKey::PositiveInfinity,
            DecimalValue::Underflow => NumberKey::Finite(BigRational::zero()),
            DecimalValue::Finite(value) => NumberKey::Finite(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn exponents() {
        assert_eq!(decimal_exponent(&BigDecimal::from_str("1.5e3").unwrap()), 3);
        assert_eq!(decimal_exponent(&BigDecimal::from_str("0.0025").unwrap()), -3);
    }

    #[test]
    fn exact_values() {
        let value = decimal_value(&BigDecimal::from_str("0.25").unwrap());
        assert_eq!(value, DecimalValue::Finite(BigRational::new(1.into(), 4.into())));
        let value = decimal_value(&BigDecimal::from_str("-1.2e2").unwrap());
        assert_eq!(value, DecimalValue::Finite(BigRational::from_integer((-120).into())));
        let value = decimal_value(&BigDecimal::from_str("1e1200").unwrap());
        assert_eq!(value, DecimalValue::Overflow { negative: false });
        let value = decimal_value(&BigDecimal::from_str("1e-1200").unwrap());
        assert_eq!(value, DecimalValue::Underflow);
    }
}
