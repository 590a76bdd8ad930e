use bigdecimal::BigDecimal;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use super::{Expression, variant::ExprType};
use crate::pool::Payload;

/// Sign of a real expression, when it can be decided without evaluating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Negative,
    Null,
    Positive,
    Unknown,
}

impl Sign {
    pub fn of_rational(value: &BigRational) -> Self {
        if value.is_zero() {
            Sign::Null
        } else if value.is_negative() {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    fn of_decimal(value: &BigDecimal) -> Self {
        if value.is_zero() {
            Sign::Null
        } else if value.is_negative() {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    pub fn is_known(self) -> bool {
        self != Sign::Unknown
    }

    /// Strictly positive or strictly negative.
    pub fn is_strict(self) -> bool {
        matches!(self, Sign::Negative | Sign::Positive)
    }

    pub fn negate(self) -> Self {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Positive => Sign::Negative,
            other => other,
        }
    }

    pub fn multiply(self, other: Sign) -> Self {
        match (self, other) {
            (Sign::Null, _) | (_, Sign::Null) => Sign::Null,
            (Sign::Unknown, _) | (_, Sign::Unknown) => Sign::Unknown,
            (a, b) if a == b => Sign::Positive,
            _ => Sign::Negative,
        }
    }
}

impl Expression {
    /// Decide the sign of this expression from its structure.
    pub fn sign(&self) -> Sign {
        use ExprType::*;
        match self.kind() {
            Rational => match self.payload() {
                Payload::Rational(value) => Sign::of_rational(&value),
                _ => Sign::Unknown,
            },
            Decimal => match self.payload() {
                Payload::Decimal(value) => Sign::of_decimal(&value),
                _ => Sign::Unknown,
            },
            Infinity => match self.infinity_is_negative() {
                Some(true) => Sign::Negative,
                _ => Sign::Positive,
            },
            Constant => match self.constant() {
                Some(kind) if kind.is_real() => Sign::Positive,
                _ => Sign::Unknown,
            },
            Multiplication | Division => self
                .children()
                .iter()
                .fold(Sign::Positive, |sign, child| sign.multiply(child.sign())),
            Addition => {
                let signs: Vec<Sign> = self.children().iter().map(Expression::sign).collect();
                if signs.iter().all(|s| matches!(s, Sign::Positive | Sign::Null)) {
                    if signs.contains(&Sign::Positive) { Sign::Positive } else { Sign::Null }
                } else if signs.iter().all(|s| matches!(s, Sign::Negative | Sign::Null)) {
                    if signs.contains(&Sign::Negative) { Sign::Negative } else { Sign::Null }
                } else {
                    Sign::Unknown
                }
            }
            Power => self.power_sign(),
            Opposite => self.child(0).map_or(Sign::Unknown, |child| child.sign().negate()),
            Parenthesis => self.child(0).map_or(Sign::Unknown, |child| child.sign()),
            AbsoluteValue => match self.child(0).map(|child| child.sign()) {
                Some(Sign::Null) => Sign::Null,
                Some(sign) if sign.is_strict() => Sign::Positive,
                _ => Sign::Unknown,
            },
            SquareRoot => match self.child(0).map(|child| child.sign()) {
                Some(Sign::Positive) => Sign::Positive,
                Some(Sign::Null) => Sign::Null,
                _ => Sign::Unknown,
            },
            Factorial => Sign::Positive,
            _ => Sign::Unknown,
        }
    }

    fn power_sign(&self) -> Sign {
        let (Some(base), Some(exponent)) = (self.child(0), self.child(1)) else {
            return Sign::Unknown;
        };
        let base_sign = base.sign();
        let exponent_value = exponent.rational();
        match base_sign {
            // A real exponent keeps a positive base positive.
            Sign::Positive if exponent.sign().is_known() => Sign::Positive,
            Sign::Null => match exponent_value {
                Some(value) if value.is_positive() => Sign::Null,
                _ => Sign::Unknown,
            },
            Sign::Negative => match exponent_value {
                Some(value) if value.is_integer() => {
                    if (value.to_integer() % 2u32).is_zero() {
                        Sign::Positive
                    } else {
                        Sign::Negative
                    }
                }
                _ => Sign::Unknown,
            },
            _ => Sign::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pool;

    #[test]
    fn products_and_sums() {
        let pool = Pool::with_capacity(8192);
        let positive = pool.parse("2π").unwrap();
        assert_eq!(positive.sign(), Sign::Positive);
        let negative = pool.parse("-3×ℯ").unwrap();
        assert_eq!(negative.sign(), Sign::Negative);
        let unknown = pool.parse("x+1").unwrap();
        assert_eq!(unknown.sign(), Sign::Unknown);
        let even = pool.parse("(-2)^2").unwrap();
        assert_eq!(even.sign(), Sign::Positive);
    }
}
