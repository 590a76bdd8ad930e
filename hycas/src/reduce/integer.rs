//! Factorial, rounding and integer arithmetic on exact values.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::ReductionResult;
use crate::{
    expr::{Expression, variant::ExprType},
    pool::{Pool, PoolResult},
};

/// Largest `n` whose factorial is computed exactly.
const MAX_FACTORIAL: u32 = 100;
/// Largest `k` for which `binomial(n, k)` is expanded.
const MAX_BINOMIAL_K: u32 = 300;
/// Largest `k` for which `permute(n, k)` is expanded.
const MAX_PERMUTE_K: u32 = 1000;
/// Largest number of decimals `round` accepts exactly.
const MAX_ROUND_DIGITS: i32 = 100;

fn raw(pool: &Pool, kind: ExprType, children: Vec<Expression>) -> PoolResult<Expression> {
    pool.operator(kind, children)
}

fn factorial(n: u32) -> BigInt {
    (2..=n).fold(BigInt::one(), |product, k| product * k)
}

pub(super) fn reduce_factorial(e: Expression) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let Some([x]) = e.into_operands::<1>() else {
        return Ok(pool.undefined()?);
    };
    if let Some(value) = x.rational() {
        if !value.is_integer() || value.is_negative() {
            return Ok(pool.undefined()?);
        }
        return match value.to_integer().to_u32().filter(|&n| n <= MAX_FACTORIAL) {
            Some(n) => Ok(pool.integer(factorial(n))?),
            None => Ok(raw(&pool, ExprType::Factorial, vec![x])?),
        };
    }
    match x.infinity_is_negative() {
        Some(false) => Ok(pool.infinity(false)?),
        Some(true) => Ok(pool.undefined()?),
        None => Ok(raw(&pool, ExprType::Factorial, vec![x])?),
    }
}

/// What an integer function evaluates to on its operands.
enum Outcome {
    Value(BigRational),
    Undefined,
    Infinity { negative: bool },
    Kept,
}

fn integers(a: &BigRational, b: &BigRational) -> Option<(BigInt, BigInt)> {
    (a.is_integer() && b.is_integer()).then(|| (a.to_integer(), b.to_integer()))
}

fn integer_outcome(value: BigInt) -> Outcome {
    Outcome::Value(BigRational::from_integer(value))
}

fn unary(kind: ExprType, x: &Expression) -> Outcome {
    if let Some(negative) = x.infinity_is_negative() {
        return match kind {
            ExprType::FracPart => Outcome::Undefined,
            _ => Outcome::Infinity { negative },
        };
    }
    let Some(value) = x.rational() else {
        return Outcome::Kept;
    };
    match kind {
        ExprType::Floor => Outcome::Value(value.floor()),
        ExprType::Ceiling => Outcome::Value(value.ceil()),
        ExprType::FracPart => Outcome::Value(&value - value.floor()),
        _ => Outcome::Kept,
    }
}

fn round(x: &Expression, digits: &Expression) -> Outcome {
    let Some(digits) = digits.rational() else {
        return Outcome::Kept;
    };
    if !digits.is_integer() {
        return Outcome::Undefined;
    }
    if let Some(negative) = x.infinity_is_negative() {
        return Outcome::Infinity { negative };
    }
    let (Some(value), Some(digits)) = (x.rational(), digits.to_integer().to_i32()) else {
        return Outcome::Kept;
    };
    if digits.abs() > MAX_ROUND_DIGITS {
        return Outcome::Kept;
    }
    let scale = BigRational::from_integer(BigInt::from(10)).pow(digits);
    Outcome::Value((value * &scale).round() / scale)
}

/// `quo` is the Euclidean quotient; `rem` takes the sign of the divisor.
fn integer_division(kind: ExprType, a: &BigRational, b: &BigRational) -> Outcome {
    let Some((a, b)) = integers(a, b) else {
        return Outcome::Undefined;
    };
    if b.is_zero() {
        return match a.sign() {
            num_bigint::Sign::Plus => Outcome::Infinity { negative: false },
            num_bigint::Sign::Minus => Outcome::Infinity { negative: true },
            num_bigint::Sign::NoSign => Outcome::Undefined,
        };
    }
    match kind {
        ExprType::DivisionRemainder => integer_outcome(a.mod_floor(&b)),
        _ => {
            let remainder = a.mod_floor(&b.abs());
            integer_outcome((a - remainder) / b)
        }
    }
}

fn binomial(n: &BigRational, k: &BigRational) -> Outcome {
    if !k.is_integer() {
        return Outcome::Undefined;
    }
    if k.is_negative() {
        return integer_outcome(BigInt::zero());
    }
    let Some(k) = k.to_integer().to_u32().filter(|&k| k <= MAX_BINOMIAL_K) else {
        return Outcome::Kept;
    };
    if n.is_integer() && !n.is_negative() && n.to_integer() < BigInt::from(k) {
        return integer_outcome(BigInt::zero());
    }
    let mut result = BigRational::one();
    for i in 0..k {
        let factor = n - BigRational::from_integer(BigInt::from(i));
        result = result * factor / BigRational::from_integer(BigInt::from(i + 1));
    }
    Outcome::Value(result)
}

fn permute(n: &BigRational, k: &BigRational) -> Outcome {
    let Some((n, k)) = integers(n, k) else {
        return Outcome::Undefined;
    };
    if n.is_negative() || k.is_negative() {
        return Outcome::Undefined;
    }
    if k > n {
        return integer_outcome(BigInt::zero());
    }
    let Some(k) = k.to_u32().filter(|&k| k <= MAX_PERMUTE_K) else {
        return Outcome::Kept;
    };
    integer_outcome((0..k).fold(BigInt::one(), |product, i| product * (&n - i)))
}

fn binary(kind: ExprType, a: &Expression, b: &Expression) -> Outcome {
    if kind == ExprType::Round {
        return round(a, b);
    }
    if a.kind() == ExprType::Infinity || b.kind() == ExprType::Infinity {
        return Outcome::Undefined;
    }
    let (Some(x), Some(y)) = (a.rational(), b.rational()) else {
        if kind == ExprType::BinomialCoefficient {
            if let Some(k) = b.rational() {
                if !k.is_integer() {
                    return Outcome::Undefined;
                }
                if k.is_negative() {
                    return integer_outcome(BigInt::zero());
                }
            }
        }
        return Outcome::Kept;
    };
    match kind {
        ExprType::GreatCommonDivisor | ExprType::LeastCommonMultiple => match integers(&x, &y) {
            Some((x, y)) if kind == ExprType::GreatCommonDivisor => integer_outcome(x.gcd(&y)),
            Some((x, y)) => integer_outcome(x.lcm(&y)),
            None => Outcome::Undefined,
        },
        ExprType::DivisionQuotient | ExprType::DivisionRemainder => integer_division(kind, &x, &y),
        ExprType::BinomialCoefficient => binomial(&x, &y),
        ExprType::PermuteCoefficient => permute(&x, &y),
        _ => Outcome::Kept,
    }
}

/// `floor`, `ceil`, `frac`, `round`, `gcd`, `lcm`, `quo`, `rem`, `binomial` and `permute`.
pub(super) fn reduce(e: Expression) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let kind = e.kind();
    let children = e.into_children();
    let outcome = match children.as_slice() {
        [x] => unary(kind, x),
        [a, b] => binary(kind, a, b),
        _ => Outcome::Undefined,
    };
    Ok(match outcome {
        Outcome::Value(value) => pool.rational(value)?,
        Outcome::Undefined => pool.undefined()?,
        Outcome::Infinity { negative } => pool.infinity(negative)?,
        Outcome::Kept => raw(&pool, kind, children)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    fn value(outcome: Outcome) -> Option<BigRational> {
        match outcome {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }

    #[test]
    fn quotient_is_euclidean() {
        let r = value(integer_division(ExprType::DivisionRemainder, &ratio(-7, 1), &ratio(3, 1)));
        assert_eq!(r, Some(ratio(2, 1)));
        let q = value(integer_division(ExprType::DivisionQuotient, &ratio(-7, 1), &ratio(3, 1)));
        assert_eq!(q, Some(ratio(-3, 1)));
        let q = value(integer_division(ExprType::DivisionQuotient, &ratio(7, 1), &ratio(-3, 1)));
        assert_eq!(q, Some(ratio(-2, 1)));
        let r = value(integer_division(ExprType::DivisionRemainder, &ratio(7, 1), &ratio(-3, 1)));
        assert_eq!(r, Some(ratio(-2, 1)));
        assert!(matches!(
            integer_division(ExprType::DivisionRemainder, &ratio(-5, 1), &ratio(0, 1)),
            Outcome::Infinity { negative: true }
        ));
        assert!(matches!(
            integer_division(ExprType::DivisionQuotient, &ratio(1, 2), &ratio(3, 1)),
            Outcome::Undefined
        ));
    }

    #[test]
    fn binomial_coefficients() {
        assert_eq!(value(binomial(&ratio(5, 1), &ratio(2, 1))), Some(ratio(10, 1)));
        assert_eq!(value(binomial(&ratio(2, 1), &ratio(5, 1))), Some(ratio(0, 1)));
        assert_eq!(value(binomial(&ratio(1, 2), &ratio(2, 1))), Some(ratio(-1, 8)));
        assert!(matches!(binomial(&ratio(4, 1), &ratio(1, 2)), Outcome::Undefined));
    }

    #[test]
    fn permutations_and_factorials() {
        assert_eq!(value(permute(&ratio(5, 1), &ratio(2, 1))), Some(ratio(20, 1)));
        assert_eq!(value(permute(&ratio(2, 1), &ratio(5, 1))), Some(ratio(0, 1)));
        assert_eq!(factorial(5), BigInt::from(120));
        assert_eq!(factorial(0), BigInt::one());
    }
}
