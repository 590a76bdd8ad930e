//! Turning a canonical tree back into the shape a user expects to read.
//!
//! Negative terms become subtractions, negative exponents become divisions, rational exponents
//! `1/n` become roots and logarithms in base ℯ or 10 get their short names back.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive};

use super::{ReductionResult, arithmetic::assemble};
use crate::{
    expr::{
        Expression,
        variant::{ConstantKind, ExprType},
    },
    pool::{Pool, PoolResult},
};

pub(super) fn beautify(e: Expression) -> ReductionResult<Expression> {
    Ok(beautify_node(e)?)
}

fn beautify_node(e: Expression) -> PoolResult<Expression> {
    match e.kind() {
        ExprType::Addition => beautify_addition(e),
        ExprType::Multiplication => beautify_multiplication(e),
        ExprType::Power => beautify_power(e),
        ExprType::Logarithm => beautify_logarithm(e),
        _ if e.number_of_children() == 0 => Ok(e),
        kind => {
            let pool = e.pool().clone();
            let payload = e.payload();
            let children = e.into_children().into_iter().map(beautify_node).collect::<PoolResult<Vec<_>>>()?;
            pool.build(kind, payload, children)
        }
    }
}

/// `(true, |term|)` when `term` reads as a negative quantity.
fn split_negative(pool: &Pool, term: Expression) -> PoolResult<(bool, Expression)> {
    if let Some(value) = term.rational().filter(Signed::is_negative) {
        return Ok((true, pool.rational(-value)?));
    }
    if term.infinity_is_negative() == Some(true) {
        return Ok((true, pool.infinity(false)?));
    }
    let coefficient = match term.kind() {
        ExprType::Multiplication => term.child(0).and_then(|first| first.rational()).filter(Signed::is_negative),
        _ => None,
    };
    let Some(coefficient) = coefficient else {
        return Ok((false, term));
    };
    let mut factors = term.into_children();
    factors.remove(0);
    let magnitude = -coefficient;
    if !magnitude.is_one() {
        factors.insert(0, pool.rational(magnitude)?);
    }
    Ok((true, assemble(pool, ExprType::Multiplication, factors, 1)?))
}

fn beautify_addition(e: Expression) -> PoolResult<Expression> {
    let pool = e.pool().clone();
    let (numbers, mut terms): (Vec<_>, Vec<_>) = e.into_children().into_iter().partition(|t| t.kind().is_number());
    terms.extend(numbers);

    let mut result: Option<Expression> = None;
    for term in terms {
        let (negative, magnitude) = split_negative(&pool, term)?;
        let magnitude = beautify_node(magnitude)?;
        result = Some(match (result, negative) {
            (None, false) => magnitude,
            (None, true) => pool.operator(ExprType::Opposite, [magnitude])?,
            (Some(sum), false) => pool.operator(ExprType::Addition, [sum, magnitude])?,
            (Some(sum), true) => pool.operator(ExprType::Subtraction, [sum, magnitude])?,
        });
    }
    match result {
        Some(sum) => Ok(sum),
        None => pool.integer(0),
    }
}

/// `-p` when `e` is `b^p` with a negative rational `p`.
fn negative_exponent(e: &Expression) -> Option<BigRational> {
    if e.kind() != ExprType::Power {
        return None;
    }
    e.child(1)?.rational().filter(Signed::is_negative).map(|p| -p)
}

fn product(pool: &Pool, mut factors: Vec<Expression>) -> PoolResult<Expression> {
    match factors.len() {
        0 => pool.integer(1),
        1 => Ok(factors.remove(0)),
        _ => pool.operator(ExprType::Multiplication, factors),
    }
}

/// `b^p` for a positive `p`, already beautified.
fn positive_power(pool: &Pool, base: Expression, exponent: BigRational) -> PoolResult<Expression> {
    if exponent.is_one() {
        return beautify_node(base);
    }
    beautify_node(pool.operator(ExprType::Power, [base, pool.rational(exponent)?])?)
}

fn beautify_multiplication(e: Expression) -> PoolResult<Expression> {
    let pool = e.pool().clone();
    let mut factors = e.into_children();
    let coefficient = match factors.first().and_then(Expression::rational) {
        Some(value) => {
            factors.remove(0);
            value
        }
        None => BigRational::one(),
    };

    let mut numerator = Vec::with_capacity(factors.len() + 1);
    let mut denominator = Vec::new();
    if !coefficient.numer().abs().is_one() {
        numerator.push(pool.integer(coefficient.numer().abs())?);
    }
    if !coefficient.denom().is_one() {
        denominator.push(pool.integer(coefficient.denom().clone())?);
    }
    for factor in factors {
        match negative_exponent(&factor) {
            Some(exponent) => {
                let base = factor.into_children().into_iter().next().map_or_else(|| pool.undefined(), Ok)?;
                denominator.push(positive_power(&pool, base, exponent)?);
            }
            None => numerator.push(beautify_node(factor)?),
        }
    }

    let numerator = product(&pool, numerator)?;
    let quotient = if denominator.is_empty() {
        numerator
    } else {
        let denominator = product(&pool, denominator)?;
        pool.operator(ExprType::Division, [numerator, denominator])?
    };
    if coefficient.is_negative() {
        return pool.operator(ExprType::Opposite, [quotient]);
    }
    Ok(quotient)
}

fn beautify_power(e: Expression) -> PoolResult<Expression> {
    let pool = e.pool().clone();
    let Some([base, exponent]) = e.into_operands::<2>() else {
        return pool.undefined();
    };
    if let Some(value) = exponent.rational() {
        if value.is_negative() {
            let denominator = positive_power(&pool, base, -value)?;
            return pool.operator(ExprType::Division, [pool.integer(1)?, denominator]);
        }
        if value.numer().is_one() && !value.denom().is_one() {
            let base = beautify_node(base)?;
            if *value.denom() == BigInt::from(2) {
                return pool.operator(ExprType::SquareRoot, [base]);
            }
            if let Some(index) = value.denom().to_u64() {
                return pool.operator(ExprType::NthRoot, [base, pool.integer(index)?]);
            }
            return pool.operator(ExprType::Power, [base, exponent]);
        }
    }
    let base = beautify_node(base)?;
    let exponent = beautify_node(exponent)?;
    pool.operator(ExprType::Power, [base, exponent])
}

fn beautify_logarithm(e: Expression) -> PoolResult<Expression> {
    let pool = e.pool().clone();
    let Some([argument, base]) = e.into_operands::<2>() else {
        return pool.undefined();
    };
    let argument = beautify_node(argument)?;
    if base.constant() == Some(ConstantKind::E) {
        return pool.operator(ExprType::NaperianLogarithm, [argument]);
    }
    if base.integer() == Some(BigInt::from(10)) {
        return pool.operator(ExprType::CommonLogarithm, [argument]);
    }
    let base = beautify_node(base)?;
    pool.operator(ExprType::Logarithm, [argument, base])
}

#[cfg(test)]
mod tests {
    use crate::{Pool, context::EmptyContext, reduce::ReductionContext};

    fn reduce(text: &str) -> String {
        let pool = Pool::with_capacity(65536);
        pool.parse(text).unwrap().reduce(ReductionContext::new(&EmptyContext)).unwrap().to_string()
    }

    #[test]
    fn negative_terms_read_as_subtractions() {
        assert_eq!(reduce("x-3"), "x-3");
        assert_eq!(reduce("-x"), "-x");
        assert_eq!(reduce("2/3-5"), "-13/3");
    }

    #[test]
    fn negative_exponents_read_as_divisions() {
        assert_eq!(reduce("1/x"), "1/x");
        assert_eq!(reduce("3/x^2"), "3/x^2");
    }

    #[test]
    fn roots_and_logarithms() {
        assert_eq!(reduce("x^(1/2)"), "√(x)");
        assert_eq!(reduce("ln(x)"), "ln(x)");
        assert_eq!(reduce("log(x)"), "log(x)");
    }
}
