//! Logarithms. `ln` and `log` are rewritten with an explicit base before anything else.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use super::{ReductionContext, ReductionResult, apply, multiply};
use crate::{
    expr::{
        Expression,
        sign::Sign,
        variant::{ConstantKind, ExprType},
    },
    pool::Pool,
    settings::ComplexFormat,
};

/// `k` such that `base^k = n`, for integers `n ≥ 1` and `base ≥ 2`.
fn integer_logarithm(n: &BigInt, base: &BigInt) -> Option<i64> {
    if *base < BigInt::from(2) || !n.is_positive() {
        return None;
    }
    let mut remaining = n.clone();
    let mut exponent = 0;
    while remaining > BigInt::one() {
        if !(&remaining % base).is_zero() {
            return None;
        }
        remaining /= base;
        exponent += 1;
    }
    Some(exponent)
}

/// `log_b(x)` for an integer base, when `x` or `1/x` is an integer power of it.
fn exact_logarithm(x: &BigRational, base: &BigRational) -> Option<BigRational> {
    if !base.is_integer() {
        return None;
    }
    let base = base.to_integer();
    if x.is_integer() {
        return integer_logarithm(&x.to_integer(), &base).map(|k| BigRational::from_integer(k.into()));
    }
    if x.numer().is_one() {
        return integer_logarithm(x.denom(), &base).map(|k| BigRational::from_integer((-k).into()));
    }
    None
}

fn with_base(pool: &Pool, argument: Expression, base: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    apply(pool, ExprType::Logarithm, [argument, base], ctx)
}

pub(super) fn reduce(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let kind = e.kind();
    let mut children = e.into_children().into_iter();
    let Some(x) = children.next() else {
        return Ok(pool.undefined()?);
    };
    let base = match kind {
        ExprType::NaperianLogarithm => return with_base(&pool, x, pool.constant(ConstantKind::E)?, ctx),
        ExprType::CommonLogarithm => return with_base(&pool, x, pool.integer(10)?, ctx),
        _ => match children.next() {
            Some(base) => base,
            None => return Ok(pool.undefined()?),
        },
    };

    if let Some(b) = base.rational() {
        if !b.is_positive() || b.is_one() {
            return Ok(pool.undefined()?);
        }
    }
    if x.is_rational_zero() {
        return Ok(pool.undefined()?);
    }
    if x.is_rational_one() {
        return Ok(pool.integer(0)?);
    }
    if x.is_identical_to(&base) {
        return Ok(pool.integer(1)?);
    }

    // A negative real has no real logarithm in any positive real base.
    if ctx.complex_format == ComplexFormat::Real && x.sign() == Sign::Negative && base.sign() == Sign::Positive {
        return Ok(pool.nonreal()?);
    }
    if let (Some(value), Some(b)) = (x.rational(), base.rational()) {
        if let Some(k) = exact_logarithm(&value, &b) {
            return Ok(pool.rational(k)?);
        }
    }
    if x.infinity_is_negative() == Some(false) && base.sign() == Sign::Positive {
        if let Some(b) = base.rational() {
            return Ok(pool.infinity(b < BigRational::one())?);
        }
        if base.constant() == Some(ConstantKind::E) {
            return Ok(pool.infinity(false)?);
        }
    }

    // log_b(y^p) = p·log_b(y) for y > 0
    if x.kind() == ExprType::Power && x.child(0).is_some_and(|y| y.sign() == Sign::Positive) {
        if let Some([y, p]) = x.clone().into_operands::<2>() {
            let logarithm = with_base(&pool, y, base, ctx)?;
            return multiply(&pool, vec![p, logarithm], ctx);
        }
    }

    Ok(pool.operator(ExprType::Logarithm, [x, base])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    fn reduce_with(text: &str, format: ComplexFormat, target: crate::settings::Target) -> String {
        let pool = Pool::with_capacity(32768);
        let ctx = ReductionContext::new(&crate::context::EmptyContext)
            .with_complex_format(format)
            .with_target(target);
        pool.parse(text).unwrap().reduce(ctx).unwrap().to_string()
    }

    #[test]
    fn negative_arguments_are_nonreal_in_every_positive_base() {
        use crate::settings::Target;
        for target in [Target::User, Target::SystemForAnalysis, Target::SystemForApproximation] {
            for text in ["ln(-2)", "log(-2,ℯ)", "log(-2)", "log(-1/2,3)", "log(-3,π)", "ln(-π)"] {
                assert_eq!(reduce_with(text, ComplexFormat::Real, target), "nonreal", "{text} {target}");
            }
        }
        assert_eq!(reduce_with("ln(-2)", ComplexFormat::Cartesian, Target::User), "ln(-2)");
    }

    #[test]
    fn exact_powers_of_the_base() {
        assert_eq!(exact_logarithm(&ratio(1000, 1), &ratio(10, 1)), Some(ratio(3, 1)));
        assert_eq!(exact_logarithm(&ratio(1, 8), &ratio(2, 1)), Some(ratio(-3, 1)));
        assert_eq!(exact_logarithm(&ratio(12, 1), &ratio(2, 1)), None);
        assert_eq!(exact_logarithm(&ratio(3, 4), &ratio(2, 1)), None);
    }
}
