//! Powers and roots.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::{ReductionContext, ReductionResult, add, arithmetic::flatten, matrix, multiply, power};
use crate::{
    expr::{
        Expression,
        sign::Sign,
        variant::{ConstantKind, ExprType},
    },
    pool::Pool,
    settings::ComplexFormat,
};

/// Exact powers are only computed while the result stays below this many bits.
const MAX_EXACT_BITS: u64 = 4096;
/// Trial divisors used when pulling perfect powers out of a root.
const TRIAL_DIVISION_LIMIT: u32 = 1000;
/// `(a+b)^n` is expanded up to this exponent.
const MAX_EXPANDED_EXPONENT: u32 = 8;

fn raw(pool: &Pool, base: Expression, exponent: Expression) -> ReductionResult<Expression> {
    Ok(pool.operator(ExprType::Power, [base, exponent])?)
}

pub(super) fn reduce_power(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let Some([base, exponent]) = e.into_operands::<2>() else {
        return Ok(pool.undefined()?);
    };

    if exponent.is_matrix() {
        return Ok(pool.undefined()?);
    }
    if base.is_matrix() {
        return match exponent.integer() {
            Some(n) => matrix::matrix_power(&pool, base, &n, ctx),
            None => Ok(pool.undefined()?),
        };
    }

    if let Some(value) = exponent.rational() {
        if value.is_zero() {
            if base.is_rational_zero() || base.kind() == ExprType::Infinity {
                return Ok(pool.undefined()?);
            }
            return Ok(pool.integer(1)?);
        }
        if value.is_one() {
            return Ok(base);
        }
    }

    if base.is_rational_zero() {
        return match exponent.sign() {
            Sign::Positive => Ok(pool.integer(0)?),
            Sign::Negative | Sign::Null => Ok(pool.undefined()?),
            Sign::Unknown => raw(&pool, base, exponent),
        };
    }
    if base.is_rational_one() && exponent.kind() != ExprType::Infinity {
        return Ok(pool.integer(1)?);
    }

    if let (Some(b), Some(x)) = (base.rational(), exponent.rational()) {
        return match rational_power(&pool, &b, &x, ctx)? {
            Some(result) => Ok(result),
            None => raw(&pool, base, exponent),
        };
    }

    if let (Some(negative), Some(x)) = (base.infinity_is_negative(), exponent.rational()) {
        if x.is_negative() {
            return Ok(pool.integer(0)?);
        }
        if !negative {
            return Ok(pool.infinity(false)?);
        }
        if x.is_integer() {
            return Ok(pool.infinity(x.to_integer().is_odd())?);
        }
        return raw(&pool, base, exponent);
    }

    if base.constant() == Some(ConstantKind::ImaginaryUnit) {
        if let Some(n) = exponent.integer() {
            return imaginary_unit_power(&pool, &n, ctx);
        }
    }

    if base.kind() == ExprType::Power {
        let integer_exponent = exponent.integer().is_some();
        let positive_base = base.child(0).is_some_and(|inner| inner.sign() == Sign::Positive);
        if integer_exponent || positive_base {
            if let Some([inner, inner_exponent]) = base.into_operands::<2>() {
                let product = multiply(&pool, vec![inner_exponent, exponent], ctx)?;
                return power(&pool, inner, product, ctx);
            }
            return Ok(pool.undefined()?);
        }
    }

    if let Some(n) = exponent.integer() {
        if base.kind() == ExprType::Multiplication {
            let mut factors = Vec::with_capacity(base.number_of_children());
            for factor in flatten(base, ExprType::Multiplication) {
                factors.push(power(&pool, factor, pool.integer(n.clone())?, ctx)?);
            }
            return multiply(&pool, factors, ctx);
        }
        if base.kind() == ExprType::Addition {
            if let Some(n) = n.to_u32().filter(|n| (2..=MAX_EXPANDED_EXPONENT).contains(n)) {
                let mut expanded = base.clone();
                for _ in 1..n {
                    expanded = distribute(&pool, expanded, &base, ctx)?;
                }
                return Ok(expanded);
            }
        }
    }

    if exponent.kind() == ExprType::Logarithm && exponent.child(1).is_some_and(|b| b.is_identical_to(&base)) {
        if let Some(argument) = exponent.child(0) {
            return Ok(argument);
        }
    }

    raw(&pool, base, exponent)
}

/// `lhs·sum` expanded term by term. Going through `multiply` would fold the factors back
/// into a power.
fn distribute(pool: &Pool, lhs: Expression, sum: &Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let left_terms = match lhs.kind() {
        ExprType::Addition => flatten(lhs, ExprType::Addition),
        _ => vec![lhs],
    };
    let right_terms = sum.children();
    let mut terms = Vec::with_capacity(left_terms.len() * right_terms.len());
    for left in &left_terms {
        for right in &right_terms {
            terms.push(multiply(pool, vec![left.clone(), right.clone()], ctx)?);
        }
    }
    add(pool, terms, ctx)
}

fn imaginary_unit_power(pool: &Pool, n: &BigInt, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let i = || pool.constant(ConstantKind::ImaginaryUnit);
    Ok(match n.mod_floor(&BigInt::from(4)).to_u8() {
        Some(0) => pool.integer(1)?,
        Some(1) => i()?,
        Some(2) => pool.integer(-1)?,
        _ => return multiply(pool, vec![pool.integer(-1)?, i()?], ctx),
    })
}

fn bits(value: &BigRational) -> u64 {
    value.numer().bits().max(value.denom().bits())
}

/// `(outside, inside)` with `n = outside^q · inside` and `outside` as large as trial division
/// finds it.
fn extract_root(n: &BigInt, q: u32) -> (BigInt, BigInt) {
    let root = n.nth_root(q);
    if root.pow(q) == *n {
        return (root, BigInt::one());
    }
    let mut outside = BigInt::one();
    let mut inside = n.clone();
    for divisor in 2..=TRIAL_DIVISION_LIMIT {
        let step = BigInt::from(divisor).pow(q);
        if step > inside {
            break;
        }
        while (&inside % &step).is_zero() {
            inside /= &step;
            outside *= divisor;
        }
    }
    (outside, inside)
}

/// Exact `base^exponent` for rationals, `None` when it is kept as a power.
fn rational_power(
    pool: &Pool,
    base: &BigRational,
    exponent: &BigRational,
    ctx: &ReductionContext,
) -> ReductionResult<Option<Expression>> {
    if exponent.is_integer() {
        let Some(n) = exponent.to_integer().to_i32() else {
            return Ok(None);
        };
        if bits(base).saturating_mul(n.unsigned_abs() as u64) > MAX_EXACT_BITS {
            return Ok(None);
        }
        return Ok(Some(pool.rational(base.pow(n))?));
    }

    let p = exponent.numer().clone();
    let Some(q) = exponent.denom().to_u32() else {
        return Ok(None);
    };

    if base.is_negative() {
        let magnitude = pool.rational(base.abs())?;
        let exponent_node = pool.rational(exponent.clone())?;
        if q % 2 == 0 {
            if ctx.complex_format == ComplexFormat::Real {
                return Ok(Some(pool.nonreal()?));
            }
            if q != 2 {
                return Ok(None);
            }
            let i = pool.constant(ConstantKind::ImaginaryUnit)?;
            let rotation = power(pool, i, pool.integer(p)?, ctx)?;
            let root = power(pool, magnitude, exponent_node, ctx)?;
            return Ok(Some(multiply(pool, vec![rotation, root], ctx)?));
        }
        // The real odd root is only the value under the Real format; otherwise the principal
        // root is complex and the power stays as written.
        if ctx.complex_format != ComplexFormat::Real {
            return Ok(None);
        }
        let sign = if p.is_odd() { -1 } else { 1 };
        let root = power(pool, magnitude, exponent_node, ctx)?;
        return Ok(Some(multiply(pool, vec![pool.integer(sign)?, root], ctx)?));
    }

    let (whole, remainder) = p.div_mod_floor(&BigInt::from(q));
    let Some(remainder) = remainder.to_u32() else {
        return Ok(None);
    };
    let Some(whole) = whole.to_i32() else {
        return Ok(None);
    };
    if bits(base).saturating_mul(remainder as u64 + whole.unsigned_abs() as u64) > MAX_EXACT_BITS {
        return Ok(None);
    }

    let (outside_numerator, inside_numerator) = extract_root(&base.numer().pow(remainder), q);
    let (outside_denominator, inside_denominator) = extract_root(&base.denom().pow(remainder), q);
    let coefficient = base.pow(whole) * BigRational::new(outside_numerator, outside_denominator);
    let inside = BigRational::new(inside_numerator, inside_denominator);
    let root_exponent = BigRational::new(BigInt::one(), BigInt::from(q));

    if inside.is_one() {
        return Ok(Some(pool.rational(coefficient)?));
    }
    let root = pool.operator(ExprType::Power, [pool.rational(inside)?, pool.rational(root_exponent)?])?;
    if coefficient.is_one() {
        return Ok(Some(root));
    }
    Ok(Some(pool.operator(ExprType::Multiplication, [pool.rational(coefficient)?, root])?))
}

/// `√x` and `root(x, n)` as rational powers.
pub(super) fn reduce_root(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let kind = e.kind();
    let mut children = e.into_children().into_iter();
    let Some(radicand) = children.next() else {
        return Ok(pool.undefined()?);
    };
    let exponent = match (kind, children.next()) {
        (ExprType::SquareRoot, _) => pool.fraction(1, 2)?,
        (_, Some(index)) => match index.rational() {
            Some(n) if n.is_zero() => return Ok(pool.undefined()?),
            Some(n) => pool.rational(n.recip())?,
            None => power(&pool, index, pool.integer(-1)?, ctx)?,
        },
        (_, None) => return Ok(pool.undefined()?),
    };
    power(&pool, radicand, exponent, ctx)
}
