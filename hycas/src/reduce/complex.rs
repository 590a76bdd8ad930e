//! `abs`, `arg`, `re`, `im` and `conj`.
//!
//! An expression whose sign is known is real. `re`, `im` and `conj` also see through sums of
//! real terms and real multiples of the imaginary unit.

use num_rational::BigRational;
use num_traits::{One, Zero};

use super::{ReductionContext, ReductionResult, add, multiply, negate, trigonometry::angle};
use crate::{
    expr::{
        Expression,
        sign::Sign,
        variant::{ConstantKind, ExprType},
    },
    pool::Pool,
};

pub(super) fn reduce(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    use ExprType::*;
    let pool = e.pool().clone();
    let kind = e.kind();
    let Some([x]) = e.into_operands::<1>() else {
        return Ok(pool.undefined()?);
    };
    let sign = x.sign();
    let imaginary = x.constant() == Some(ConstantKind::ImaginaryUnit);

    let reduced = match kind {
        AbsoluteValue => {
            if x.kind() == AbsoluteValue || matches!(sign, Sign::Positive | Sign::Null) {
                Some(x.clone())
            } else if sign == Sign::Negative {
                Some(negate(&pool, x.clone(), ctx)?)
            } else if imaginary {
                Some(pool.integer(1)?)
            } else {
                None
            }
        }
        ComplexArgument => match sign {
            Sign::Positive => Some(pool.integer(0)?),
            Sign::Negative => Some(angle(&pool, BigRational::one(), ctx)?),
            Sign::Null => Some(pool.undefined()?),
            Sign::Unknown if imaginary => Some(angle(&pool, BigRational::new(1.into(), 2.into()), ctx)?),
            Sign::Unknown => None,
        },
        RealPart if sign.is_known() => Some(x.clone()),
        RealPart if imaginary => Some(pool.integer(0)?),
        ImaginaryPart if sign.is_known() => Some(pool.rational(BigRational::zero())?),
        ImaginaryPart if imaginary => Some(pool.integer(1)?),
        Conjugate if x.kind() == Conjugate => x.child(0),
        Conjugate if sign.is_known() => Some(x.clone()),
        Conjugate if imaginary => Some(negate(&pool, x.clone(), ctx)?),
        _ => None,
    };
    if let Some(value) = reduced {
        return Ok(value);
    }
    if matches!(kind, RealPart | ImaginaryPart | Conjugate) {
        if let Some((real, imaginary)) = cartesian_parts(&pool, &x, ctx)? {
            return match kind {
                RealPart => sum(&pool, real, ctx),
                ImaginaryPart => sum(&pool, imaginary, ctx),
                _ => {
                    let i = pool.constant(ConstantKind::ImaginaryUnit)?;
                    let b = sum(&pool, imaginary, ctx)?;
                    let mut terms = real;
                    terms.push(multiply(&pool, vec![pool.integer(-1)?, b, i], ctx)?);
                    add(&pool, terms, ctx)
                }
            };
        }
    }
    Ok(pool.operator(kind, [x])?)
}

/// Split `x` into real terms and the real coefficients of its `𝐢` terms, `None` when some
/// term is neither.
fn cartesian_parts(
    pool: &Pool,
    x: &Expression,
    ctx: &ReductionContext,
) -> ReductionResult<Option<(Vec<Expression>, Vec<Expression>)>> {
    let terms = match x.kind() {
        ExprType::Addition => x.children(),
        _ => vec![x.clone()],
    };
    let mut real = Vec::new();
    let mut imaginary = Vec::new();
    for term in terms {
        if term.sign().is_known() {
            real.push(term);
            continue;
        }
        match imaginary_coefficient(pool, &term, ctx)? {
            Some(coefficient) => imaginary.push(coefficient),
            None => return Ok(None),
        }
    }
    Ok(Some((real, imaginary)))
}

/// `b` for a term `b·𝐢` whose other factors all have a known sign.
fn imaginary_coefficient(pool: &Pool, term: &Expression, ctx: &ReductionContext) -> ReductionResult<Option<Expression>> {
    let is_unit = |e: &Expression| e.constant() == Some(ConstantKind::ImaginaryUnit);
    if is_unit(term) {
        return Ok(Some(pool.integer(1)?));
    }
    if term.kind() != ExprType::Multiplication {
        return Ok(None);
    }
    let factors = term.children();
    if factors.iter().filter(|f| is_unit(f)).count() != 1 {
        return Ok(None);
    }
    let rest: Vec<Expression> = factors.into_iter().filter(|f| !is_unit(f)).collect();
    if !rest.iter().all(|f| f.sign().is_known()) {
        return Ok(None);
    }
    Ok(Some(multiply(pool, rest, ctx)?))
}

fn sum(pool: &Pool, terms: Vec<Expression>, ctx: &ReductionContext) -> ReductionResult<Expression> {
    if terms.is_empty() {
        return Ok(pool.integer(0)?);
    }
    add(pool, terms, ctx)
}

#[cfg(test)]
mod tests {
    use crate::{Pool, context::EmptyContext, reduce::ReductionContext, settings::ComplexFormat};

    fn reduce(text: &str) -> String {
        let pool = Pool::with_capacity(32768);
        let ctx = ReductionContext::new(&EmptyContext).with_complex_format(ComplexFormat::Cartesian);
        pool.parse(text).unwrap().reduce(ctx).unwrap().to_string()
    }

    #[test]
    fn real_arguments() {
        assert_eq!(reduce("abs(-3)"), "3");
        assert_eq!(reduce("abs(abs(x))"), "abs(x)");
        assert_eq!(reduce("re(π)"), "π");
        assert_eq!(reduce("im(2)"), "0");
        assert_eq!(reduce("arg(-1)"), "π");
        assert_eq!(reduce("conj(conj(x))"), "x");
    }

    #[test]
    fn imaginary_unit() {
        assert_eq!(reduce("abs(𝐢)"), "1");
        assert_eq!(reduce("im(𝐢)"), "1");
        assert_eq!(reduce("conj(𝐢)"), "-𝐢");
    }

    #[test]
    fn parts_of_cartesian_sums() {
        assert_eq!(reduce("re(3+2𝐢)"), "3");
        assert_eq!(reduce("im(3+2𝐢)"), "2");
        assert_eq!(reduce("im(3-π𝐢)"), "-π");
        assert_eq!(reduce("re(𝐢+1/2)"), "1/2");
        assert_eq!(reduce("im(5)"), "0");
        assert!(reduce("re(x+𝐢)").starts_with("re("));
    }
}
