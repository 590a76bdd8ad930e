//! Circular and hyperbolic functions.
//!
//! Angles are measured internally in half turns (multiples of π radians), which makes the
//! exact-value tables independent of the angle unit.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use super::{ReductionContext, ReductionResult, apply, multiply, negate, power};
use crate::{
    expr::{
        Expression,
        variant::{ConstantKind, ExprType},
    },
    pool::{Pool, PoolResult},
    settings::{AngleUnit, ComplexFormat},
};

fn ratio(numerator: i64, denominator: i64) -> BigRational {
    BigRational::new(BigInt::from(numerator), BigInt::from(denominator))
}

/// Angle of `half_turns` half turns, expressed in the angle unit of `ctx`.
pub(super) fn angle(pool: &Pool, half_turns: BigRational, ctx: &ReductionContext) -> ReductionResult<Expression> {
    match ctx.angle_unit.half_turn_degrees() {
        Some(degrees) => Ok(pool.rational(half_turns * BigInt::from(degrees))?),
        None => {
            let pi = pool.constant(ConstantKind::Pi)?;
            multiply(pool, vec![pool.rational(half_turns)?, pi], ctx)
        }
    }
}

/// Half turns of a reduced angle, when it is a rational multiple of π.
fn half_turns(e: &Expression, angle_unit: AngleUnit) -> Option<BigRational> {
    if let Some(degrees) = angle_unit.half_turn_degrees() {
        return e.rational().map(|value| value / BigInt::from(degrees));
    }
    if e.is_rational_zero() {
        return Some(BigRational::zero());
    }
    if e.constant() == Some(ConstantKind::Pi) {
        return Some(BigRational::one());
    }
    if e.kind() == ExprType::Multiplication && e.number_of_children() == 2 {
        let coefficient = e.child(0)?.rational()?;
        if e.child(1)?.constant() == Some(ConstantKind::Pi) {
            return Some(coefficient);
        }
    }
    None
}

/// `-x`, `-inf` and products led by a negative coefficient.
fn is_negative_form(e: &Expression) -> bool {
    if e.is_negative_rational() || e.infinity_is_negative() == Some(true) {
        return true;
    }
    e.kind() == ExprType::Multiplication && e.child(0).is_some_and(|first| first.is_negative_rational())
}

/// `c·√n`, reduced.
fn scaled_root(pool: &Pool, c: BigRational, n: i64, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let root = power(pool, pool.integer(n)?, pool.fraction(1, 2)?, ctx)?;
    multiply(pool, vec![pool.rational(c)?, root], ctx)
}

/// Exact sine of a rational number of half turns, for multiples of π/6 and π/4.
fn exact_sine(pool: &Pool, turns: &BigRational, ctx: &ReductionContext) -> ReductionResult<Option<Expression>> {
    let two = BigRational::from_integer(BigInt::from(2));
    let mut t = turns - (turns / &two).floor() * &two;
    let negative = t >= BigRational::one();
    if negative {
        t -= BigRational::one();
    }
    let half = ratio(1, 2);
    if t > half {
        t = BigRational::one() - t;
    }

    let value = if t.is_zero() {
        pool.integer(0)?
    } else if t == ratio(1, 6) {
        pool.fraction(1, 2)?
    } else if t == ratio(1, 4) {
        scaled_root(pool, ratio(1, 2), 2, ctx)?
    } else if t == ratio(1, 3) {
        scaled_root(pool, ratio(1, 2), 3, ctx)?
    } else if t == half {
        pool.integer(1)?
    } else {
        return Ok(None);
    };
    if negative && !value.is_rational_zero() {
        return Ok(Some(negate(pool, value, ctx)?));
    }
    Ok(Some(value))
}

fn exact_circular(
    pool: &Pool,
    kind: ExprType,
    turns: &BigRational,
    ctx: &ReductionContext,
) -> ReductionResult<Option<Expression>> {
    let quarter_shift = turns + ratio(1, 2);
    match kind {
        ExprType::Sine => exact_sine(pool, turns, ctx),
        ExprType::Cosine => exact_sine(pool, &quarter_shift, ctx),
        _ => {
            let (Some(sine), Some(cosine)) = (exact_sine(pool, turns, ctx)?, exact_sine(pool, &quarter_shift, ctx)?)
            else {
                return Ok(None);
            };
            if cosine.is_rational_zero() {
                return Ok(Some(pool.undefined()?));
            }
            let inverse = power(pool, cosine, pool.integer(-1)?, ctx)?;
            Ok(Some(multiply(pool, vec![sine, inverse], ctx)?))
        }
    }
}

/// Values whose arcsine (in half turns) is tabulated.
fn arcsine_table(pool: &Pool, ctx: &ReductionContext) -> ReductionResult<Vec<(Expression, BigRational)>> {
    Ok(vec![
        (pool.integer(0)?, BigRational::zero()),
        (pool.fraction(1, 2)?, ratio(1, 6)),
        (scaled_root(pool, ratio(1, 2), 2, ctx)?, ratio(1, 4)),
        (scaled_root(pool, ratio(1, 2), 3, ctx)?, ratio(1, 3)),
        (pool.integer(1)?, ratio(1, 2)),
    ])
}

fn arctangent_table(pool: &Pool, ctx: &ReductionContext) -> ReductionResult<Vec<(Expression, BigRational)>> {
    Ok(vec![
        (pool.integer(0)?, BigRational::zero()),
        (pool.integer(1)?, ratio(1, 4)),
        (power(pool, pool.integer(3)?, pool.fraction(1, 2)?, ctx)?, ratio(1, 3)),
        (scaled_root(pool, ratio(1, 3), 3, ctx)?, ratio(1, 6)),
    ])
}

/// Half turns of `asin(x)` or `atan(x)` when `x` is tabulated, using oddness for negative
/// arguments.
fn inverse_half_turns(
    pool: &Pool,
    kind: ExprType,
    x: &Expression,
    ctx: &ReductionContext,
) -> ReductionResult<Option<BigRational>> {
    let (magnitude, negative) = if is_negative_form(x) {
        (negate(pool, x.clone(), ctx)?, true)
    } else {
        (x.clone(), false)
    };
    let table = match kind {
        ExprType::ArcTangent => arctangent_table(pool, ctx)?,
        _ => arcsine_table(pool, ctx)?,
    };
    let turns = table.into_iter().find(|(value, _)| value.is_identical_to(&magnitude)).map(|(_, turns)| turns);
    Ok(turns.map(|turns| if negative { -turns } else { turns }))
}

fn inverse_of(kind: ExprType) -> Option<ExprType> {
    use ExprType::*;
    Some(match kind {
        Sine => ArcSine,
        Cosine => ArcCosine,
        Tangent => ArcTangent,
        HyperbolicSine => HyperbolicArcSine,
        HyperbolicCosine => HyperbolicArcCosine,
        HyperbolicTangent => HyperbolicArcTangent,
        _ => return None,
    })
}

fn is_odd(kind: ExprType) -> bool {
    use ExprType::*;
    matches!(
        kind,
        Sine | Tangent | ArcSine | ArcTangent | HyperbolicSine | HyperbolicTangent | HyperbolicArcSine
            | HyperbolicArcTangent
    )
}

fn raw(pool: &Pool, kind: ExprType, argument: Expression) -> PoolResult<Expression> {
    pool.operator(kind, [argument])
}

pub(super) fn reduce(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    use ExprType::*;
    let pool = e.pool().clone();
    let kind = e.kind();
    let Some([x]) = e.into_operands::<1>() else {
        return Ok(pool.undefined()?);
    };

    // f(f⁻¹(y)) = y
    if inverse_of(kind) == Some(x.kind()) {
        if let Some([inner]) = x.clone().into_operands::<1>() {
            return Ok(inner);
        }
    }

    match kind {
        Sine | Cosine | Tangent => {
            if x.kind() == Infinity {
                return Ok(pool.undefined()?);
            }
            if let Some(turns) = half_turns(&x, ctx.angle_unit) {
                if let Some(value) = exact_circular(&pool, kind, &turns, ctx)? {
                    return Ok(value);
                }
            }
        }
        ArcSine | ArcCosine => {
            if let Some(value) = x.rational() {
                if value.abs() > BigRational::one() {
                    return match ctx.complex_format {
                        ComplexFormat::Real => Ok(pool.nonreal()?),
                        _ => Ok(raw(&pool, kind, x)?),
                    };
                }
            }
            if let Some(turns) = inverse_half_turns(&pool, ArcSine, &x, ctx)? {
                let turns = if kind == ArcCosine { ratio(1, 2) - turns } else { turns };
                return angle(&pool, turns, ctx);
            }
        }
        ArcTangent => {
            if let Some(negative) = x.infinity_is_negative() {
                let quarter = ratio(if negative { -1 } else { 1 }, 2);
                return angle(&pool, quarter, ctx);
            }
            if let Some(turns) = inverse_half_turns(&pool, ArcTangent, &x, ctx)? {
                return angle(&pool, turns, ctx);
            }
        }
        HyperbolicCosine if x.is_rational_zero() => return Ok(pool.integer(1)?),
        HyperbolicArcCosine if x.is_rational_one() => return Ok(pool.integer(0)?),
        HyperbolicSine | HyperbolicTangent | HyperbolicArcSine | HyperbolicArcTangent if x.is_rational_zero() => {
            return Ok(pool.integer(0)?);
        }
        _ => {}
    }

    if is_negative_form(&x) && (is_odd(kind) || kind == Cosine || kind == HyperbolicCosine) {
        let positive = negate(&pool, x, ctx)?;
        let value = apply(&pool, kind, [positive], ctx)?;
        return if is_odd(kind) { negate(&pool, value, ctx) } else { Ok(value) };
    }
    Ok(raw(&pool, kind, x)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EmptyContext;

    fn sine(turns: BigRational) -> Option<String> {
        let pool = Pool::with_capacity(16384);
        let ctx = ReductionContext::new(&EmptyContext);
        exact_sine(&pool, &turns, &ctx).unwrap().map(|value| value.to_string())
    }

    #[test]
    fn sine_table_folds_every_quadrant() {
        assert_eq!(sine(ratio(1, 6)).as_deref(), Some("1/2"));
        assert_eq!(sine(ratio(5, 6)).as_deref(), Some("1/2"));
        assert_eq!(sine(ratio(7, 6)).as_deref(), Some("-1/2"));
        assert_eq!(sine(ratio(-1, 2)).as_deref(), Some("-1"));
        assert_eq!(sine(ratio(3, 1)).as_deref(), Some("0"));
        assert_eq!(sine(ratio(1, 5)), None);
    }

    #[test]
    fn degrees_are_converted_to_half_turns() {
        let pool = Pool::with_capacity(4096);
        let thirty = pool.integer(30).unwrap();
        assert_eq!(half_turns(&thirty, AngleUnit::Degree), Some(ratio(1, 6)));
        assert_eq!(half_turns(&thirty, AngleUnit::Gradian), Some(ratio(3, 20)));
        assert_eq!(half_turns(&thirty, AngleUnit::Radian), None);
    }
}
