//! Substitution and symbolic differentiation.

use super::{ReductionContext, ReductionResult, add, apply, deep_reduce, multiply, negate, power};
use crate::{
    expr::{
        Expression,
        variant::{ConstantKind, ExprType},
    },
    pool::{Pool, PoolResult},
};

/// Replace every free occurrence of the symbol `name` in `e` by `value`.
///
/// Variables bound by `diff`, `int`, `sum` and `product` shadow `name` inside the bound
/// expression; the bounds themselves are still substituted.
pub fn substitute(e: Expression, name: &str, value: &Expression) -> PoolResult<Expression> {
    if !e.contains_symbol(name) {
        return Ok(e);
    }
    if e.kind() == ExprType::Symbol {
        return Ok(value.clone());
    }
    let pool = e.pool().clone();
    let kind = e.kind();
    let payload = e.payload();
    let shadowed = kind.is_parametered() && e.child(1).and_then(|variable| variable.name()).as_deref() == Some(name);
    let mut children = Vec::with_capacity(e.number_of_children());
    for (index, child) in e.into_children().into_iter().enumerate() {
        let keep = kind.is_parametered() && (index == 1 || (index == 0 && shadowed));
        children.push(if keep { child } else { substitute(child, name, value)? });
    }
    pool.build(kind, payload, children)
}

/// `diff(f, x, a)`: the derivative of `f` with respect to `x`, evaluated at `a`.
pub(super) fn reduce_derivative(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let [f, variable, point]: [Expression; 3] = match e.children().try_into() {
        Ok(children) => children,
        Err(_) => return Ok(pool.undefined()?),
    };
    let Some(name) = variable.name().filter(|_| variable.kind() == ExprType::Symbol) else {
        return Ok(pool.undefined()?);
    };
    match derivate(&pool, &f, &name, ctx)? {
        Some(derivative) => {
            let evaluated = substitute(derivative, &name, &point)?;
            deep_reduce(evaluated, ctx)
        }
        None => Ok(e),
    }
}

fn natural_logarithm(pool: &Pool, x: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    apply(pool, ExprType::Logarithm, [x, pool.constant(ConstantKind::E)?], ctx)
}

/// Radians per unit of the current angle unit, `None` for radians.
fn angle_scale(pool: &Pool, ctx: &ReductionContext) -> ReductionResult<Option<Expression>> {
    let Some(degrees) = ctx.angle_unit.half_turn_degrees() else {
        return Ok(None);
    };
    let pi = pool.constant(ConstantKind::Pi)?;
    Ok(Some(multiply(pool, vec![pool.fraction(1, i64::from(degrees))?, pi], ctx)?))
}

fn unary(pool: &Pool, kind: ExprType, x: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    apply(pool, kind, [x], ctx)
}

fn square(pool: &Pool, x: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    power(pool, x, pool.integer(2)?, ctx)
}

/// Derivative of `e` with respect to `x`, or `None` when it has no closed form here.
fn derivate(pool: &Pool, e: &Expression, x: &str, ctx: &ReductionContext) -> ReductionResult<Option<Expression>> {
    use ExprType::*;
    if !e.contains_symbol(x) {
        return Ok(Some(pool.integer(0)?));
    }
    let kind = e.kind();
    let children = e.children();

    let derivative = match (kind, children.as_slice()) {
        (Symbol, _) => pool.integer(1)?,
        (Addition, terms) => {
            let mut derivatives = Vec::with_capacity(terms.len());
            for term in terms {
                let Some(d) = derivate(pool, term, x, ctx)? else {
                    return Ok(None);
                };
                derivatives.push(d);
            }
            add(pool, derivatives, ctx)?
        }
        (Multiplication, factors) => {
            let mut terms = Vec::with_capacity(factors.len());
            for (index, factor) in factors.iter().enumerate() {
                let Some(d) = derivate(pool, factor, x, ctx)? else {
                    return Ok(None);
                };
                if d.is_rational_zero() {
                    continue;
                }
                let mut product = vec![d];
                product.extend(factors.iter().enumerate().filter(|(i, _)| *i != index).map(|(_, f)| f.clone()));
                terms.push(multiply(pool, product, ctx)?);
            }
            add(pool, terms, ctx)?
        }
        (Power, [base, exponent]) => {
            let base_varies = base.contains_symbol(x);
            let exponent_varies = exponent.contains_symbol(x);
            let Some(db) = derivate(pool, base, x, ctx)? else {
                return Ok(None);
            };
            let Some(dp) = derivate(pool, exponent, x, ctx)? else {
                return Ok(None);
            };
            if !exponent_varies {
                // p·b^(p-1)·b'
                let lowered = add(pool, vec![exponent.clone(), pool.integer(-1)?], ctx)?;
                let powered = power(pool, base.clone(), lowered, ctx)?;
                multiply(pool, vec![exponent.clone(), powered, db], ctx)?
            } else if !base_varies {
                // b^p·ln(b)·p'
                let logarithm = natural_logarithm(pool, base.clone(), ctx)?;
                multiply(pool, vec![e.clone(), logarithm, dp], ctx)?
            } else {
                // b^p·(p'·ln(b) + p·b'/b)
                let logarithm = natural_logarithm(pool, base.clone(), ctx)?;
                let first = multiply(pool, vec![dp, logarithm], ctx)?;
                let inverse = power(pool, base.clone(), pool.integer(-1)?, ctx)?;
                let second = multiply(pool, vec![exponent.clone(), db, inverse], ctx)?;
                let sum = add(pool, vec![first, second], ctx)?;
                multiply(pool, vec![e.clone(), sum], ctx)?
            }
        }
        (Sine | Cosine | Tangent | ArcSine | ArcCosine | ArcTangent, [u]) => {
            let Some(du) = derivate(pool, u, x, ctx)? else {
                return Ok(None);
            };
            let outer = match kind {
                Sine => unary(pool, Cosine, u.clone(), ctx)?,
                Cosine => {
                    let sine = unary(pool, Sine, u.clone(), ctx)?;
                    negate(pool, sine, ctx)?
                }
                Tangent => {
                    let cosine = unary(pool, Cosine, u.clone(), ctx)?;
                    power(pool, cosine, pool.integer(-2)?, ctx)?
                }
                ArcTangent => {
                    let denominator = add(pool, vec![pool.integer(1)?, square(pool, u.clone(), ctx)?], ctx)?;
                    power(pool, denominator, pool.integer(-1)?, ctx)?
                }
                _ => {
                    let squared = negate(pool, square(pool, u.clone(), ctx)?, ctx)?;
                    let radicand = add(pool, vec![pool.integer(1)?, squared], ctx)?;
                    let root = power(pool, radicand, pool.fraction(-1, 2)?, ctx)?;
                    if kind == ArcCosine { negate(pool, root, ctx)? } else { root }
                }
            };
            let mut factors = vec![outer, du];
            if let Some(scale) = angle_scale(pool, ctx)? {
                let scale = match kind {
                    Sine | Cosine | Tangent => scale,
                    _ => power(pool, scale, pool.integer(-1)?, ctx)?,
                };
                factors.push(scale);
            }
            multiply(pool, factors, ctx)?
        }
        (HyperbolicSine | HyperbolicCosine | HyperbolicTangent, [u]) => {
            let Some(du) = derivate(pool, u, x, ctx)? else {
                return Ok(None);
            };
            let outer = match kind {
                HyperbolicSine => unary(pool, HyperbolicCosine, u.clone(), ctx)?,
                HyperbolicCosine => unary(pool, HyperbolicSine, u.clone(), ctx)?,
                _ => {
                    let cosine = unary(pool, HyperbolicCosine, u.clone(), ctx)?;
                    power(pool, cosine, pool.integer(-2)?, ctx)?
                }
            };
            multiply(pool, vec![outer, du], ctx)?
        }
        (Logarithm, [u, base]) if !base.contains_symbol(x) => {
            let Some(du) = derivate(pool, u, x, ctx)? else {
                return Ok(None);
            };
            let inverse = power(pool, u.clone(), pool.integer(-1)?, ctx)?;
            let logarithm = natural_logarithm(pool, base.clone(), ctx)?;
            let scale = power(pool, logarithm, pool.integer(-1)?, ctx)?;
            multiply(pool, vec![du, inverse, scale], ctx)?
        }
        _ => return Ok(None),
    };
    Ok(Some(derivative))
}
