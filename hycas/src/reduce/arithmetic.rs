//! Sums and products.
//!
//! Subtraction, Opposite and Division never survive reduction: they are rewritten in terms of
//! Addition, Multiplication and Power first.

use num_rational::BigRational;
use num_traits::{One, Zero};

use super::{ReductionContext, ReductionResult, add, matrix, multiply, negate, power};
use crate::{
    expr::{Expression, order::sort_by_simplification_order, sign::Sign, variant::ExprType},
    pool::{Pool, PoolResult},
};

/// Children of `e` with nested nodes of the same kind spliced in place, order preserved.
pub(super) fn flatten(e: Expression, kind: ExprType) -> Vec<Expression> {
    let mut flat = Vec::new();
    let mut pending = e.into_children();
    pending.reverse();
    while let Some(child) = pending.pop() {
        if child.kind() == kind {
            let mut nested = child.into_children();
            nested.reverse();
            pending.extend(nested);
        } else {
            flat.push(child);
        }
    }
    flat
}

fn poisoned(pool: &Pool, operands: &[Expression]) -> PoolResult<Option<Expression>> {
    if operands.iter().any(|e| e.kind() == ExprType::Undefined) {
        return pool.undefined().map(Some);
    }
    if operands.iter().any(|e| e.kind() == ExprType::Nonreal) {
        return pool.nonreal().map(Some);
    }
    Ok(None)
}

/// Node of `kind` over `operands`, collapsing the empty and single-operand cases.
pub(super) fn assemble(
    pool: &Pool,
    kind: ExprType,
    mut operands: Vec<Expression>,
    neutral: i64,
) -> PoolResult<Expression> {
    if operands.len() > 1 {
        return pool.operator(kind, operands);
    }
    match operands.pop() {
        Some(single) => Ok(single),
        None => pool.integer(neutral),
    }
}

/// `(c, rest)` such that `term = c·rest`.
fn split_coefficient(pool: &Pool, term: Expression) -> PoolResult<(BigRational, Expression)> {
    let coefficient = match term.kind() {
        ExprType::Multiplication => term.child(0).and_then(|first| first.rational()),
        _ => None,
    };
    let Some(coefficient) = coefficient else {
        return Ok((BigRational::one(), term));
    };
    let mut factors = term.into_children();
    factors.remove(0);
    Ok((coefficient, assemble(pool, ExprType::Multiplication, factors, 1)?))
}

/// `c·rest`, keeping the product flat. `rest` must already be canonical.
fn with_coefficient(pool: &Pool, coefficient: BigRational, rest: Expression) -> PoolResult<Expression> {
    if coefficient.is_one() {
        return Ok(rest);
    }
    let mut factors = vec![pool.rational(coefficient)?];
    if rest.kind() == ExprType::Multiplication {
        factors.extend(rest.into_children());
    } else {
        factors.push(rest);
    }
    pool.operator(ExprType::Multiplication, factors)
}

pub(super) fn reduce_addition(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let terms = flatten(e, ExprType::Addition);
    if let Some(poison) = poisoned(&pool, &terms)? {
        return Ok(poison);
    }
    if terms.iter().any(Expression::is_matrix) {
        return matrix::add_matrices(&pool, terms, ctx);
    }

    let mut infinity: Option<bool> = None;
    for negative in terms.iter().filter_map(Expression::infinity_is_negative) {
        match infinity {
            Some(previous) if previous != negative => return Ok(pool.undefined()?),
            _ => infinity = Some(negative),
        }
    }
    if let Some(negative) = infinity {
        if terms.iter().all(|term| term.kind().is_number()) {
            return Ok(pool.infinity(negative)?);
        }
    }

    let mut constant = BigRational::zero();
    let mut groups: Vec<(BigRational, Expression)> = Vec::new();
    for term in terms {
        if let Some(value) = term.rational() {
            constant += value;
            continue;
        }
        let (coefficient, rest) = split_coefficient(&pool, term)?;
        match groups.iter_mut().find(|(_, other)| other.is_identical_to(&rest)) {
            Some((sum, _)) => *sum += coefficient,
            None => groups.push((coefficient, rest)),
        }
    }

    let mut result = Vec::with_capacity(groups.len() + 1);
    for (coefficient, rest) in groups {
        if !coefficient.is_zero() {
            result.push(with_coefficient(&pool, coefficient, rest)?);
        }
    }
    if !constant.is_zero() {
        result.push(pool.rational(constant)?);
    }
    sort_by_simplification_order(&mut result);
    Ok(assemble(&pool, ExprType::Addition, result, 0)?)
}

pub(super) fn reduce_multiplication(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let factors = flatten(e, ExprType::Multiplication);
    if let Some(poison) = poisoned(&pool, &factors)? {
        return Ok(poison);
    }
    if factors.iter().any(Expression::is_matrix) {
        return matrix::multiply_matrices(&pool, factors, ctx);
    }
    if factors.iter().any(Expression::is_rational_zero) {
        if factors.iter().any(|f| f.kind() == ExprType::Infinity) {
            return Ok(pool.undefined()?);
        }
        return Ok(pool.integer(0)?);
    }
    if factors.iter().any(|f| f.kind() == ExprType::Infinity) && factors.iter().all(|f| f.sign().is_strict()) {
        let sign = factors.iter().fold(Sign::Positive, |sign, f| sign.multiply(f.sign()));
        return Ok(pool.infinity(sign == Sign::Negative)?);
    }

    let mut coefficient = BigRational::one();
    let mut groups: Vec<(Expression, Vec<Expression>)> = Vec::new();
    for factor in factors {
        if let Some(value) = factor.rational() {
            coefficient *= value;
            continue;
        }
        let (base, exponent) = if factor.kind() == ExprType::Power {
            match factor.into_operands::<2>() {
                Some([base, exponent]) => (base, exponent),
                None => return Ok(pool.undefined()?),
            }
        } else {
            (factor, pool.integer(1)?)
        };
        match groups.iter_mut().find(|(other, _)| other.is_identical_to(&base)) {
            Some((_, exponents)) => exponents.push(exponent),
            None => groups.push((base, vec![exponent])),
        }
    }

    let mut merged = Vec::with_capacity(groups.len());
    let mut spliced = false;
    for (base, mut exponents) in groups {
        let combined = match exponents.pop() {
            Some(exponent) if exponents.is_empty() => {
                if exponent.is_rational_one() { base } else { pool.operator(ExprType::Power, [base, exponent])? }
            }
            last => {
                exponents.extend(last);
                let exponent = add(&pool, exponents, ctx)?;
                power(&pool, base, exponent, ctx)?
            }
        };
        if let Some(value) = combined.rational() {
            coefficient *= value;
        } else if combined.kind() == ExprType::Multiplication {
            spliced = true;
            merged.extend(combined.into_children());
        } else if combined.kind().is_poison() {
            return Ok(combined);
        } else {
            merged.push(combined);
        }
    }
    if coefficient.is_zero() {
        return Ok(pool.integer(0)?);
    }
    if spliced {
        merged.insert(0, pool.rational(coefficient)?);
        return multiply(&pool, merged, ctx);
    }

    if let Some(index) = merged.iter().position(|f| f.kind() == ExprType::Addition) {
        let sum = merged.remove(index);
        let mut terms = Vec::with_capacity(sum.number_of_children());
        for term in sum.into_children() {
            let mut product = Vec::with_capacity(merged.len() + 2);
            product.push(pool.rational(coefficient.clone())?);
            product.extend(merged.iter().cloned());
            product.push(term);
            terms.push(multiply(&pool, product, ctx)?);
        }
        return add(&pool, terms, ctx);
    }

    sort_by_simplification_order(&mut merged);
    if !coefficient.is_one() {
        merged.insert(0, pool.rational(coefficient)?);
    }
    Ok(assemble(&pool, ExprType::Multiplication, merged, 1)?)
}

pub(super) fn reduce_subtraction(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let Some([lhs, rhs]) = e.into_operands::<2>() else {
        return Ok(pool.undefined()?);
    };
    let rhs = negate(&pool, rhs, ctx)?;
    add(&pool, vec![lhs, rhs], ctx)
}

pub(super) fn reduce_opposite(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let Some([operand]) = e.into_operands::<1>() else {
        return Ok(pool.undefined()?);
    };
    negate(&pool, operand, ctx)
}

/// `a/b` is `a·b^-1`. A zero denominator gives an infinity signed by the numerator, or
/// Undefined when that sign is zero or unknown.
pub(super) fn reduce_division(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let Some([numerator, denominator]) = e.into_operands::<2>() else {
        return Ok(pool.undefined()?);
    };
    if denominator.is_rational_zero() {
        return Ok(match numerator.sign() {
            Sign::Positive => pool.infinity(false)?,
            Sign::Negative => pool.infinity(true)?,
            Sign::Null | Sign::Unknown => pool.undefined()?,
        });
    }
    let inverse = power(&pool, denominator, pool.integer(-1)?, ctx)?;
    multiply(&pool, vec![numerator, inverse], ctx)
}
