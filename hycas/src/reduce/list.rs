//! `sum` and `mean` over lists.
//!
//! A list function is only rewritten once every argument is a list literal. A symbol or user
//! function argument may still expand to a list, so the call is kept as written; any other
//! argument makes it undefined.

use num_bigint::BigInt;
use num_rational::BigRational;

use super::{ReductionContext, ReductionResult, add, multiply, power};
use crate::{
    expr::{Expression, sign::Sign, variant::ExprType},
    pool::Pool,
};

pub(super) fn reduce_function(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let arguments = e.children();
    if !arguments.iter().all(Expression::is_list) {
        let pending = arguments
            .iter()
            .all(|argument| argument.is_list() || matches!(argument.kind(), ExprType::Symbol | ExprType::Function));
        return if pending { Ok(e) } else { Ok(pool.undefined()?) };
    }

    match (e.kind(), arguments.as_slice()) {
        (ExprType::ListSum, [list]) => sum(&pool, list.children(), ctx),
        (ExprType::ListMean, [list]) => mean(&pool, list.children(), ctx),
        (ExprType::ListMean, [values, weights]) => {
            let count = values.number_of_children();
            if count == 0 || weights.number_of_children() != count {
                return Ok(pool.undefined()?);
            }
            let weights = weights.children();
            if !weights.iter().all(|weight| matches!(weight.sign(), Sign::Positive | Sign::Null)) {
                return Ok(e);
            }
            weighted_mean(&pool, values.children(), weights, ctx)
        }
        _ => Ok(pool.undefined()?),
    }
}

/// Sum of the elements, 0 for an empty list.
fn sum(pool: &Pool, elements: Vec<Expression>, ctx: &ReductionContext) -> ReductionResult<Expression> {
    if elements.is_empty() {
        return Ok(pool.integer(0)?);
    }
    add(pool, elements, ctx)
}

fn mean(pool: &Pool, elements: Vec<Expression>, ctx: &ReductionContext) -> ReductionResult<Expression> {
    if elements.is_empty() {
        return Ok(pool.undefined()?);
    }
    let inverse_count = BigRational::new(BigInt::from(1), BigInt::from(elements.len()));
    let total = sum(pool, elements, ctx)?;
    multiply(pool, vec![total, pool.rational(inverse_count)?], ctx)
}

/// `Σ v·w / Σ w`. A zero total weight makes the inverse, and so the mean, undefined.
fn weighted_mean(
    pool: &Pool,
    values: Vec<Expression>,
    weights: Vec<Expression>,
    ctx: &ReductionContext,
) -> ReductionResult<Expression> {
    let mut products = Vec::with_capacity(values.len());
    for (value, weight) in values.into_iter().zip(weights.iter()) {
        products.push(multiply(pool, vec![value, weight.clone()], ctx)?);
    }
    let numerator = sum(pool, products, ctx)?;
    let total_weight = sum(pool, weights, ctx)?;
    let inverse = power(pool, total_weight, pool.integer(-1)?, ctx)?;
    multiply(pool, vec![numerator, inverse], ctx)
}

#[cfg(test)]
mod tests {
    use crate::{
        Pool,
        context::{EmptyContext, VariableContext},
        reduce::ReductionContext,
    };

    fn reduce(text: &str) -> String {
        let pool = Pool::with_capacity(32768);
        pool.parse(text).unwrap().reduce(ReductionContext::new(&EmptyContext)).unwrap().to_string()
    }

    #[test]
    fn sums_and_means_of_literals() {
        assert_eq!(reduce("sum({1,2,3})"), "6");
        assert_eq!(reduce("sum({})"), "0");
        assert_eq!(reduce("sum({x,1,2})"), "x+3");
        assert_eq!(reduce("mean({1,2,3})"), "2");
        assert_eq!(reduce("mean({1,2})"), "3/2");
        assert_eq!(reduce("mean({})"), "undef");
    }

    #[test]
    fn weighted_means() {
        assert_eq!(reduce("mean({1,2},{1,3})"), "7/4");
        assert_eq!(reduce("mean({5,7},{0,2})"), "7");
        assert_eq!(reduce("mean({1,2},{0,0})"), "undef");
        assert_eq!(reduce("mean({1,2},{1})"), "undef");
        assert_eq!(reduce("mean({1,2},{-1,3})"), "mean({1,2},{-1,3})");
        assert_eq!(reduce("mean({1,2},{x,1})"), "mean({1,2},{x,1})");
    }

    #[test]
    fn arguments_that_are_not_lists() {
        assert_eq!(reduce("sum(3)"), "undef");
        assert_eq!(reduce("mean(L)"), "mean(L)");
        assert_eq!(reduce("{1,{2}}"), "undef");
        assert_eq!(reduce("{1,2}+1"), "undef");
        assert_eq!(reduce("cos({1})"), "undef");
        assert_eq!(reduce("{[[1]]}"), "undef");
    }

    #[test]
    fn stored_lists_are_expanded() {
        let pool = Pool::with_capacity(32768);
        let mut context = VariableContext::new();
        context.store(&pool.parse("{2,4,9}→L").unwrap()).unwrap();
        let ctx = ReductionContext::new(&context);
        assert_eq!(pool.parse("sum(L)").unwrap().reduce(ctx).unwrap().to_string(), "15");
        assert_eq!(pool.parse("mean(L)").unwrap().reduce(ctx).unwrap().to_string(), "5");
    }
}
