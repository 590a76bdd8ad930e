//! Reduction: rewriting a tree into its canonical form.
//!
//! Role
//! - [`Expression::reduce`] copies the input, reduces the copy bottom-up and, for
//!   [`Target::User`], beautifies the result for display. Failures roll the pool back to the
//!   state it had before the call.
//! - `shallow_reduce` rewrites one node whose children are already reduced. It dispatches on
//!   the node kind to the submodules below.
//!
//! Canonical trees use only Addition, Multiplication and Power for arithmetic: `a-b` becomes
//! `a+(-1)·b`, `a/b` becomes `a·b^-1`, roots become rational powers and every logarithm
//! carries an explicit base.
//!
//! Example
//! ```rust
//! use hycas::{Pool, context::EmptyContext, reduce::ReductionContext};
//! let pool = Pool::new();
//! let e = pool.parse("3+x+2").unwrap();
//! let reduced = e.reduce(ReductionContext::new(&EmptyContext)).unwrap();
//! assert_eq!(reduced.to_string(), "x+5");
//! ```

mod arithmetic;
mod beautify;
mod calculus;
mod complex;
mod integer;
mod list;
mod logarithm;
mod matrix;
mod power;
mod symbols;
mod trigonometry;

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use log::{debug, trace};
use thiserror::Error;

use crate::{
    context::Context,
    expr::{Expression, number::{DecimalValue, decimal_value}, variant::{ConstantKind, ExprType}},
    pool::{Pool, PoolError},
    settings::{AngleUnit, ComplexFormat, SymbolicComputation, Target, UnitFormat},
};

pub use calculus::substitute;
pub use symbols::is_circular;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReductionError {
    #[error("reduction was interrupted")]
    Interrupted,
    #[error("reduction ran out of memory: {0}")]
    AllocationFailure(#[from] PoolError),
}

pub type ReductionResult<T> = Result<T, ReductionError>;

/// Cooperative interruption flag, shareable across threads.
///
/// An optional step budget trips the breaker by itself once that many nodes have been polled.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    tripped: Arc<AtomicBool>,
    budget: Option<Arc<AtomicU64>>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_budget(steps: u64) -> Self {
        Self { tripped: Arc::default(), budget: Some(Arc::new(AtomicU64::new(steps))) }
    }

    pub fn trip(&self) {
        self.tripped.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.tripped.store(false, Ordering::Relaxed);
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Relaxed)
    }

    /// Consume one step and report whether the computation must stop.
    pub fn poll(&self) -> bool {
        if let Some(budget) = &self.budget {
            let exhausted = budget
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1))
                .is_err();
            if exhausted {
                self.trip();
            }
        }
        self.is_tripped()
    }
}

/// Variable bound by an enclosing `diff`, `int`, `sum` or `product`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoundVariable<'a> {
    name: &'a str,
    outer: Option<&'a BoundVariable<'a>>,
}

/// Settings under which a tree is reduced. Derive variants with the `with_*` builders.
#[derive(Clone, Copy)]
pub struct ReductionContext<'a> {
    context: &'a dyn Context,
    pub target: Target,
    pub complex_format: ComplexFormat,
    pub angle_unit: AngleUnit,
    pub unit_format: UnitFormat,
    pub symbolic_computation: SymbolicComputation,
    breaker: Option<&'a CircuitBreaker>,
    bound: Option<&'a BoundVariable<'a>>,
}

impl<'a> ReductionContext<'a> {
    pub fn new(context: &'a dyn Context) -> Self {
        Self {
            context,
            target: Target::default(),
            complex_format: ComplexFormat::default(),
            angle_unit: AngleUnit::default(),
            unit_format: UnitFormat::default(),
            symbolic_computation: SymbolicComputation::default(),
            breaker: None,
            bound: None,
        }
    }

    pub fn with_target(self, target: Target) -> Self {
        Self { target, ..self }
    }

    pub fn with_complex_format(self, complex_format: ComplexFormat) -> Self {
        Self { complex_format, ..self }
    }

    pub fn with_angle_unit(self, angle_unit: AngleUnit) -> Self {
        Self { angle_unit, ..self }
    }

    pub fn with_unit_format(self, unit_format: UnitFormat) -> Self {
        Self { unit_format, ..self }
    }

    pub fn with_symbolic_computation(self, symbolic_computation: SymbolicComputation) -> Self {
        Self { symbolic_computation, ..self }
    }

    pub fn with_circuit_breaker(self, breaker: &'a CircuitBreaker) -> Self {
        Self { breaker: Some(breaker), ..self }
    }

    pub fn context(&self) -> &'a dyn Context {
        self.context
    }

    pub fn circuit_breaker(&self) -> Option<&'a CircuitBreaker> {
        self.breaker
    }

    pub(crate) fn with_bound<'b>(&self, variable: &'b BoundVariable<'b>) -> ReductionContext<'b>
    where
        'a: 'b,
    {
        ReductionContext { bound: Some(variable), ..*self }
    }

    pub(crate) fn bind<'b>(&'b self, name: &'b str) -> BoundVariable<'b> {
        BoundVariable { name, outer: self.bound }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        let mut current = self.bound;
        while let Some(variable) = current {
            if variable.name == name {
                return true;
            }
            current = variable.outer;
        }
        false
    }

    fn check(&self) -> ReductionResult<()> {
        match self.breaker {
            Some(breaker) if breaker.poll() => Err(ReductionError::Interrupted),
            _ => Ok(()),
        }
    }
}

impl Expression {
    /// Reduce a copy of this tree. The pool is rolled back when the reduction fails.
    pub fn reduce(&self, ctx: ReductionContext<'_>) -> ReductionResult<Expression> {
        let pool = self.pool().clone();
        let checkpoint = pool.checkpoint();
        let result = (|| {
            let working = self.deep_clone()?;
            let reduced = deep_reduce(working, &ctx)?;
            match ctx.target {
                Target::User => beautify::beautify(reduced),
                _ => Ok(reduced),
            }
        })();
        if let Err(error) = &result {
            debug!("reduction failed ({error}), rolling back");
            pool.rollback(checkpoint);
        }
        result
    }
}

/// Reduce the children of `e`, then `e` itself.
pub(crate) fn deep_reduce(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    ctx.check()?;
    let kind = e.kind();
    trace!("reducing {kind:?}");
    if e.number_of_children() == 0 {
        return shallow_reduce(e, ctx);
    }
    let pool = e.pool().clone();
    if kind == ExprType::Store {
        return match e.into_children().into_iter().next() {
            Some(value) => deep_reduce(value, ctx),
            None => Ok(pool.undefined()?),
        };
    }

    let payload = e.payload();
    let children = e.into_children();
    let reduced = if kind.is_parametered() {
        let name = children.get(1).and_then(Expression::name).unwrap_or_default();
        let variable = ctx.bind(&name);
        let inner = ctx.with_bound(&variable);
        let mut reduced = Vec::with_capacity(children.len());
        for (index, child) in children.into_iter().enumerate() {
            reduced.push(match index {
                0 => deep_reduce(child, &inner)?,
                1 => child,
                _ => deep_reduce(child, ctx)?,
            });
        }
        reduced
    } else {
        children.into_iter().map(|child| deep_reduce(child, ctx)).collect::<ReductionResult<Vec<_>>>()?
    };
    let rebuilt = pool.build(kind, payload, reduced)?;
    shallow_reduce(rebuilt, ctx)
}

/// Rewrite a node whose children are reduced.
pub(crate) fn shallow_reduce(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    use ExprType::*;
    let pool = e.pool().clone();
    let kind = e.kind();

    if e.number_of_children() > 0 {
        let children = e.children();
        // Lists are values only inside the list functions.
        let takes_lists = kind.is_list_function() || kind == Parenthesis;
        if !takes_lists && children.iter().any(Expression::is_list) {
            return Ok(pool.undefined()?);
        }
    }
    if !matches!(kind, Matrix | List) && e.number_of_children() > 0 {
        let children = e.children();
        if children.iter().any(|c| c.kind() == Undefined) {
            return Ok(pool.undefined()?);
        }
        if children.iter().any(|c| c.kind() == Nonreal) {
            return Ok(pool.nonreal()?);
        }
    }
    if kind != Matrix && e.number_of_children() > 0 {
        let takes_matrices = kind.is_matrix_function()
            || matches!(kind, Addition | Multiplication | Power | Opposite | Subtraction | Division | Parenthesis);
        if !takes_matrices && e.children().iter().any(Expression::is_matrix) {
            return Ok(pool.undefined()?);
        }
    }

    match kind {
        Undefined | Nonreal | Rational | Infinity => Ok(e),
        Decimal => reduce_decimal(e),
        Constant => match e.constant() {
            Some(ConstantKind::ImaginaryUnit) if ctx.complex_format == ComplexFormat::Real => {
                Ok(pool.nonreal()?)
            }
            _ => Ok(e),
        },
        Symbol => symbols::reduce_symbol(e, ctx),
        Function => symbols::reduce_function(e, ctx),
        Addition => arithmetic::reduce_addition(e, ctx),
        Subtraction => arithmetic::reduce_subtraction(e, ctx),
        Multiplication => arithmetic::reduce_multiplication(e, ctx),
        Division => arithmetic::reduce_division(e, ctx),
        Opposite => arithmetic::reduce_opposite(e, ctx),
        Power => power::reduce_power(e, ctx),
        Factorial => integer::reduce_factorial(e),
        Parenthesis | Store => Ok(e.into_children().into_iter().next().map_or_else(|| pool.undefined(), Ok)?),
        Comparison => reduce_comparison(e),
        Matrix | List => Ok(e),
        AbsoluteValue | ComplexArgument | RealPart | ImaginaryPart | Conjugate => complex::reduce(e, ctx),
        SquareRoot | NthRoot => power::reduce_root(e, ctx),
        NaperianLogarithm | CommonLogarithm | Logarithm => logarithm::reduce(e, ctx),
        Sine | Cosine | Tangent | ArcSine | ArcCosine | ArcTangent | HyperbolicSine | HyperbolicCosine
        | HyperbolicTangent | HyperbolicArcSine | HyperbolicArcCosine | HyperbolicArcTangent => {
            trigonometry::reduce(e, ctx)
        }
        Floor | Ceiling | FracPart | Round | GreatCommonDivisor | LeastCommonMultiple | DivisionQuotient
        | DivisionRemainder | BinomialCoefficient | PermuteCoefficient => integer::reduce(e),
        Determinant | MatrixInverse | MatrixTrace | MatrixTranspose | MatrixDimension => {
            matrix::reduce_function(e, ctx)
        }
        ListSum | ListMean => list::reduce_function(e, ctx),
        Derivative => calculus::reduce_derivative(e, ctx),
        Integral | Sum | Product => Ok(e),
    }
}

fn reduce_decimal(e: Expression) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let Some(value) = e.decimal() else {
        return Ok(e);
    };
    Ok(match decimal_value(&value) {
        DecimalValue::Overflow { negative } => pool.infinity(negative)?,
        DecimalValue::Underflow => pool.integer(0)?,
        DecimalValue::Finite(value) => pool.rational(value)?,
    })
}

fn reduce_comparison(e: Expression) -> ReductionResult<Expression> {
    use crate::expr::variant::ComparisonOperator;
    let (Some(lhs), Some(rhs)) = (e.child(0), e.child(1)) else {
        return Ok(e);
    };
    if e.comparison_operator() == Some(ComparisonOperator::Equal) && lhs.is_identical_to(&rhs) {
        return Ok(e.pool().integer(1)?);
    }
    Ok(e)
}

/// Build a node and reduce it, assuming its children are reduced.
pub(crate) fn apply(
    pool: &Pool,
    kind: ExprType,
    children: impl IntoIterator<Item = Expression>,
    ctx: &ReductionContext,
) -> ReductionResult<Expression> {
    shallow_reduce(pool.operator(kind, children)?, ctx)
}

pub(crate) fn add(pool: &Pool, terms: Vec<Expression>, ctx: &ReductionContext) -> ReductionResult<Expression> {
    apply(pool, ExprType::Addition, terms, ctx)
}

pub(crate) fn multiply(
    pool: &Pool,
    factors: Vec<Expression>,
    ctx: &ReductionContext,
) -> ReductionResult<Expression> {
    apply(pool, ExprType::Multiplication, factors, ctx)
}

pub(crate) fn power(
    pool: &Pool,
    base: Expression,
    exponent: Expression,
    ctx: &ReductionContext,
) -> ReductionResult<Expression> {
    apply(pool, ExprType::Power, [base, exponent], ctx)
}

pub(crate) fn negate(pool: &Pool, e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    multiply(pool, vec![pool.integer(-1)?, e], ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EmptyContext;

    #[test]
    fn step_budget_trips_the_breaker() {
        let breaker = CircuitBreaker::with_step_budget(2);
        assert!(!breaker.poll());
        assert!(!breaker.poll());
        assert!(breaker.poll());
        assert!(breaker.is_tripped());
        breaker.reset();
        assert!(breaker.poll());
    }

    #[test]
    fn bound_variables_shadow_outward() {
        let ctx = ReductionContext::new(&EmptyContext);
        let outer = ctx.bind("n");
        let ctx = ctx.with_bound(&outer);
        let inner = ctx.bind("k");
        let ctx = ctx.with_bound(&inner);
        assert!(ctx.is_bound("k"));
        assert!(ctx.is_bound("n"));
        assert!(!ctx.is_bound("x"));
    }
}
