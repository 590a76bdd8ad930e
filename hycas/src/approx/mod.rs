//! Numeric approximation of expression trees in `f32` or `f64`.
//!
//! Role
//! - [`Expression::approximate`] evaluates a tree to a complex number of the requested
//!   [`Precision`]. Undefined results are `(NaN, NaN)`; matrices and lists approximate to NaN
//!   through this entry point and to their entries through [`Expression::approximate_evaluation`].
//! - Symbols and user functions are looked up in the [`Context`] of the
//!   [`ApproximationContext`]; bound variables of `sum`, `product`, `int` and `diff` shadow them.
//!
//! Evaluation never fails: domain errors, circular definitions and interruptions all produce
//! NaN. Imaginary parts that are only rounding noise are flushed to zero before returning, and
//! the `Real` complex format turns a remaining imaginary part into NaN.
//!
//! Example
//! ```rust
//! use hycas::{Pool, approx::ApproximationContext, context::EmptyContext};
//! let pool = Pool::new();
//! let e = pool.parse("1+2×3").unwrap();
//! let value = e.approximate::<f64>(&ApproximationContext::new(&EmptyContext));
//! assert_eq!(value.re, 7.0);
//! assert_eq!(value.im, 0.0);
//! ```

mod calculus;
mod matrix;
mod scalar;

use std::fmt;

use log::trace;
use num_complex::Complex;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{Float, FloatConst, FromPrimitive, ToPrimitive, Zero};

use crate::{
    context::Context,
    expr::{
        Expression,
        variant::{ConstantKind, ExprType},
    },
    reduce::{CircuitBreaker, ReductionContext},
    settings::{AngleUnit, ComplexFormat},
};

/// Floating-point types approximations are computed in.
pub trait Precision: Float + FloatConst + FromPrimitive + fmt::Debug + fmt::Display + 'static {
    /// Decimal digits the type carries reliably.
    const SIGNIFICANT_DIGITS: usize;

    fn from_f64_lossy(value: f64) -> Self;

    /// Largest imaginary part, relative to the real part, that counts as rounding noise.
    fn imaginary_noise() -> Self {
        Self::epsilon() * Self::from_f64_lossy(100.0)
    }
}

impl Precision for f32 {
    const SIGNIFICANT_DIGITS: usize = 7;

    fn from_f64_lossy(value: f64) -> Self {
        value as f32
    }
}

impl Precision for f64 {
    const SIGNIFICANT_DIGITS: usize = 15;

    fn from_f64_lossy(value: f64) -> Self {
        value
    }
}

pub(crate) fn undefined<T: Precision>() -> Complex<T> {
    Complex::new(T::nan(), T::nan())
}

/// Numeric matrix in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixEvaluation<T> {
    pub rows: usize,
    pub columns: usize,
    pub entries: Vec<Complex<T>>,
}

/// Result of approximating a tree that may evaluate to a matrix or a list.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation<T> {
    Complex(Complex<T>),
    Matrix(MatrixEvaluation<T>),
    List(Vec<Complex<T>>),
}

impl<T: Precision> Evaluation<T> {
    pub fn undefined() -> Self {
        Evaluation::Complex(undefined())
    }

    fn real(value: T) -> Self {
        Evaluation::Complex(scalar::real(value))
    }

    /// Scalar value, NaN for matrices and lists.
    pub fn into_complex(self) -> Complex<T> {
        match self {
            Evaluation::Complex(value) => value,
            Evaluation::Matrix(_) | Evaluation::List(_) => undefined(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        match self {
            Evaluation::Complex(value) => value.re.is_nan() || value.im.is_nan(),
            Evaluation::Matrix(_) | Evaluation::List(_) => false,
        }
    }
}

/// Settings under which a tree is approximated.
#[derive(Clone, Copy)]
pub struct ApproximationContext<'a> {
    context: &'a dyn Context,
    pub complex_format: ComplexFormat,
    pub angle_unit: AngleUnit,
    breaker: Option<&'a CircuitBreaker>,
}

impl<'a> ApproximationContext<'a> {
    pub fn new(context: &'a dyn Context) -> Self {
        Self {
            context,
            complex_format: ComplexFormat::default(),
            angle_unit: AngleUnit::default(),
            breaker: None,
        }
    }

    pub fn with_complex_format(self, complex_format: ComplexFormat) -> Self {
        Self { complex_format, ..self }
    }

    pub fn with_angle_unit(self, angle_unit: AngleUnit) -> Self {
        Self { angle_unit, ..self }
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
}

impl<'a> From<&ReductionContext<'a>> for ApproximationContext<'a> {
    fn from(ctx: &ReductionContext<'a>) -> Self {
        let approximation = ApproximationContext::new(ctx.context())
            .with_complex_format(ctx.complex_format)
            .with_angle_unit(ctx.angle_unit);
        match ctx.circuit_breaker() {
            Some(breaker) => approximation.with_circuit_breaker(breaker),
            None => approximation,
        }
    }
}

impl Expression {
    /// Evaluate this tree to a complex number; matrices and lists evaluate to NaN.
    pub fn approximate<T: Precision>(&self, ctx: &ApproximationContext) -> Complex<T> {
        self.approximate_evaluation(ctx).into_complex()
    }

    /// Evaluate this tree, keeping matrix and list results.
    pub fn approximate_evaluation<T: Precision>(&self, ctx: &ApproximationContext) -> Evaluation<T> {
        let mut approximator = Approximator::new(ctx);
        let evaluation = approximator.evaluate(self);
        if approximator.interrupted {
            trace!("approximation interrupted");
            return Evaluation::undefined();
        }
        match evaluation {
            Evaluation::Complex(value) => Evaluation::Complex(finalize(value, ctx.complex_format)),
            Evaluation::Matrix(matrix) => Evaluation::Matrix(matrix.map(|value| finalize(value, ctx.complex_format))),
            Evaluation::List(values) => {
                Evaluation::List(values.into_iter().map(|value| finalize(value, ctx.complex_format)).collect())
            }
        }
    }
}

/// Flush imaginary noise and apply the complex format.
///
/// Once the imaginary part is known to be significant, a real part that is noise next to it
/// is flushed the same way.
fn finalize<T: Precision>(value: Complex<T>, format: ComplexFormat) -> Complex<T> {
    if value.re.is_nan() || value.im.is_nan() {
        return undefined();
    }
    let is_noise = |part: T, reference: T| part.abs() <= T::imaginary_noise() * T::one().max(reference.abs());
    let im = if is_noise(value.im, value.re) { T::zero() } else { value.im };
    if format == ComplexFormat::Real && !im.is_zero() {
        return undefined();
    }
    let re = if !im.is_zero() && is_noise(value.re, im) { T::zero() } else { value.re };
    Complex::new(re, im)
}

/// Tree walker carrying the values of bound variables and the names being expanded.
pub(crate) struct Approximator<'c, 'a, T> {
    ctx: &'c ApproximationContext<'a>,
    bindings: Vec<(String, Complex<T>)>,
    expanding: Vec<String>,
    interrupted: bool,
}

impl<'c, 'a, T: Precision> Approximator<'c, 'a, T> {
    fn new(ctx: &'c ApproximationContext<'a>) -> Self {
        Self { ctx, bindings: Vec::new(), expanding: Vec::new(), interrupted: false }
    }

    fn poll(&mut self) -> bool {
        if !self.interrupted {
            self.interrupted = self.ctx.breaker.is_some_and(CircuitBreaker::poll);
        }
        self.interrupted
    }

    /// Evaluate `e` with `name` bound to `value`.
    pub(crate) fn with_binding(&mut self, name: &str, value: Complex<T>, e: &Expression) -> Evaluation<T> {
        self.bindings.push((name.to_owned(), value));
        let result = self.evaluate(e);
        self.bindings.pop();
        result
    }

    /// Evaluate `e` to a scalar, NaN when it is a matrix or a list.
    pub(crate) fn scalar(&mut self, e: &Expression) -> Complex<T> {
        self.evaluate(e).into_complex()
    }

    pub(crate) fn evaluate(&mut self, e: &Expression) -> Evaluation<T> {
        use ExprType::*;
        if self.poll() {
            return Evaluation::undefined();
        }
        let kind = e.kind();
        match kind {
            Undefined | Nonreal | Comparison => Evaluation::undefined(),
            Rational => {
                let value = e.rational().and_then(|r| r.to_f64()).unwrap_or(f64::NAN);
                Evaluation::real(T::from_f64_lossy(value))
            }
            Decimal => {
                let value = e.decimal().and_then(|d| d.to_f64()).unwrap_or(f64::NAN);
                Evaluation::real(T::from_f64_lossy(value))
            }
            Infinity => match e.infinity_is_negative() {
                Some(true) => Evaluation::real(T::neg_infinity()),
                _ => Evaluation::real(T::infinity()),
            },
            Constant => match e.constant() {
                Some(ConstantKind::Pi) => Evaluation::real(T::PI()),
                Some(ConstantKind::E) => Evaluation::real(T::E()),
                Some(ConstantKind::ImaginaryUnit) => Evaluation::Complex(Complex::i()),
                None => Evaluation::undefined(),
            },
            Symbol => self.symbol(e),
            Function => self.user_function(e),
            Parenthesis | Store => self.first_child(e),
            Matrix => self.matrix(e),
            List => self.list(e),
            Addition | Multiplication => self.fold(e),
            Subtraction => self.binary_arithmetic(e, |a, b| arithmetic(Addition, a, negate(b))),
            Division => self.binary_arithmetic(e, divide),
            Opposite => negate(self.first_child(e)),
            Power => self.power(e),
            Determinant | MatrixInverse | MatrixTrace | MatrixTranspose | MatrixDimension => {
                let argument = self.first_child(e);
                matrix_function(kind, argument)
            }
            ListSum | ListMean => self.list_function(e),
            Derivative => self.derivative(e),
            Integral => self.integral(e),
            Sum | Product => self.series(e),
            _ => {
                let arguments: Vec<Complex<T>> = e.children().iter().map(|child| self.scalar(child)).collect();
                let value = match arguments.as_slice() {
                    [x] => scalar::unary(kind, *x, self.ctx),
                    [a, b] => scalar::binary(kind, *a, *b, self.ctx),
                    _ => undefined(),
                };
                Evaluation::Complex(value)
            }
        }
    }

    fn first_child(&mut self, e: &Expression) -> Evaluation<T> {
        match e.child(0) {
            Some(child) => self.evaluate(&child),
            None => Evaluation::undefined(),
        }
    }

    fn symbol(&mut self, e: &Expression) -> Evaluation<T> {
        let Some(name) = e.name() else {
            return Evaluation::undefined();
        };
        if let Some((_, value)) = self.bindings.iter().rev().find(|(bound, _)| *bound == name) {
            return Evaluation::Complex(*value);
        }
        if self.expanding.contains(&name) {
            trace!("`{name}` is defined in terms of itself");
            return Evaluation::undefined();
        }
        let Some(definition) = self.ctx.context().symbol_definition(&name) else {
            return Evaluation::undefined();
        };
        self.expanding.push(name);
        let value = self.evaluate(&definition);
        self.expanding.pop();
        value
    }

    fn user_function(&mut self, e: &Expression) -> Evaluation<T> {
        let (Some(name), Some(argument)) = (e.name(), e.child(0)) else {
            return Evaluation::undefined();
        };
        let argument = self.scalar(&argument);
        if self.expanding.contains(&name) {
            return Evaluation::undefined();
        }
        let Some(function) = self.ctx.context().function_definition(&name) else {
            return Evaluation::undefined();
        };
        self.expanding.push(name);
        let value = self.with_binding(&function.parameter, argument, &function.body);
        self.expanding.pop();
        value
    }

    fn matrix(&mut self, e: &Expression) -> Evaluation<T> {
        let Some((rows, columns)) = e.matrix_dimensions() else {
            return Evaluation::undefined();
        };
        let mut entries = Vec::with_capacity(rows * columns);
        for child in e.children() {
            match self.evaluate(&child) {
                Evaluation::Complex(value) => entries.push(value),
                _ => return Evaluation::undefined(),
            }
        }
        MatrixEvaluation::new(rows, columns, entries).map_or_else(Evaluation::undefined, Evaluation::Matrix)
    }

    fn list(&mut self, e: &Expression) -> Evaluation<T> {
        let mut values = Vec::with_capacity(e.number_of_children());
        for child in e.children() {
            match self.evaluate(&child) {
                Evaluation::Complex(value) => values.push(value),
                _ => return Evaluation::undefined(),
            }
        }
        Evaluation::List(values)
    }

    /// `sum(L)`, `mean(L)` and `mean(L, W)`. Weights must be non-negative reals with a
    /// non-zero total.
    fn list_function(&mut self, e: &Expression) -> Evaluation<T> {
        let mut arguments = Vec::with_capacity(e.number_of_children());
        for child in e.children() {
            match self.evaluate(&child) {
                Evaluation::List(values) => arguments.push(values),
                _ => return Evaluation::undefined(),
            }
        }
        let value = match (e.kind(), arguments.as_slice()) {
            (ExprType::ListSum, [values]) => total(values),
            (ExprType::ListMean, [values]) if !values.is_empty() => {
                let count = T::from_usize(values.len()).unwrap_or_else(T::nan);
                scalar::divide(total(values), scalar::real(count))
            }
            (ExprType::ListMean, [values, weights]) if !values.is_empty() && values.len() == weights.len() => {
                let valid = weights.iter().all(|w| w.im.is_zero() && w.re >= T::zero());
                let weight = total(weights);
                if !valid || weight.re.is_zero() {
                    return Evaluation::undefined();
                }
                let weighted: Vec<Complex<T>> =
                    values.iter().zip(weights).map(|(v, w)| scalar::multiply(*v, *w)).collect();
                scalar::divide(total(&weighted), weight)
            }
            _ => undefined(),
        };
        Evaluation::Complex(value)
    }

    fn fold(&mut self, e: &Expression) -> Evaluation<T> {
        let kind = e.kind();
        let mut accumulator: Option<Evaluation<T>> = None;
        for child in e.children() {
            let value = self.evaluate(&child);
            accumulator = Some(match accumulator {
                None => value,
                Some(left) => arithmetic(kind, left, value),
            });
        }
        accumulator.unwrap_or_else(Evaluation::undefined)
    }

    fn binary_arithmetic(
        &mut self,
        e: &Expression,
        combine: fn(Evaluation<T>, Evaluation<T>) -> Evaluation<T>,
    ) -> Evaluation<T> {
        let (Some(left), Some(right)) = (e.child(0), e.child(1)) else {
            return Evaluation::undefined();
        };
        let left = self.evaluate(&left);
        let right = self.evaluate(&right);
        combine(left, right)
    }

    fn power(&mut self, e: &Expression) -> Evaluation<T> {
        let (Some(base), Some(exponent)) = (e.child(0), e.child(1)) else {
            return Evaluation::undefined();
        };
        // A negative base under an odd-denominator rational exponent keeps its real root.
        let odd_root = literal_rational(&exponent).filter(|p| p.denom().is_odd()).map(|p| p.numer().is_odd());
        let base = self.evaluate(&base);
        let exponent = self.scalar(&exponent);
        match base {
            Evaluation::Complex(base) => Evaluation::Complex(scalar::power(base, exponent, odd_root, self.ctx)),
            Evaluation::Matrix(m) => {
                let integer = (exponent.im.is_zero() && exponent.re.fract().is_zero())
                    .then(|| exponent.re.to_i64())
                    .flatten();
                integer.and_then(|n| m.power(n)).map_or_else(Evaluation::undefined, Evaluation::Matrix)
            }
            Evaluation::List(_) => Evaluation::undefined(),
        }
    }
}

fn total<T: Precision>(values: &[Complex<T>]) -> Complex<T> {
    values.iter().fold(Complex::zero(), |sum, x| scalar::add(sum, *x))
}

/// Exact value of a tree written with rational literals only, such as `(1/3)` or `-2/3`.
fn literal_rational(e: &Expression) -> Option<BigRational> {
    use ExprType::*;
    let kind = e.kind();
    match kind {
        Rational => e.rational(),
        Parenthesis => literal_rational(&e.child(0)?),
        Opposite => literal_rational(&e.child(0)?).map(|value| -value),
        Subtraction => Some(literal_rational(&e.child(0)?)? - literal_rational(&e.child(1)?)?),
        Division => {
            let denominator = literal_rational(&e.child(1)?)?;
            if denominator.is_zero() {
                return None;
            }
            Some(literal_rational(&e.child(0)?)? / denominator)
        }
        Addition | Multiplication => {
            let mut values = e.children().into_iter().map(|child| literal_rational(&child));
            let first = values.next()??;
            values.try_fold(first, |accumulator, value| {
                let value = value?;
                Some(if kind == Addition { accumulator + value } else { accumulator * value })
            })
        }
        _ => None,
    }
}

fn negate<T: Precision>(value: Evaluation<T>) -> Evaluation<T> {
    match value {
        Evaluation::Complex(z) => Evaluation::Complex(scalar::negate(z)),
        Evaluation::Matrix(m) => Evaluation::Matrix(m.map(scalar::negate)),
        Evaluation::List(_) => Evaluation::undefined(),
    }
}

/// Addition or multiplication of two evaluations.
fn arithmetic<T: Precision>(kind: ExprType, left: Evaluation<T>, right: Evaluation<T>) -> Evaluation<T> {
    use Evaluation::{Complex as Scalar, Matrix};
    let add = kind == ExprType::Addition;
    match (left, right) {
        (Scalar(a), Scalar(b)) => Scalar(if add { scalar::add(a, b) } else { scalar::multiply(a, b) }),
        (Matrix(a), Matrix(b)) => {
            let result = if add { a.zip(&b, scalar::add) } else { a.product(&b) };
            result.map_or_else(Evaluation::undefined, Matrix)
        }
        (Scalar(s), Matrix(m)) | (Matrix(m), Scalar(s)) if !add => Matrix(m.map(|x| scalar::multiply(s, x))),
        _ => Evaluation::undefined(),
    }
}

fn divide<T: Precision>(left: Evaluation<T>, right: Evaluation<T>) -> Evaluation<T> {
    use Evaluation::{Complex as Scalar, Matrix};
    match (left, right) {
        (Scalar(a), Scalar(b)) => Scalar(scalar::divide(a, b)),
        (Matrix(m), Scalar(s)) => Matrix(m.map(|x| scalar::divide(x, s))),
        (left, Matrix(m)) => match m.inverse() {
            Some(inverse) => arithmetic(ExprType::Multiplication, left, Matrix(inverse)),
            None => Evaluation::undefined(),
        },
        _ => Evaluation::undefined(),
    }
}

/// `det`, `inverse`, `trace`, `transpose` and `dim`. Scalars behave as 1×1 matrices.
fn matrix_function<T: Precision>(kind: ExprType, argument: Evaluation<T>) -> Evaluation<T> {
    let m = match argument {
        Evaluation::Matrix(m) => m,
        Evaluation::Complex(x) => {
            return match kind {
                ExprType::MatrixInverse => Evaluation::Complex(scalar::divide(scalar::real(T::one()), x)),
                ExprType::MatrixDimension => {
                    let one = scalar::real(T::one());
                    Evaluation::Matrix(MatrixEvaluation { rows: 1, columns: 2, entries: vec![one, one] })
                }
                _ => Evaluation::Complex(x),
            };
        }
        Evaluation::List(_) => return Evaluation::undefined(),
    };
    let result = match kind {
        ExprType::Determinant => m.determinant().map(Evaluation::Complex),
        ExprType::MatrixInverse => m.inverse().map(Evaluation::Matrix),
        ExprType::MatrixTrace => m.trace().map(Evaluation::Complex),
        ExprType::MatrixTranspose => Some(Evaluation::Matrix(m.transpose())),
        ExprType::MatrixDimension => {
            let entries = vec![
                scalar::real(T::from_usize(m.rows).unwrap_or_else(T::nan)),
                scalar::real(T::from_usize(m.columns).unwrap_or_else(T::nan)),
            ];
            Some(Evaluation::Matrix(MatrixEvaluation { rows: 1, columns: 2, entries }))
        }
        _ => None,
    };
    result.unwrap_or_else(Evaluation::undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pool, context::EmptyContext};

    fn approximate(text: &str, ctx: &ApproximationContext) -> Complex<f64> {
        let pool = Pool::with_capacity(32768);
        pool.parse(text).unwrap().approximate(ctx)
    }

    #[test]
    fn noise_is_flushed() {
        assert_eq!(finalize(Complex::new(2.0, 1e-17), ComplexFormat::Real), Complex::new(2.0, 0.0));
        assert!(finalize(Complex::new(2.0, 0.5), ComplexFormat::Real).re.is_nan());
        assert_eq!(finalize(Complex::new(2.0, 0.5), ComplexFormat::Cartesian).im, 0.5);
    }

    #[test]
    fn division_by_zero_keeps_infinities() {
        let ctx = ApproximationContext::new(&EmptyContext);
        assert_eq!(approximate("1/0", &ctx).re, f64::INFINITY);
        assert!(approximate("0^0", &ctx).re.is_nan());
    }

    #[test]
    fn imaginary_unit_squares_to_minus_one() {
        let ctx = ApproximationContext::new(&EmptyContext).with_complex_format(ComplexFormat::Cartesian);
        assert_eq!(approximate("𝐢^2", &ctx), Complex::new(-1.0, 0.0));
        assert!(approximate("√(-1)", &ApproximationContext::new(&EmptyContext)).re.is_nan());
    }

    #[test]
    fn matrices_evaluate_entry_wise() {
        let pool = Pool::with_capacity(32768);
        let ctx = ApproximationContext::new(&EmptyContext);
        let e = pool.parse("[[1,2][3,4]]×[[0,1][1,0]]").unwrap();
        let Evaluation::Matrix(product) = e.approximate_evaluation::<f64>(&ctx) else {
            panic!("expected a matrix");
        };
        let entries: Vec<f64> = product.entries.iter().map(|z| z.re).collect();
        assert_eq!(entries, [2.0, 1.0, 4.0, 3.0]);
        assert!(e.approximate::<f64>(&ctx).re.is_nan());
        assert!((approximate("det([[1,2][3,4]])", &ctx).re + 2.0).abs() < 1e-12);
    }

    #[test]
    fn lists_evaluate_element_wise() {
        let pool = Pool::with_capacity(32768);
        let ctx = ApproximationContext::new(&EmptyContext);
        let e = pool.parse("{1/2,√(4),π}").unwrap();
        let Evaluation::List(values) = e.approximate_evaluation::<f64>(&ctx) else {
            panic!("expected a list");
        };
        assert_eq!(values.len(), 3);
        assert_eq!(values[1].re, 2.0);
        assert!(e.approximate::<f64>(&ctx).re.is_nan());

        assert_eq!(approximate("sum({1,2,3.5})", &ctx).re, 6.5);
        assert_eq!(approximate("sum({})", &ctx).re, 0.0);
        assert_eq!(approximate("mean({1,2,3})", &ctx).re, 2.0);
        assert_eq!(approximate("mean({1,2},{1,3})", &ctx).re, 1.75);
        assert!(approximate("mean({})", &ctx).re.is_nan());
        assert!(approximate("mean({1,2},{-1,3})", &ctx).re.is_nan());
        assert!(approximate("mean({1,2},{0,0})", &ctx).re.is_nan());
        assert!(approximate("mean({1,2},{1})", &ctx).re.is_nan());
        assert!(approximate("{1,2}+1", &ctx).re.is_nan());
    }

    #[test]
    fn interrupted_evaluations_are_undefined() {
        let breaker = CircuitBreaker::with_step_budget(3);
        let ctx = ApproximationContext::new(&EmptyContext).with_circuit_breaker(&breaker);
        assert!(approximate("1+2+3+4+5", &ctx).re.is_nan());
    }
}
