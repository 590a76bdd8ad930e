//! `sum`, `product`, `int` and `diff` evaluated numerically.

use num_complex::Complex;

use super::{Approximator, Evaluation, Precision, arithmetic, scalar, undefined};
use crate::expr::{Expression, variant::ExprType};

/// Most terms a `sum` or `product` evaluates before giving up.
const MAX_SERIES_TERMS: u64 = 100_000;
/// Deepest bisection of the adaptive Simpson rule.
const MAX_SIMPSON_DEPTH: u32 = 16;

/// Function of the bound variable being integrated or differentiated.
#[derive(Clone, Copy)]
struct Integrand<'e> {
    variable: &'e str,
    body: &'e Expression,
}

/// Interval with its samples and its Simpson estimate.
#[derive(Clone, Copy)]
struct Segment<T> {
    a: T,
    b: T,
    fa: Complex<T>,
    fm: Complex<T>,
    fb: Complex<T>,
    estimate: Complex<T>,
}

fn is_undefined<T: Precision>(value: Complex<T>) -> bool {
    value.re.is_nan() || value.im.is_nan()
}

fn simpson<T: Precision>(a: T, b: T, fa: Complex<T>, fm: Complex<T>, fb: Complex<T>) -> Complex<T> {
    (fa + fm * T::from_f64_lossy(4.0) + fb) * ((b - a) / T::from_f64_lossy(6.0))
}

impl<T: Precision> Approximator<'_, '_, T> {
    /// Bound variable name and operands of a `diff`, `int`, `sum` or `product` node.
    fn parametered(e: &Expression) -> Option<(String, Vec<Expression>)> {
        let children = e.children();
        let variable = children.get(1).filter(|v| v.kind() == ExprType::Symbol)?.name()?;
        Some((variable, children))
    }

    /// Value of a bound, which must be finite and real.
    fn real_bound(&mut self, e: &Expression) -> Option<T> {
        let value = self.scalar(e);
        (value.im.is_zero() && value.re.is_finite()).then_some(value.re)
    }

    fn sample(&mut self, integrand: Integrand, x: T) -> Complex<T> {
        self.with_binding(integrand.variable, scalar::real(x), integrand.body).into_complex()
    }

    /// `sum(f, k, a, b)` and `product(f, k, a, b)` with `k` stepping by one from `a` to `b`.
    pub(super) fn series(&mut self, e: &Expression) -> Evaluation<T> {
        let Some((variable, children)) = Self::parametered(e) else {
            return Evaluation::undefined();
        };
        let [body, _, lower, upper] = children.as_slice() else {
            return Evaluation::undefined();
        };
        let (Some(lower), Some(upper)) = (self.real_bound(lower), self.real_bound(upper)) else {
            return Evaluation::undefined();
        };
        let operation = match e.kind() {
            ExprType::Sum => ExprType::Addition,
            _ => ExprType::Multiplication,
        };
        if upper < lower {
            let identity = if operation == ExprType::Addition { T::zero() } else { T::one() };
            return Evaluation::real(identity);
        }
        let count = (upper - lower).floor().to_u64().map(|n| n.saturating_add(1));
        let Some(count) = count.filter(|&n| n <= MAX_SERIES_TERMS) else {
            return Evaluation::undefined();
        };

        let mut accumulator: Option<Evaluation<T>> = None;
        for step in 0..count {
            if self.poll() {
                return Evaluation::undefined();
            }
            let k = lower + T::from_u64(step).unwrap_or_else(T::nan);
            let term = self.with_binding(&variable, scalar::real(k), body);
            let next = match accumulator {
                None => term,
                Some(partial) => arithmetic(operation, partial, term),
            };
            if next.is_undefined() {
                return next;
            }
            accumulator = Some(next);
        }
        accumulator.unwrap_or_else(Evaluation::undefined)
    }

    /// `int(f, x, a, b)` by the adaptive Simpson rule.
    pub(super) fn integral(&mut self, e: &Expression) -> Evaluation<T> {
        let Some((variable, children)) = Self::parametered(e) else {
            return Evaluation::undefined();
        };
        let [body, _, lower, upper] = children.as_slice() else {
            return Evaluation::undefined();
        };
        let (Some(a), Some(b)) = (self.real_bound(lower), self.real_bound(upper)) else {
            return Evaluation::undefined();
        };
        if a == b {
            return Evaluation::real(T::zero());
        }
        let integrand = Integrand { variable: &variable, body };
        let (from, to) = if a < b { (a, b) } else { (b, a) };
        let two = T::from_f64_lossy(2.0);
        let middle = (from + to) / two;
        let (fa, fm, fb) = (self.sample(integrand, from), self.sample(integrand, middle), self.sample(integrand, to));
        if [fa, fm, fb].into_iter().any(is_undefined) {
            return Evaluation::undefined();
        }
        let segment = Segment { a: from, b: to, fa, fm, fb, estimate: simpson(from, to, fa, fm, fb) };
        let tolerance = T::epsilon().powf(T::from_f64_lossy(0.75)) * T::one().max(segment.estimate.norm());
        let value = self.adaptive_simpson(integrand, segment, tolerance, MAX_SIMPSON_DEPTH);
        Evaluation::Complex(if a < b { value } else { -value })
    }

    fn adaptive_simpson(&mut self, integrand: Integrand, segment: Segment<T>, tolerance: T, depth: u32) -> Complex<T> {
        let two = T::from_f64_lossy(2.0);
        let Segment { a, b, fa, fm, fb, estimate } = segment;
        let m = (a + b) / two;
        let (left_middle, right_middle) = ((a + m) / two, (m + b) / two);
        let flm = self.sample(integrand, left_middle);
        let frm = self.sample(integrand, right_middle);
        if self.interrupted || is_undefined(flm) || is_undefined(frm) {
            return undefined();
        }
        let left = simpson(a, m, fa, flm, fm);
        let right = simpson(m, b, fm, frm, fb);
        let delta = left + right - estimate;
        if depth == 0 || delta.norm() <= T::from_f64_lossy(15.0) * tolerance {
            return left + right + delta / T::from_f64_lossy(15.0);
        }
        let left_segment = Segment { a, b: m, fa, fm: flm, fb: fm, estimate: left };
        let right_segment = Segment { a: m, b, fa: fm, fm: frm, fb, estimate: right };
        let half = tolerance / two;
        let left = self.adaptive_simpson(integrand, left_segment, half, depth - 1);
        let right = self.adaptive_simpson(integrand, right_segment, half, depth - 1);
        left + right
    }

    /// `diff(f, x, a)` by a central difference refined with one Richardson step.
    pub(super) fn derivative(&mut self, e: &Expression) -> Evaluation<T> {
        let Some((variable, children)) = Self::parametered(e) else {
            return Evaluation::undefined();
        };
        let [body, _, point] = children.as_slice() else {
            return Evaluation::undefined();
        };
        let Some(x) = self.real_bound(point) else {
            return Evaluation::undefined();
        };
        let integrand = Integrand { variable: &variable, body };
        let two = T::from_f64_lossy(2.0);
        let step = T::epsilon().powf(T::from_f64_lossy(0.2)) * T::one().max(x.abs());
        let mut central = |h: T| {
            let forward = self.sample(integrand, x + h);
            let backward = self.sample(integrand, x - h);
            (forward - backward) / (two * h)
        };
        let coarse = central(step);
        let fine = central(step / two);
        Evaluation::Complex((fine * T::from_f64_lossy(4.0) - coarse) / T::from_f64_lossy(3.0))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Pool, approx::ApproximationContext, context::EmptyContext, settings::AngleUnit};

    fn approximate(text: &str) -> f64 {
        let pool = Pool::with_capacity(32768);
        pool.parse(text).unwrap().approximate::<f64>(&ApproximationContext::new(&EmptyContext)).re
    }

    #[test]
    fn series() {
        assert_eq!(approximate("sum(k,k,1,100)"), 5050.0);
        assert_eq!(approximate("product(k,k,1,5)"), 120.0);
        assert_eq!(approximate("sum(k,k,3,1)"), 0.0);
        assert!(approximate("sum(k,k,1,1000000)").is_nan());
    }

    #[test]
    fn integrals() {
        assert!((approximate("int(x^2,x,0,3)") - 9.0).abs() < 1e-10);
        assert!((approximate("int(sin(x),x,0,π)") - 2.0).abs() < 1e-9);
        assert!((approximate("int(x,x,2,0)") + 2.0).abs() < 1e-12);
    }

    #[test]
    fn derivatives() {
        assert!((approximate("diff(x^3+2x,x,2)") - 14.0).abs() < 1e-8);
        let pool = Pool::with_capacity(32768);
        let degrees = ApproximationContext::new(&EmptyContext).with_angle_unit(AngleUnit::Degree);
        let slope = pool.parse("diff(sin(x),x,0)").unwrap().approximate::<f64>(&degrees).re;
        assert!((slope - std::f64::consts::PI / 180.0).abs() < 1e-9);
    }
}
