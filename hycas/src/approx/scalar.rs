//! Numeric rules for scalar operands.
//!
//! Real operands go through real arithmetic so that IEEE infinities survive (`1/0` is `inf`);
//! anything else uses the principal complex branch.

use num_complex::Complex;
use num_integer::Integer;
use num_traits::{Float, Zero};

use super::{ApproximationContext, Precision, undefined};
use crate::{
    expr::variant::ExprType,
    settings::{AngleUnit, ComplexFormat},
};

/// Largest integer an `f64` (and so the integer rules) represents exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;
/// Most factors `binomial` and `permute` multiply out.
const MAX_PRODUCT_FACTORS: i64 = 1_000_000;

pub(super) fn real<T: Precision>(x: T) -> Complex<T> {
    Complex::new(x, T::zero())
}

fn is_real<T: Precision>(z: &Complex<T>) -> bool {
    z.im.is_zero()
}

/// Real value of `z` when it is an integer.
fn as_integer<T: Precision>(z: &Complex<T>) -> Option<T> {
    (is_real(z) && z.re.is_finite() && z.re.fract().is_zero()).then_some(z.re)
}

fn as_i64<T: Precision>(z: &Complex<T>) -> Option<i64> {
    let value = as_integer(z)?.to_f64()?;
    (value.abs() <= MAX_EXACT_INTEGER).then(|| value as i64)
}

pub(super) fn add<T: Precision>(a: Complex<T>, b: Complex<T>) -> Complex<T> {
    if is_real(&a) && is_real(&b) { real(a.re + b.re) } else { a + b }
}

pub(super) fn multiply<T: Precision>(a: Complex<T>, b: Complex<T>) -> Complex<T> {
    if is_real(&a) && is_real(&b) { real(a.re * b.re) } else { a * b }
}

pub(super) fn divide<T: Precision>(a: Complex<T>, b: Complex<T>) -> Complex<T> {
    if is_real(&a) && is_real(&b) {
        // The sign of a zero divisor is not significant: `1/(-0)` is `inf`.
        let divisor = if b.re.is_zero() { T::zero() } else { b.re };
        return real(a.re / divisor);
    }
    if b.is_zero() {
        return undefined();
    }
    a / b
}

pub(super) fn negate<T: Precision>(z: Complex<T>) -> Complex<T> {
    Complex::new(-z.re, -z.im)
}

/// `base^exponent`. `odd_root` holds the parity of the numerator when the exponent is a
/// rational with an odd denominator, which allows a real root of a negative base.
pub(super) fn power<T: Precision>(
    base: Complex<T>,
    exponent: Complex<T>,
    odd_root: Option<bool>,
    ctx: &ApproximationContext,
) -> Complex<T> {
    if base.is_zero() {
        return if exponent.re > T::zero() { real(T::zero()) } else { undefined() };
    }
    if is_real(&base) && is_real(&exponent) {
        let (b, p) = (base.re, exponent.re);
        if b >= T::zero() || p.fract().is_zero() {
            return real(b.powf(p));
        }
        if let (ComplexFormat::Real, Some(odd_numerator)) = (ctx.complex_format, odd_root) {
            let magnitude = (-b).powf(p);
            return real(if odd_numerator { -magnitude } else { magnitude });
        }
        return Complex::new(b, T::zero()).powc(exponent);
    }
    if let Some(n) = as_i64(&exponent).and_then(|n| i32::try_from(n).ok()) {
        return base.powi(n);
    }
    base.powc(exponent)
}

fn to_radians<T: Precision>(z: Complex<T>, unit: AngleUnit) -> Complex<T> {
    match unit.half_turn_degrees() {
        Some(degrees) => z * (T::PI() / T::from_f64_lossy(f64::from(degrees))),
        None => z,
    }
}

fn from_radians<T: Precision>(z: Complex<T>, unit: AngleUnit) -> Complex<T> {
    match unit.half_turn_degrees() {
        Some(degrees) => z * (T::from_f64_lossy(f64::from(degrees)) / T::PI()),
        None => z,
    }
}

/// Rounds results that are only floating-point residue of the angle to 0.
///
/// Only angles of moderate size are considered: past `1/√ε` the rounding error of the angle
/// itself is of the order of the result.
fn flush<T: Precision>(value: T, angle: T) -> T {
    let magnitude = angle.abs();
    if magnitude < T::epsilon().sqrt().recip() && value.abs() <= T::epsilon() * T::one().max(magnitude) {
        T::zero()
    } else {
        value
    }
}

fn circular<T: Precision>(kind: ExprType, z: Complex<T>, unit: AngleUnit) -> Complex<T> {
    let angle = to_radians(z, unit);
    if is_real(&angle) {
        let x = angle.re;
        let value = match kind {
            ExprType::Sine => flush(x.sin(), x),
            ExprType::Cosine => flush(x.cos(), x),
            _ => {
                let (sine, cosine) = (flush(x.sin(), x), flush(x.cos(), x));
                if cosine.is_zero() {
                    return undefined();
                }
                sine / cosine
            }
        };
        return real(value);
    }
    match kind {
        ExprType::Sine => angle.sin(),
        ExprType::Cosine => angle.cos(),
        _ => angle.tan(),
    }
}

fn inverse_circular<T: Precision>(kind: ExprType, z: Complex<T>, unit: AngleUnit) -> Complex<T> {
    let inside_unit_interval = is_real(&z) && z.re.abs() <= T::one();
    let radians = match kind {
        ExprType::ArcSine if inside_unit_interval => real(z.re.asin()),
        ExprType::ArcSine => z.asin(),
        ExprType::ArcCosine if inside_unit_interval => real(z.re.acos()),
        ExprType::ArcCosine => z.acos(),
        _ if is_real(&z) => real(z.re.atan()),
        _ => return undefined(),
    };
    from_radians(radians, unit)
}

fn hyperbolic<T: Precision>(kind: ExprType, z: Complex<T>) -> Complex<T> {
    use ExprType::*;
    if is_real(&z) {
        let x = z.re;
        let value = match kind {
            HyperbolicSine => Some(x.sinh()),
            HyperbolicCosine => Some(x.cosh()),
            HyperbolicTangent => Some(x.tanh()),
            HyperbolicArcSine => Some(x.asinh()),
            HyperbolicArcCosine if x >= T::one() => Some(x.acosh()),
            HyperbolicArcTangent if x.abs() <= T::one() => Some(x.atanh()),
            _ => None,
        };
        if let Some(value) = value {
            return real(value);
        }
    }
    match kind {
        HyperbolicSine => z.sinh(),
        HyperbolicCosine => z.cosh(),
        HyperbolicTangent => z.tanh(),
        HyperbolicArcSine => z.asinh(),
        HyperbolicArcCosine => z.acosh(),
        _ => z.atanh(),
    }
}

/// Natural logarithm with the branch cut approached from above.
fn logarithm<T: Precision>(z: Complex<T>) -> Complex<T> {
    if z.is_zero() {
        return undefined();
    }
    if is_real(&z) && z.re > T::zero() {
        return real(z.re.ln());
    }
    Complex::new(z.re, z.im + T::zero()).ln()
}

fn square_root<T: Precision>(z: Complex<T>) -> Complex<T> {
    if is_real(&z) && z.re >= T::zero() {
        return real(z.re.sqrt());
    }
    Complex::new(z.re, z.im + T::zero()).sqrt()
}

pub(super) fn factorial<T: Precision>(z: Complex<T>) -> Complex<T> {
    let Some(n) = as_i64(&z).filter(|&n| n >= 0) else {
        return undefined();
    };
    let mut product = T::one();
    for k in 2..=n {
        product = product * T::from_f64_lossy(k as f64);
        if product.is_infinite() {
            break;
        }
    }
    real(product)
}

/// One-argument reserved functions.
pub(super) fn unary<T: Precision>(kind: ExprType, z: Complex<T>, ctx: &ApproximationContext) -> Complex<T> {
    use ExprType::*;
    if z.re.is_nan() || z.im.is_nan() {
        return undefined();
    }
    let rounding = |f: fn(T) -> T| if is_real(&z) { real(f(z.re)) } else { undefined() };
    match kind {
        AbsoluteValue => real(z.norm()),
        ComplexArgument if z.is_zero() => undefined(),
        // A negative zero imaginary part still lies on the upper side of the cut.
        ComplexArgument => from_radians(real(Complex::new(z.re, z.im + T::zero()).arg()), ctx.angle_unit),
        RealPart => real(z.re),
        ImaginaryPart => real(z.im),
        Conjugate => z.conj(),
        SquareRoot => square_root(z),
        NaperianLogarithm => logarithm(z),
        CommonLogarithm => divide(logarithm(z), real(T::LN_10())),
        Sine | Cosine | Tangent => circular(kind, z, ctx.angle_unit),
        ArcSine | ArcCosine | ArcTangent => inverse_circular(kind, z, ctx.angle_unit),
        HyperbolicSine | HyperbolicCosine | HyperbolicTangent | HyperbolicArcSine | HyperbolicArcCosine
        | HyperbolicArcTangent => hyperbolic(kind, z),
        Floor => rounding(Float::floor),
        Ceiling => rounding(Float::ceil),
        FracPart => rounding(|x| x - x.floor()),
        Factorial => factorial(z),
        _ => undefined(),
    }
}

fn signed_infinity<T: Precision>(numerator: T) -> Complex<T> {
    if numerator > T::zero() {
        real(T::infinity())
    } else if numerator < T::zero() {
        real(T::neg_infinity())
    } else {
        undefined()
    }
}

fn integer_division<T: Precision>(kind: ExprType, a: Complex<T>, b: Complex<T>) -> Complex<T> {
    let (Some(a), Some(b)) = (as_integer(&a), as_integer(&b)) else {
        return undefined();
    };
    if b.is_zero() {
        return signed_infinity(a);
    }
    match kind {
        ExprType::DivisionRemainder => real((a - b * (a / b).floor()).round()),
        _ => {
            let divisor = b.abs();
            let remainder = a - divisor * (a / divisor).floor();
            real(((a - remainder) / b).round())
        }
    }
}

fn binomial<T: Precision>(n: Complex<T>, k: Complex<T>) -> Complex<T> {
    let Some(k) = as_i64(&k) else {
        return undefined();
    };
    if k < 0 {
        return real(T::zero());
    }
    if k > MAX_PRODUCT_FACTORS || !is_real(&n) {
        return undefined();
    }
    let n = n.re;
    if n.fract().is_zero() && n >= T::zero() && n < T::from_f64_lossy(k as f64) {
        return real(T::zero());
    }
    let mut result = T::one();
    for i in 0..k {
        let i = T::from_f64_lossy(i as f64);
        result = result * (n - i) / (i + T::one());
    }
    real(result.round())
}

fn permute<T: Precision>(n: Complex<T>, k: Complex<T>) -> Complex<T> {
    let (Some(n), Some(k)) = (as_i64(&n), as_i64(&k)) else {
        return undefined();
    };
    if n < 0 || k < 0 {
        return undefined();
    }
    if k > n {
        return real(T::zero());
    }
    if k > MAX_PRODUCT_FACTORS {
        return real(T::infinity());
    }
    let mut product = T::one();
    for i in 0..k {
        product = product * T::from_f64_lossy((n - i) as f64);
    }
    real(product)
}

/// Two-argument reserved functions.
pub(super) fn binary<T: Precision>(
    kind: ExprType,
    a: Complex<T>,
    b: Complex<T>,
    ctx: &ApproximationContext,
) -> Complex<T> {
    use ExprType::*;
    if [a.re, a.im, b.re, b.im].iter().any(|x| x.is_nan()) {
        return undefined();
    }
    match kind {
        Logarithm => {
            if a.is_zero() {
                return undefined();
            }
            divide(logarithm(a), logarithm(b))
        }
        NthRoot => {
            if b.is_zero() {
                return undefined();
            }
            let odd_root = as_i64(&b).filter(|n| n.is_odd()).map(|_| true);
            power(a, divide(real(T::one()), b), odd_root, ctx)
        }
        Round => {
            let (Some(digits), true) = (as_i64(&b), is_real(&a)) else {
                return undefined();
            };
            let Ok(digits) = i32::try_from(digits) else {
                return undefined();
            };
            let scale = T::from_f64_lossy(10.0).powi(digits);
            real((a.re * scale).round() / scale)
        }
        GreatCommonDivisor | LeastCommonMultiple => {
            let (Some(x), Some(y)) = (as_i64(&a), as_i64(&b)) else {
                return undefined();
            };
            let value = if kind == GreatCommonDivisor { x.gcd(&y) } else { x.lcm(&y) };
            real(T::from_f64_lossy(value as f64))
        }
        DivisionQuotient | DivisionRemainder => integer_division(kind, a, b),
        BinomialCoefficient => binomial(a, b),
        PermuteCoefficient => permute(a, b),
        _ => undefined(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EmptyContext;

    fn ctx() -> ApproximationContext<'static> {
        ApproximationContext::new(&EmptyContext)
    }

    #[test]
    fn real_division_by_zero_is_infinite() {
        assert_eq!(divide(real(1.0_f64), real(0.0)).re, f64::INFINITY);
        assert!(divide(real(0.0_f64), real(0.0)).re.is_nan());
    }

    #[test]
    fn odd_roots_of_negative_numbers_stay_real() {
        let cube_root = power(real(-8.0_f64), real(1.0 / 3.0), Some(true), &ctx());
        assert!((cube_root.re + 2.0).abs() < 1e-12);
        assert_eq!(cube_root.im, 0.0);
        let principal = power(real(-4.0_f64), real(0.5), None, &ctx());
        assert!((principal.im - 2.0).abs() < 1e-12);
    }

    #[test]
    fn sine_of_pi_is_flushed() {
        assert_eq!(unary(ExprType::Sine, real(std::f64::consts::PI), &ctx()).re, 0.0);
        let degrees = ctx().with_angle_unit(AngleUnit::Degree);
        assert!((unary(ExprType::Sine, real(30.0_f64), &degrees).re - 0.5).abs() < 1e-15);
    }

    #[test]
    fn logarithm_of_zero_is_undefined() {
        let value = unary(ExprType::NaperianLogarithm, real(0.0_f64), &ctx());
        assert!(value.re.is_nan() && value.im.is_nan());
        let negative = unary(ExprType::NaperianLogarithm, real(-1.0_f64), &ctx());
        assert!((negative.im - std::f64::consts::PI).abs() < 1e-15);
    }

    #[test]
    fn integer_rules() {
        let ctx = ctx();
        assert_eq!(binary(ExprType::DivisionRemainder, real(-7.0_f64), real(3.0), &ctx).re, 2.0);
        assert_eq!(binary(ExprType::DivisionQuotient, real(7.0_f64), real(-3.0), &ctx).re, -2.0);
        assert_eq!(binary(ExprType::BinomialCoefficient, real(5.0_f64), real(2.0), &ctx).re, 10.0);
        assert_eq!(binary(ExprType::PermuteCoefficient, real(5.0_f64), real(2.0), &ctx).re, 20.0);
        assert_eq!(binary(ExprType::GreatCommonDivisor, real(12.0_f64), real(18.0), &ctx).re, 6.0);
        assert_eq!(factorial(real(5.0_f32)).re, 120.0);
        assert!(factorial(real(2.5_f64)).re.is_nan());
    }
}
