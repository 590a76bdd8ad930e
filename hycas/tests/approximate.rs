use approx::{assert_abs_diff_eq, assert_relative_eq};
use hycas::prelude::*;
use num_complex::Complex;

fn approximate_in(text: &str, ctx: &ApproximationContext) -> Complex<f64> {
    let pool = Pool::with_capacity(65536);
    pool.parse(text).unwrap().approximate::<f64>(ctx)
}

fn real(text: &str) -> f64 {
    approximate_in(text, &ApproximationContext::new(&EmptyContext)).re
}

#[test]
fn reduced_fractions_evaluate() {
    let pool = Pool::with_capacity(8192);
    let reduced = pool.parse("2/3-5").unwrap().reduce(ReductionContext::new(&EmptyContext)).unwrap();
    let value = reduced.approximate::<f64>(&ApproximationContext::new(&EmptyContext));
    assert_relative_eq!(value.re, -4.3333333333333, epsilon = 1e-12);
    assert_eq!(value.im, 0.0);
}

#[test]
fn single_precision() {
    let pool = Pool::with_capacity(8192);
    let value = pool.parse("-2-3").unwrap().approximate::<f32>(&ApproximationContext::new(&EmptyContext));
    assert_eq!(value.re, -5.0f32);
}

#[test]
fn elementary_functions() {
    assert_relative_eq!(real("ℯ^2×ℯ^(1)"), 20.085536923188, epsilon = 1e-9);
    assert_relative_eq!(real("-sin(3)×2-3"), -3.2822400161197, epsilon = 1e-12);
    assert_relative_eq!(real("ln(ℯ^3)"), 3.0, epsilon = 1e-12);
    assert_relative_eq!(real("log(1000)"), 3.0, epsilon = 1e-12);
    assert_relative_eq!(real("root(27,3)"), 3.0, epsilon = 1e-12);
    assert_eq!(real("5!"), 120.0);
}

#[test]
fn angle_units() {
    let degrees = ApproximationContext::new(&EmptyContext).with_angle_unit(AngleUnit::Degree);
    assert_abs_diff_eq!(approximate_in("sin(90)", &degrees).re, 1.0, epsilon = 1e-15);
    assert_abs_diff_eq!(approximate_in("cos(180)", &degrees).re, -1.0, epsilon = 1e-15);
    assert_relative_eq!(approximate_in("atan(1)", &degrees).re, 45.0, epsilon = 1e-12);
    let gradians = ApproximationContext::new(&EmptyContext).with_angle_unit(AngleUnit::Gradian);
    assert_abs_diff_eq!(approximate_in("sin(100)", &gradians).re, 1.0, epsilon = 1e-15);
}

#[test]
fn complex_formats() {
    assert!(real("√(-1)").is_nan());
    let cartesian = ApproximationContext::new(&EmptyContext).with_complex_format(ComplexFormat::Cartesian);
    let i = approximate_in("√(-1)", &cartesian);
    assert_abs_diff_eq!(i.re, 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(i.im, 1.0, epsilon = 1e-15);
    let z = approximate_in("(1+𝐢)×(1-𝐢)", &cartesian);
    assert_abs_diff_eq!(z.re, 2.0, epsilon = 1e-15);
    assert_eq!(z.im, 0.0);
}

#[test]
fn undefined_results_are_nan() {
    assert!(real("0/0").is_nan());
    assert!(real("ln(0)").is_nan());
    assert!(real("x+1").is_nan());
    assert_eq!(real("1/0"), f64::INFINITY);
}

#[test]
fn definitions_are_evaluated() {
    let pool = Pool::with_capacity(8192);
    let mut context = VariableContext::new();
    context.store(&pool.parse("2→x").unwrap()).unwrap();
    context.store(&pool.parse("t^2+x→f(t)").unwrap()).unwrap();
    let ctx = ApproximationContext::new(&context);
    assert_eq!(approximate_in("f(3)", &ctx).re, 11.0);
    assert_eq!(approximate_in("sum(f(k),k,1,3)", &ctx).re, 20.0);
}

#[test]
fn circular_definitions_are_nan() {
    let pool = Pool::with_capacity(8192);
    let mut context = VariableContext::new();
    context.store(&pool.parse("b+1→a").unwrap()).unwrap();
    context.store(&pool.parse("a×2→b").unwrap()).unwrap();
    assert!(approximate_in("a", &ApproximationContext::new(&context)).re.is_nan());
}

#[test]
fn matrices() {
    let pool = Pool::with_capacity(8192);
    let ctx = ApproximationContext::new(&EmptyContext);
    let product = pool.parse("[[1,2][3,4]]×[[1][1]]").unwrap().approximate_evaluation::<f64>(&ctx);
    let Evaluation::Matrix(product) = product else {
        panic!("expected a matrix");
    };
    assert_eq!((product.rows, product.columns), (2, 1));
    assert_eq!(product.at(1, 0).re, 7.0);
    assert_relative_eq!(real("det([[1,2][3,4]])"), -2.0, epsilon = 1e-12);
    assert!(real("[[1,2]]+[[1][2]]").is_nan());
}

#[test]
fn approximation_agrees_with_reduction() {
    let ctx = ReductionContext::new(&EmptyContext);
    for text in ["(2+3)^2/5", "√(8)×√(2)", "1/3+1/6", "cos(π/3)", "2^-3", "mean({1,π},{2,3})", "sum({√(2),1/3})"] {
        let pool = Pool::with_capacity(65536);
        let e = pool.parse(text).unwrap();
        let direct = e.approximate::<f64>(&ApproximationContext::from(&ctx)).re;
        let reduced = e.reduce(ctx).unwrap().approximate::<f64>(&ApproximationContext::from(&ctx)).re;
        assert_relative_eq!(direct, reduced, epsilon = 1e-12);
    }
}

/// `text` approximated as written and after reduction, under the same settings.
fn both_ways(text: &str, format: ComplexFormat, unit: AngleUnit) -> (Complex<f64>, Complex<f64>) {
    let pool = Pool::with_capacity(65536);
    let ctx = ReductionContext::new(&EmptyContext).with_complex_format(format).with_angle_unit(unit);
    let approximation = ApproximationContext::from(&ctx);
    let e = pool.parse(text).unwrap();
    let reduced = e.reduce(ctx).unwrap();
    (e.approximate(&approximation), reduced.approximate(&approximation))
}

fn assert_same_value(text: &str, format: ComplexFormat, unit: AngleUnit) -> Complex<f64> {
    let (direct, reduced) = both_ways(text, format, unit);
    if direct.re.is_nan() || reduced.re.is_nan() {
        assert!(direct.re.is_nan() && reduced.re.is_nan(), "{text} ({format}): {direct} and {reduced}");
    } else if direct.re.is_infinite() || reduced.re.is_infinite() {
        assert_eq!(direct, reduced, "{text} ({format})");
    } else {
        assert_abs_diff_eq!(direct.re, reduced.re, epsilon = 1e-9);
        assert_abs_diff_eq!(direct.im, reduced.im, epsilon = 1e-9);
    }
    direct
}

#[test]
fn argument_of_negative_reals_is_a_half_turn() {
    for (unit, half_turn) in [(AngleUnit::Radian, std::f64::consts::PI), (AngleUnit::Degree, 180.0)] {
        for text in ["arg(-1)", "arg(-2)", "arg(-(1/2))"] {
            let value = assert_same_value(text, ComplexFormat::Real, unit);
            assert_relative_eq!(value.re, half_turn, epsilon = 1e-12);
        }
    }
}

#[test]
fn odd_roots_agree_with_reduction() {
    for format in [ComplexFormat::Real, ComplexFormat::Cartesian] {
        for text in ["(-8)^(1/3)", "root(-8,3)", "(-8)^(2/3)", "(-27)^(-1/3)", "(1-9)^(1/3)", "√(-4)"] {
            assert_same_value(text, format, AngleUnit::Radian);
        }
    }
    let real = assert_same_value("(-8)^(1/3)", ComplexFormat::Real, AngleUnit::Radian);
    assert_relative_eq!(real.re, -2.0, epsilon = 1e-12);
    let principal = assert_same_value("(-8)^(1/3)", ComplexFormat::Cartesian, AngleUnit::Radian);
    assert_relative_eq!(principal.re, 1.0, epsilon = 1e-12);
    assert_relative_eq!(principal.im, 3.0f64.sqrt(), epsilon = 1e-12);
}

#[test]
fn trigonometry_of_large_angles_and_poles() {
    let value = real("cos(10^100)");
    assert_ne!(value, 0.0);
    assert!(value.abs() <= 1.0);
    assert_eq!(real("sin(π)"), 0.0);
    assert_same_value("tan(π/2)", ComplexFormat::Real, AngleUnit::Radian);
    assert!(real("tan(π/2)").is_nan());
    assert_same_value("tan(90)", ComplexFormat::Real, AngleUnit::Degree);
    assert_same_value("cos(π/2)", ComplexFormat::Real, AngleUnit::Radian);
}

#[test]
fn edge_values_agree_with_reduction() {
    for text in ["0^(-1)", "0^0", "root(8,0)", "1/(-0)", "-1/(-0)", "1/((-1)×0)"] {
        assert_same_value(text, ComplexFormat::Real, AngleUnit::Radian);
    }
    assert_eq!(real("1/(-0)"), f64::INFINITY);
    let root = assert_same_value("(-4)^(1/2)", ComplexFormat::Cartesian, AngleUnit::Radian);
    assert_eq!(root.re, 0.0);
    assert_relative_eq!(root.im, 2.0, epsilon = 1e-12);
}
