use criterion::{Criterion, black_box, criterion_group, criterion_main};

use hycas::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const SIMPLE_EXPR: &str = "3×x^2+2×x-sin(π/6)+ln(ℯ^3)";

/// Random expression text over a handful of symbols and reserved functions.
fn build_complex_text() -> String {
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);

    fn next_create(budget: usize, rng: &mut impl Rng) -> String {
        if budget == 0 || rng.random_bool(0.2) {
            return match rng.random_range(0..=4) {
                0 => rng.random_range(1..100).to_string(),
                1 => format!("{}/{}", rng.random_range(1..20), rng.random_range(1..20)),
                2 => "x".to_owned(),
                3 => "y".to_owned(),
                _ => "π".to_owned(),
            };
        }

        match rng.random_range(0..=5) {
            0 => format!("({}+{})", next_create(budget - 1, rng), next_create(budget - 1, rng)),
            1 => format!("({}-{})", next_create(budget - 1, rng), next_create(budget - 1, rng)),
            2 => format!("{}×{}", next_create(budget - 1, rng), next_create(budget - 1, rng)),
            3 => format!("({})^{}", next_create(budget - 1, rng), rng.random_range(0..4)),
            4 => format!("cos({})", next_create(budget - 1, rng)),
            _ => format!("abs({})", next_create(budget - 1, rng)),
        }
    }

    next_create(7, &mut rng)
}

fn bench_parse(c: &mut Criterion) {
    let complex_text = build_complex_text();

    c.bench_function("parse_simple", |b| {
        b.iter(|| {
            let pool = Pool::new();
            black_box(pool.parse(SIMPLE_EXPR).map(|e| e.depth()).ok());
        })
    });

    c.bench_function("parse_complex", |b| {
        b.iter(|| {
            let pool = Pool::new();
            black_box(pool.parse(&complex_text).map(|e| e.depth()).ok());
        })
    });
}

fn bench_reduce(c: &mut Criterion) {
    let pool = Pool::new();
    let simple = pool.parse(SIMPLE_EXPR).unwrap();
    let complex = pool.parse(&build_complex_text()).unwrap();
    let ctx = ReductionContext::new(&EmptyContext);

    c.bench_function("reduce_simple", |b| {
        b.iter(|| {
            black_box(simple.reduce(ctx).map(|e| e.kind()).ok());
        })
    });

    c.bench_function("reduce_complex", |b| {
        b.iter(|| {
            black_box(complex.reduce(ctx).map(|e| e.kind()).ok());
        })
    });
}

fn bench_approximate(c: &mut Criterion) {
    let pool = Pool::new();
    let complex = pool.parse(&build_complex_text()).unwrap();
    let mut context = VariableContext::new();
    context.store(&pool.parse("2→x").unwrap()).unwrap();
    context.store(&pool.parse("1/3→y").unwrap()).unwrap();
    let ctx = ApproximationContext::new(&context);

    c.bench_function("approximate_complex_f64", |b| {
        b.iter(|| {
            black_box(complex.approximate::<f64>(&ctx));
        })
    });

    c.bench_function("approximate_complex_f32", |b| {
        b.iter(|| {
            black_box(complex.approximate::<f32>(&ctx));
        })
    });
}

fn bench_encoding(c: &mut Criterion) {
    let pool = Pool::new();
    let complex = pool.parse(&build_complex_text()).unwrap();
    let bytes = complex.to_bytes();

    c.bench_function("encode_complex", |b| {
        b.iter(|| {
            black_box(complex.to_bytes());
        })
    });

    c.bench_function("decode_complex", |b| {
        b.iter(|| {
            let target = Pool::new();
            black_box(target.expression_from_bytes(&bytes).map(|e| e.depth()).ok());
        })
    });
}

criterion_group!(benches, bench_parse, bench_reduce, bench_approximate, bench_encoding);
criterion_main!(benches);
