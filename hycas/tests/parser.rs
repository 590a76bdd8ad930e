use hycas::parser::ParserError;
use hycas::prelude::*;

fn roundtrip(src: &str) -> String {
    let pool = Pool::with_capacity(65536);
    pool.parse(src).expect("parse should succeed").to_string()
}

fn parse_error(src: &str) -> ParserError {
    let pool = Pool::with_capacity(65536);
    pool.parse(src).expect_err("parse should fail")
}

#[test]
fn canonical_rendering() {
    assert_eq!(roundtrip("1+2×(3-x)"), "1+2×(3-x)");
    assert_eq!(roundtrip("-2-3"), "-2-3");
    assert_eq!(roundtrip("2^3^2"), "2^3^2");
    assert_eq!(roundtrip("(2^3)^2"), "(2^3)^2");
    assert_eq!(roundtrip("2*x"), "2×x");
    assert_eq!(roundtrip("a−b"), "a-b");
    assert_eq!(roundtrip("3!"), "3!");
    assert_eq!(roundtrip("x≤3"), "x≤3");
    assert_eq!(roundtrip("1->a"), "1→a");
    assert_eq!(roundtrip("t^2→f(t)"), "t^2→f(t)");
    assert_eq!(roundtrip("[[1,2][3,4]]"), "[[1,2][3,4]]");
    assert_eq!(roundtrip("log(8,2)+ln(ℯ)"), "log(8,2)+ln(ℯ)");
}

#[test]
fn braced_lists() {
    assert_eq!(roundtrip("{1,2,3}"), "{1,2,3}");
    assert_eq!(roundtrip("{}"), "{}");
    assert_eq!(roundtrip("{x+1,-2/3}→L"), "{x+1,-2/3}→L");
    assert_eq!(roundtrip("mean({1,2},{3,4})"), "mean({1,2},{3,4})");

    let pool = Pool::with_capacity(65536);
    let e = pool.parse("sum({1,2})").unwrap();
    assert_eq!(e.kind(), ExprType::ListSum);
    assert_eq!(e.to_string(), "sum({1,2})");
    let e = pool.parse("sum(k,k,1,3)").unwrap();
    assert_eq!(e.kind(), ExprType::Sum);
    let e = pool.parse("{}").unwrap();
    assert_eq!((e.kind(), e.number_of_children()), (ExprType::List, 0));
}

#[test]
fn implicit_multiplication() {
    let pool = Pool::with_capacity(65536);
    let e = pool.parse("2π𝐢").unwrap();
    assert_eq!(e.kind(), ExprType::Multiplication);
    let e = pool.parse("2(x+1)").unwrap();
    assert_eq!(e.kind(), ExprType::Multiplication);
    assert_eq!(e.to_string(), "2×(x+1)");
}

#[test]
fn serialized_text_parses_to_the_same_value() {
    let ctx = ApproximationContext::new(&EmptyContext);
    for src in ["1+2×(3-4)", "-2^2", "(-2)^2", "2^-1", "4!/3", "√(2)×root(27,3)", "sin(π/3)^2", "1.5ᴇ3-2/3"] {
        let pool = Pool::with_capacity(65536);
        let parsed = pool.parse(src).unwrap();
        let reparsed = pool.parse(&parsed.to_string()).unwrap();
        let (a, b) = (parsed.approximate::<f64>(&ctx), reparsed.approximate::<f64>(&ctx));
        assert_eq!(a, b, "{src} serialized as {parsed}");
    }
}

#[test]
fn rejections() {
    assert!(matches!(parse_error("1=2=3"), ParserError::ChainedComparison { .. }));
    assert!(matches!(parse_error("a→b→c"), ParserError::UnexpectedToken { .. }));
    assert!(matches!(parse_error("f(1,2)"), ParserError::ArityMismatch { .. }));
    assert!(matches!(parse_error("cos(1,2)"), ParserError::ArityMismatch { .. }));
    assert!(matches!(parse_error("sum(1,2)"), ParserError::ArityMismatch { found: 2, .. }));
    assert!(matches!(parse_error("mean({1},{1},{1})"), ParserError::ArityMismatch { .. }));
    assert!(matches!(parse_error("[[1,2][3]]"), ParserError::RaggedMatrix { expected: 2, .. }));
    assert!(matches!(parse_error("[]"), ParserError::EmptyMatrix { .. }));
    assert!(matches!(parse_error("abcdefgh"), ParserError::IdentifierTooLong { max: 7, .. }));
    assert!(matches!(parse_error("u+1"), ParserError::ReservedName { .. }));
    assert!(matches!(parse_error("f(f)"), ParserError::RecursiveFunctionArgument { .. }));
    assert!(matches!(parse_error("1→cos"), ParserError::InvalidStoreTarget { .. }));
    assert!(matches!(parse_error("1=2→x"), ParserError::InvalidStoreTarget { .. }));
    assert!(matches!(parse_error("2#3"), ParserError::InvalidToken { .. }));
    for src in ["", "1+", "(1", "1)", "×2", "[[1,2],[3]]", "sin", "2 3", "{1,2", "{1,}"] {
        assert!(Pool::with_capacity(4096).parse(src).is_err(), "{src:?} should be rejected");
    }
}

#[test]
fn errors_carry_spans() {
    let error = parse_error("1+2#");
    assert_eq!(error.span(), 3..4);
}

#[test]
fn deep_nesting_is_rejected_without_overflow() {
    let src = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
    assert!(matches!(parse_error(&src), ParserError::NestingTooDeep { .. }));
}

#[test]
fn parse_failures_leave_no_nodes_behind() {
    let pool = Pool::with_capacity(65536);
    let before = (pool.used_bytes(), pool.number_of_nodes());
    assert!(pool.parse("1+2+3+(4×").is_err());
    assert_eq!((pool.used_bytes(), pool.number_of_nodes()), before);
}

#[test]
fn allocation_failure_is_a_parse_error() {
    let pool = Pool::with_capacity(64);
    assert!(matches!(
        pool.parse("1+2+3+4+5+6+7+8+9"),
        Err(ParserError::AllocationFailure { .. })
    ));
}
