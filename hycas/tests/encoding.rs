use hycas::encoding::DecodeError;
use hycas::prelude::*;

const SAMPLES: &[&str] = &[
    "1+2×(3-x)",
    "-123456789012345678901234567890/7",
    "1.5ᴇ-300+π×ℯ",
    "[[1,2,3][4,5,6]]",
    "x≥-inf",
    "t^2→f(t)",
    "sum(k^2,k,1,10)+diff(sin(x),x,0)",
    "undef+nonreal",
    "{1,x,-2/3}",
    "mean({1,2},{3,4})+sum({})",
];

#[test]
fn bytes_rebuild_identical_trees_in_another_pool() {
    let source = Pool::with_capacity(65536);
    let target = Pool::with_capacity(65536);
    for text in SAMPLES {
        let e = source.parse(text).unwrap();
        let bytes = e.to_bytes();
        assert_eq!(e.byte_size(), bytes.len(), "{text}");
        let copy = target.expression_from_bytes(&bytes).unwrap();
        assert!(copy.is_identical_to(&e), "{text}");
        assert_eq!(copy.to_string(), e.to_string());
    }
}

#[test]
fn identical_trees_encode_identically() {
    let pool = Pool::with_capacity(8192);
    let a = pool.parse("x^2+1").unwrap();
    let b = pool.parse("x^2+1").unwrap();
    let c = pool.parse("x^2+2").unwrap();
    assert_eq!(a.to_bytes(), b.to_bytes());
    assert_ne!(a.to_bytes(), c.to_bytes());
}

#[test]
fn truncated_and_padded_inputs_are_rejected() {
    let pool = Pool::with_capacity(8192);
    let bytes = pool.parse("sin(x)+3/4").unwrap().to_bytes();
    let before = pool.used_bytes();
    for cut in 1..bytes.len() {
        assert!(pool.expression_from_bytes(&bytes[cut..]).is_err(), "suffix from {cut}");
    }
    let mut padded = vec![0];
    padded.extend_from_slice(&bytes);
    assert!(matches!(pool.expression_from_bytes(&padded), Err(DecodeError::TrailingBytes(1))));
    assert_eq!(pool.used_bytes(), before);
}

#[test]
fn decoding_into_a_full_pool_fails_cleanly() {
    let source = Pool::with_capacity(65536);
    let bytes = source.parse("1+2+3+4+5+6+7+8").unwrap().to_bytes();
    let target = Pool::with_capacity(64);
    assert!(matches!(target.expression_from_bytes(&bytes), Err(DecodeError::AllocationFailure(_))));
    assert_eq!(target.used_bytes(), 0);
}

#[test]
fn import_is_a_copy() {
    let source = Pool::with_capacity(8192);
    let target = Pool::with_capacity(8192);
    let e = source.parse("2x+y").unwrap();
    let imported = target.import(&e).unwrap();
    assert!(imported.pool().same_pool(&target));
    drop(e);
    assert_eq!(source.number_of_nodes(), 0);
    assert_eq!(imported.to_string(), "2×x+y");
}
