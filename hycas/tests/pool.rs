use hycas::pool::PoolError;
use hycas::prelude::*;

fn stats(pool: &Pool) -> (usize, usize) {
    (pool.used_bytes(), pool.number_of_nodes())
}

#[test]
fn exhaustion_is_recoverable() {
    let pool = Pool::with_capacity(1024);
    let keep = pool.parse("x+1").unwrap();
    let before = stats(&pool);
    let checkpoint = pool.checkpoint();

    let mut handles = Vec::new();
    let error = loop {
        match pool.integer(handles.len() as i64) {
            Ok(e) => handles.push(e),
            Err(error) => break error,
        }
    };
    match error {
        PoolError::OutOfMemory { requested, available } => assert!(requested > available),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!handles.is_empty());

    drop(handles);
    pool.rollback(checkpoint);
    assert_eq!(stats(&pool), before);
    assert_eq!(keep.to_string(), "x+1");
}

#[test]
fn dropping_handles_frees_their_trees() {
    let pool = Pool::with_capacity(8192);
    let before = stats(&pool);
    let e = pool.parse("sin(x)^2+cos(x)^2").unwrap();
    assert!(pool.number_of_nodes() > 0);
    drop(e);
    assert_eq!(stats(&pool), before);
}

#[test]
fn handles_survive_compaction() {
    let pool = Pool::with_capacity(8192);
    let first = pool.parse("a+b").unwrap();
    let middle = pool.parse("[[1,2][3,4]]").unwrap();
    let last = pool.parse("c×d").unwrap();
    drop(middle);
    let fresh = pool.parse("e^2").unwrap();
    assert_eq!(first.to_string(), "a+b");
    assert_eq!(last.to_string(), "c×d");
    assert_eq!(fresh.to_string(), "e^2");
}

#[test]
fn failed_reduction_leaves_the_pool_unchanged() {
    let text = "(x+1)×(x+2)×(x+3)×(x+4)×(x+5)";
    let probe = Pool::with_capacity(1 << 20);
    let parsed = probe.parse(text).unwrap();
    let needed = probe.used_bytes();
    drop(parsed);
    // Too small to hold the working copy reduction starts with.
    let pool = Pool::with_capacity(needed + needed / 2);
    let e = pool.parse(text).unwrap();
    let before = stats(&pool);
    let result = e.reduce(ReductionContext::new(&EmptyContext));
    assert!(matches!(result, Err(ReductionError::AllocationFailure(_))));
    assert_eq!(stats(&pool), before);
}

#[test]
fn interrupted_reduction_rolls_back() {
    let pool = Pool::with_capacity(65536);
    let e = pool.parse("1+2+3+4+5+6+7+8+9").unwrap();
    let before = stats(&pool);
    let breaker = CircuitBreaker::with_step_budget(4);
    let ctx = ReductionContext::new(&EmptyContext).with_circuit_breaker(&breaker);
    assert!(matches!(e.reduce(ctx), Err(ReductionError::Interrupted)));
    assert_eq!(stats(&pool), before);

    let unlimited = CircuitBreaker::new();
    let ctx = ReductionContext::new(&EmptyContext).with_circuit_breaker(&unlimited);
    assert_eq!(e.reduce(ctx).unwrap().to_string(), "45");
}

#[test]
fn builders_copy_children_that_already_have_a_parent() {
    let pool = Pool::with_capacity(8192);
    let x = pool.symbol("x").unwrap();
    let sum = pool.operator(ExprType::Addition, [x.clone(), pool.integer(1).unwrap()]).unwrap();
    let product = pool.operator(ExprType::Multiplication, [x.clone(), x]).unwrap();
    let both = pool.operator(ExprType::Subtraction, [sum.clone(), product]).unwrap();
    assert_eq!(both.to_string(), "x+1-x×x");
    assert_eq!(sum.to_string(), "x+1");
}
