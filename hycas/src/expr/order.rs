//! Simplification order: the canonical ordering of operands inside sums and products.
//!
//! Numbers come first and compare by value. Sums, products and powers compared against a
//! different kind compare their last operand (or base) instead, so that `x`, `2·x` and `x^2`
//! end up next to each other. Remaining kinds compare by their rank in [`ExprType`].

use std::cmp::Ordering;

use num_rational::BigRational;
use num_traits::One;

use super::{
    Expression,
    number::{NumberKey, decimal_value},
    variant::ExprType,
};

fn number_key(e: &Expression) -> Option<NumberKey> {
    match e.kind() {
        ExprType::Rational => e.rational().map(NumberKey::Finite),
        ExprType::Decimal => e.decimal().map(|d| decimal_value(&d).into()),
        ExprType::Infinity => Some(match e.infinity_is_negative() {
            Some(true) => NumberKey::NegativeInfinity,
            _ => NumberKey::PositiveInfinity,
        }),
        _ => None,
    }
}

pub fn simplification_order(a: &Expression, b: &Expression) -> Ordering {
    use ExprType::*;
    let (ka, kb) = (a.kind(), b.kind());

    if ka.is_poison() || kb.is_poison() {
        return ka.cmp(&kb);
    }
    match (ka.is_number(), kb.is_number()) {
        (true, true) => return number_key(a).cmp(&number_key(b)).then(ka.cmp(&kb)),
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    if ka != kb {
        if matches!(ka, Multiplication | Addition) {
            return compare_last_operand(a, b);
        }
        if matches!(kb, Multiplication | Addition) {
            return compare_last_operand(b, a).reverse();
        }
        if ka == Power {
            return compare_power(a, b);
        }
        if kb == Power {
            return compare_power(b, a).reverse();
        }
        return ka.cmp(&kb);
    }

    match ka {
        Constant => a.constant().cmp(&b.constant()),
        Symbol => a.name().cmp(&b.name()),
        Function => a.name().cmp(&b.name()).then_with(|| compare_children(a, b)),
        Comparison => a
            .comparison_operator()
            .cmp(&b.comparison_operator())
            .then_with(|| compare_children(a, b)),
        Matrix => a
            .matrix_dimensions()
            .cmp(&b.matrix_dimensions())
            .then_with(|| compare_children(a, b)),
        Addition | Multiplication => compare_children_from_last(a, b),
        _ => compare_children(a, b),
    }
}

/// `m` (a sum or product) against an expression of another kind.
fn compare_last_operand(m: &Expression, other: &Expression) -> Ordering {
    let count = m.number_of_children();
    let Some(last) = count.checked_sub(1).and_then(|index| m.child(index)) else {
        return m.kind().cmp(&other.kind());
    };
    match simplification_order(&last, other) {
        Ordering::Equal => Ordering::Greater,
        ordering => ordering,
    }
}

/// `power` against an expression of another kind: compare the base, then the exponent
/// against an implicit 1.
fn compare_power(power: &Expression, other: &Expression) -> Ordering {
    let (Some(base), Some(exponent)) = (power.child(0), power.child(1)) else {
        return power.kind().cmp(&other.kind());
    };
    match simplification_order(&base, other) {
        Ordering::Equal => match number_key(&exponent) {
            Some(key) => match key.cmp(&NumberKey::Finite(BigRational::one())) {
                Ordering::Less => Ordering::Less,
                _ => Ordering::Greater,
            },
            None => Ordering::Greater,
        },
        ordering => ordering,
    }
}

fn compare_children(a: &Expression, b: &Expression) -> Ordering {
    let (lhs, rhs) = (a.children(), b.children());
    for (x, y) in lhs.iter().zip(rhs.iter()) {
        match simplification_order(x, y) {
            Ordering::Equal => continue,
            ordering => return ordering,
        }
    }
    lhs.len().cmp(&rhs.len())
}

fn compare_children_from_last(a: &Expression, b: &Expression) -> Ordering {
    let (lhs, rhs) = (a.children(), b.children());
    for (x, y) in lhs.iter().rev().zip(rhs.iter().rev()) {
        match simplification_order(x, y) {
            Ordering::Equal => continue,
            ordering => return ordering,
        }
    }
    lhs.len().cmp(&rhs.len())
}

/// Stable insertion sort.
///
/// Operand lists are short and the comparator mixes heuristics across kinds, so this never
/// relies on the comparator being a strict total order.
pub fn insertion_sort_by<T>(items: &mut [T], mut compare: impl FnMut(&T, &T) -> Ordering) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(&items[j - 1], &items[j]) == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

pub fn sort_by_simplification_order(items: &mut [Expression]) {
    insertion_sort_by(items, simplification_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pool;

    fn order(pool: &Pool, a: &str, b: &str) -> Ordering {
        let a = pool.parse(a).unwrap();
        let b = pool.parse(b).unwrap();
        simplification_order(&a, &b)
    }

    #[test]
    fn numbers_first_then_rank() {
        let pool = Pool::with_capacity(8192);
        assert_eq!(order(&pool, "3", "x"), Ordering::Less);
        let minus_infinity = pool.infinity(true).unwrap();
        let minus_seven = pool.integer(-7).unwrap();
        assert_eq!(simplification_order(&minus_infinity, &minus_seven), Ordering::Less);
        assert_eq!(order(&pool, "2", "1.5"), Ordering::Greater);
        assert_eq!(order(&pool, "π", "x"), Ordering::Less);
        assert_eq!(order(&pool, "x", "y"), Ordering::Less);
        assert_eq!(order(&pool, "undef", "2"), Ordering::Less);
    }

    #[test]
    fn like_terms_are_adjacent() {
        let pool = Pool::with_capacity(8192);
        assert_eq!(order(&pool, "x", "x^2"), Ordering::Less);
        assert_eq!(order(&pool, "x^2", "y"), Ordering::Less);
        assert_eq!(order(&pool, "x^0.5", "x"), Ordering::Less);
    }

    #[test]
    fn insertion_sort_is_stable() {
        let mut items = [(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')];
        insertion_sort_by(&mut items, |a, b| a.0.cmp(&b.0));
        assert_eq!(items, [(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);
    }
}
