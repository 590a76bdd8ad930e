//! Node builders.
//!
//! Every node enters the pool through [`Pool::build`]. A child that already hangs under
//! another parent (or appears twice in the same list) is deep-copied before being attached,
//! so each node keeps at most one structural parent.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use smallvec::SmallVec;

use crate::pool::{NodeKey, Payload, Pool, PoolError, PoolResult};

use super::{
    Expression,
    variant::{ComparisonOperator, ConstantKind, ExprType},
};

impl Pool {
    /// Allocate a node of `kind` over `children`.
    pub fn build(
        &self,
        kind: ExprType,
        payload: Payload,
        children: impl IntoIterator<Item = Expression>,
    ) -> PoolResult<Expression> {
        debug_assert!(payload.matches_kind(kind), "{kind:?} cannot carry {payload:?}");

        let mut attached: SmallVec<[Expression; 4]> = SmallVec::new();
        for child in children {
            if !child.pool().same_pool(self) {
                return Err(PoolError::ForeignNode);
            }
            let shared = self.borrow().has_parent(child.key())
                || attached.iter().any(|other| other.key() == child.key());
            let child = if shared { child.deep_clone()? } else { child };
            attached.push(child);
        }

        let keys: SmallVec<[NodeKey; 4]> = attached.iter().map(Expression::key).collect();
        let key = self.borrow_mut().allocate(kind, payload, &keys)?;
        drop(attached);
        Ok(Expression::from_key(self, key))
    }

    pub fn leaf(&self, kind: ExprType, payload: Payload) -> PoolResult<Expression> {
        self.build(kind, payload, [])
    }

    /// Rational literal. Use `BigRational::new` to get a normalized value.
    pub fn rational(&self, value: BigRational) -> PoolResult<Expression> {
        self.leaf(ExprType::Rational, Payload::Rational(value))
    }

    pub fn integer(&self, value: impl Into<BigInt>) -> PoolResult<Expression> {
        self.rational(BigRational::from_integer(value.into()))
    }

    pub fn fraction(&self, numerator: i64, denominator: i64) -> PoolResult<Expression> {
        if denominator == 0 {
            return self.undefined();
        }
        self.rational(BigRational::new(numerator.into(), denominator.into()))
    }

    pub fn decimal(&self, value: BigDecimal) -> PoolResult<Expression> {
        self.leaf(ExprType::Decimal, Payload::Decimal(value))
    }

    pub fn symbol(&self, name: impl Into<String>) -> PoolResult<Expression> {
        self.leaf(ExprType::Symbol, Payload::Name(name.into()))
    }

    pub fn constant(&self, kind: ConstantKind) -> PoolResult<Expression> {
        self.leaf(ExprType::Constant, Payload::Constant(kind))
    }

    pub fn infinity(&self, negative: bool) -> PoolResult<Expression> {
        self.leaf(ExprType::Infinity, Payload::Infinity { negative })
    }

    pub fn undefined(&self) -> PoolResult<Expression> {
        self.leaf(ExprType::Undefined, Payload::None)
    }

    pub fn nonreal(&self) -> PoolResult<Expression> {
        self.leaf(ExprType::Nonreal, Payload::None)
    }

    /// Payload-free node: operators and reserved functions.
    pub fn operator(
        &self,
        kind: ExprType,
        children: impl IntoIterator<Item = Expression>,
    ) -> PoolResult<Expression> {
        self.build(kind, Payload::None, children)
    }

    /// User function `name` applied to `argument`.
    pub fn function(&self, name: impl Into<String>, argument: Expression) -> PoolResult<Expression> {
        self.build(ExprType::Function, Payload::Name(name.into()), [argument])
    }

    /// Matrix from row-major entries.
    pub fn matrix(
        &self,
        rows: usize,
        columns: usize,
        entries: impl IntoIterator<Item = Expression>,
    ) -> PoolResult<Expression> {
        let entries: Vec<Expression> = entries.into_iter().collect();
        let shape = (u32::try_from(rows), u32::try_from(columns));
        let (Ok(row_count), Ok(column_count)) = shape else {
            return Err(PoolError::MatrixShape { rows, columns, entries: entries.len() });
        };
        if rows.checked_mul(columns) != Some(entries.len()) {
            return Err(PoolError::MatrixShape { rows, columns, entries: entries.len() });
        }
        let payload = Payload::Matrix { rows: row_count, columns: column_count };
        self.build(ExprType::Matrix, payload, entries)
    }

    /// Braced list, possibly empty.
    pub fn list(&self, elements: impl IntoIterator<Item = Expression>) -> PoolResult<Expression> {
        self.build(ExprType::List, Payload::None, elements)
    }

    pub fn comparison(
        &self,
        operator: ComparisonOperator,
        lhs: Expression,
        rhs: Expression,
    ) -> PoolResult<Expression> {
        self.build(ExprType::Comparison, Payload::Comparison(operator), [lhs, rhs])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attaching_a_parented_child_copies_it() {
        let pool = Pool::with_capacity(4096);
        let x = pool.symbol("x").unwrap();
        let first = pool.operator(ExprType::Opposite, [x.clone()]).unwrap();
        let second = pool.operator(ExprType::Factorial, [x.clone()]).unwrap();

        let a = first.child(0).unwrap();
        let b = second.child(0).unwrap();
        assert_eq!(a.key(), x.key());
        assert_ne!(b.key(), x.key());
        assert!(a.is_identical_to(&b));
    }

    #[test]
    fn repeated_child_in_one_list_is_copied() {
        let pool = Pool::with_capacity(4096);
        let x = pool.symbol("x").unwrap();
        let product = pool.operator(ExprType::Multiplication, [x.clone(), x]).unwrap();
        let children = product.children();
        assert_ne!(children[0].key(), children[1].key());
    }

    #[test]
    fn matrix_entries_must_fill_the_shape() {
        let pool = Pool::with_capacity(4096);
        let entries = || (1..=3).map(|n| pool.integer(n).unwrap()).collect::<Vec<_>>();
        let error = pool.matrix(2, 2, entries()).unwrap_err();
        assert_eq!(error, PoolError::MatrixShape { rows: 2, columns: 2, entries: 3 });
        let error = pool.matrix(usize::MAX, 1, entries()).unwrap_err();
        assert!(matches!(error, PoolError::MatrixShape { .. }));
        let row = pool.matrix(1, 3, entries()).unwrap();
        assert_eq!(row.matrix_dimensions(), Some((1, 3)));
    }

    #[test]
    fn foreign_children_are_rejected() {
        let pool = Pool::with_capacity(4096);
        let other = Pool::with_capacity(4096);
        let x = other.symbol("x").unwrap();
        assert_eq!(pool.operator(ExprType::Opposite, [x]).unwrap_err(), PoolError::ForeignNode);
    }
}
