//! Expression handles.
//!
//! Role
//! - [`Expression`] is a reference-counted handle onto a node of a [`Pool`]. Cloning retains,
//!   dropping releases. Handles stay valid across compaction because they hold logical keys.
//! - Nodes are immutable: rewrites go through the builders in [`builder`] and produce new
//!   nodes. A handle whose node was rolled back reads as `Undefined`.
//!
//! Example
//! ```rust
//! use hycas::{pool::Pool, expr::variant::ExprType};
//! let pool = Pool::new();
//! let x = pool.symbol("x").unwrap();
//! let two = pool.integer(2).unwrap();
//! let sum = pool.operator(ExprType::Addition, [x, two]).unwrap();
//! assert_eq!(sum.number_of_children(), 2);
//! assert_eq!(sum.to_string(), "x+2");
//! ```

pub mod builder;
pub mod number;
pub mod order;
pub mod sign;
pub mod variant;

use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use smallvec::{SmallVec, smallvec};

use crate::pool::{Node, NodeKey, Payload, Pool, PoolResult, TreePool};

use self::variant::{ComparisonOperator, ConstantKind, ExprType};

/// Shared handle onto a pooled node.
pub struct Expression {
    pool: Pool,
    key: NodeKey,
}

impl Expression {
    /// Wrap a key whose reference the caller hands over.
    pub(crate) fn from_key(pool: &Pool, key: NodeKey) -> Self {
        Self { pool: pool.clone(), key }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    fn with_node<R>(&self, f: impl FnOnce(&Node) -> R) -> Option<R> {
        self.pool.borrow().node(self.key).map(f)
    }

    /// Whether the node behind this handle has been freed by a rollback.
    pub fn is_stale(&self) -> bool {
        !self.pool.borrow().contains(self.key)
    }

    pub fn kind(&self) -> ExprType {
        self.with_node(|node| node.kind).unwrap_or(ExprType::Undefined)
    }

    pub fn payload(&self) -> Payload {
        self.with_node(|node| node.payload.clone()).unwrap_or(Payload::None)
    }

    pub fn number_of_children(&self) -> usize {
        self.with_node(|node| node.children.len()).unwrap_or(0)
    }

    pub fn child(&self, index: usize) -> Option<Expression> {
        let key = self.with_node(|node| node.children.get(index).copied()).flatten()?;
        self.pool.borrow_mut().retain(key);
        Some(Expression::from_key(&self.pool, key))
    }

    pub fn children(&self) -> Vec<Expression> {
        let keys: SmallVec<[NodeKey; 4]> =
            self.with_node(|node| node.children.clone()).unwrap_or_default();
        let mut pool = self.pool.borrow_mut();
        for &key in &keys {
            pool.retain(key);
        }
        drop(pool);
        keys.into_iter().map(|key| Expression::from_key(&self.pool, key)).collect()
    }

    /// Consume the handle and return its children.
    ///
    /// When this handle is the only owner the node is dismantled and the children come back
    /// detached, ready to be attached elsewhere without copying.
    pub fn into_children(self) -> Vec<Expression> {
        let dismantled = self.pool.borrow_mut().dismantle(self.key);
        match dismantled {
            // `self` now refers to a freed node; dropping it is a no-op.
            Some(keys) => keys.into_iter().map(|key| Expression::from_key(&self.pool, key)).collect(),
            None => self.children(),
        }
    }

    /// The children as a fixed-size array, `None` when the count differs.
    pub fn into_operands<const N: usize>(self) -> Option<[Expression; N]> {
        self.into_children().try_into().ok()
    }

    pub fn rational(&self) -> Option<BigRational> {
        match self.payload() {
            Payload::Rational(value) => Some(value),
            _ => None,
        }
    }

    /// Integer value of a Rational node.
    pub fn integer(&self) -> Option<BigInt> {
        self.rational().filter(|r| r.is_integer()).map(|r| r.to_integer())
    }

    pub fn decimal(&self) -> Option<BigDecimal> {
        match self.payload() {
            Payload::Decimal(value) => Some(value),
            _ => None,
        }
    }

    /// Name of a Symbol or Function node.
    pub fn name(&self) -> Option<String> {
        match self.payload() {
            Payload::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn constant(&self) -> Option<ConstantKind> {
        match self.payload() {
            Payload::Constant(kind) => Some(kind),
            _ => None,
        }
    }

    /// Sign of an Infinity node: `Some(true)` for `-inf`.
    pub fn infinity_is_negative(&self) -> Option<bool> {
        match self.payload() {
            Payload::Infinity { negative } => Some(negative),
            _ => None,
        }
    }

    pub fn matrix_dimensions(&self) -> Option<(usize, usize)> {
        match self.payload() {
            Payload::Matrix { rows, columns } => Some((rows as usize, columns as usize)),
            _ => None,
        }
    }

    pub fn comparison_operator(&self) -> Option<ComparisonOperator> {
        match self.payload() {
            Payload::Comparison(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_rational_zero(&self) -> bool {
        self.rational().is_some_and(|r| r.is_zero())
    }

    pub fn is_rational_one(&self) -> bool {
        self.rational().is_some_and(|r| r.is_one())
    }

    pub fn is_negative_rational(&self) -> bool {
        self.rational().is_some_and(|r| r.is_negative())
    }

    pub fn is_matrix(&self) -> bool {
        self.kind() == ExprType::Matrix
    }

    pub fn is_list(&self) -> bool {
        self.kind() == ExprType::List
    }

    /// Whether any node of the subtree satisfies `predicate`.
    pub fn recursively_matches(&self, mut predicate: impl FnMut(ExprType, &Payload) -> bool) -> bool {
        let pool = self.pool.borrow();
        let mut pending: SmallVec<[NodeKey; 16]> = smallvec![self.key];
        while let Some(key) = pending.pop() {
            let Some(node) = pool.node(key) else {
                continue;
            };
            if predicate(node.kind, &node.payload) {
                return true;
            }
            pending.extend(node.children.iter().copied());
        }
        false
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let pool = self.pool.borrow();
        let mut deepest = 0;
        let mut pending: SmallVec<[(NodeKey, usize); 16]> = smallvec![(self.key, 1)];
        while let Some((key, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            if let Some(node) = pool.node(key) {
                pending.extend(node.children.iter().map(|&child| (child, depth + 1)));
            }
        }
        deepest
    }

    /// Whether the symbol `name` occurs anywhere in the subtree.
    pub fn contains_symbol(&self, name: &str) -> bool {
        self.recursively_matches(|kind, payload| {
            kind == ExprType::Symbol && matches!(payload, Payload::Name(n) if n == name)
        })
    }

    /// Structural equality: same kinds, payloads and children, recursively.
    pub fn is_identical_to(&self, other: &Expression) -> bool {
        if self.pool.same_pool(&other.pool) {
            let pool = self.pool.borrow();
            identical(&pool, self.key, &pool, other.key)
        } else {
            let lhs = self.pool.borrow();
            let rhs = other.pool.borrow();
            identical(&lhs, self.key, &rhs, other.key)
        }
    }

    /// Copy the whole subtree into fresh nodes.
    pub fn deep_clone(&self) -> PoolResult<Expression> {
        let key = self.pool.borrow_mut().deep_copy(self.key)?;
        Ok(Expression::from_key(&self.pool, key))
    }
}

fn identical(lhs_pool: &TreePool, lhs: NodeKey, rhs_pool: &TreePool, rhs: NodeKey) -> bool {
    let mut pending: SmallVec<[(NodeKey, NodeKey); 16]> = smallvec![(lhs, rhs)];
    while let Some((a, b)) = pending.pop() {
        let (kind_a, payload_a, children_a) = match lhs_pool.node(a) {
            Some(node) => (node.kind, &node.payload, node.children()),
            None => (ExprType::Undefined, &Payload::None, &[][..]),
        };
        let (kind_b, payload_b, children_b) = match rhs_pool.node(b) {
            Some(node) => (node.kind, &node.payload, node.children()),
            None => (ExprType::Undefined, &Payload::None, &[][..]),
        };
        if kind_a != kind_b || payload_a != payload_b || children_a.len() != children_b.len() {
            return false;
        }
        pending.extend(children_a.iter().copied().zip(children_b.iter().copied()));
    }
    true
}

impl Clone for Expression {
    fn clone(&self) -> Self {
        self.pool.borrow_mut().retain(self.key);
        Self { pool: self.pool.clone(), key: self.key }
    }
}

impl Drop for Expression {
    fn drop(&mut self) {
        match self.pool.try_borrow_mut() {
            Some(mut pool) => pool.release(self.key),
            None => log::warn!("expression dropped while its pool is borrowed, node {:?} leaks", self.key),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.is_identical_to(other)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({:?}: {})", self.kind(), self)
    }
}
