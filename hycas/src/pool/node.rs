use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use smallvec::SmallVec;

use crate::expr::variant::{ComparisonOperator, ConstantKind, ExprType};

use super::NodeKey;

/// Bytes charged for every node, independently of its payload.
pub const NODE_HEADER_SIZE: usize = 16;
/// Bytes charged per child reference.
pub const CHILD_REFERENCE_SIZE: usize = 4;

/// Kind-specific data carried by a node.
///
/// Operators carry [`Payload::None`]; the payload of every other kind is fixed by its
/// [`ExprType`] (see [`Payload::matches_kind`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    Rational(BigRational),
    Decimal(BigDecimal),
    /// Symbol or user function name.
    Name(String),
    Constant(ConstantKind),
    Infinity { negative: bool },
    Matrix { rows: u32, columns: u32 },
    Comparison(ComparisonOperator),
}

impl Payload {
    /// Bytes this payload occupies in the pool budget.
    pub fn byte_size(&self) -> usize {
        match self {
            Payload::None => 0,
            Payload::Rational(r) => bigint_size(r.numer()) + bigint_size(r.denom()),
            Payload::Decimal(d) => {
                let (mantissa, _) = d.as_bigint_and_exponent();
                bigint_size(&mantissa) + 8
            }
            Payload::Name(name) => name.len() + 1,
            Payload::Constant(_) | Payload::Infinity { .. } | Payload::Comparison(_) => 1,
            Payload::Matrix { .. } => 8,
        }
    }

    /// Whether this payload is the one nodes of `kind` carry.
    pub fn matches_kind(&self, kind: ExprType) -> bool {
        match kind {
            ExprType::Rational => matches!(self, Payload::Rational(_)),
            ExprType::Decimal => matches!(self, Payload::Decimal(_)),
            ExprType::Symbol | ExprType::Function => matches!(self, Payload::Name(_)),
            ExprType::Constant => matches!(self, Payload::Constant(_)),
            ExprType::Infinity => matches!(self, Payload::Infinity { .. }),
            ExprType::Matrix => matches!(self, Payload::Matrix { .. }),
            ExprType::Comparison => matches!(self, Payload::Comparison(_)),
            _ => matches!(self, Payload::None),
        }
    }
}

fn bigint_size(value: &BigInt) -> usize {
    (value.bits() as usize).div_ceil(8).max(1) + 1
}

/// A node record stored in the pool.
///
/// Nodes are immutable once allocated: rewrites allocate new nodes and release the old ones.
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: ExprType,
    pub(crate) payload: Payload,
    pub(crate) children: SmallVec<[NodeKey; 4]>,
    pub(crate) reference_count: u32,
    /// Set while some node holds this one as a child.
    pub(crate) has_parent: bool,
    /// Allocation sequence number; strictly increasing along the physical order.
    pub(crate) serial: u64,
    pub(crate) size: usize,
    pub(crate) key: NodeKey,
}

impl Node {
    pub(crate) fn size_for(payload: &Payload, number_of_children: usize) -> usize {
        NODE_HEADER_SIZE + CHILD_REFERENCE_SIZE * number_of_children + payload.byte_size()
    }

    pub fn kind(&self) -> ExprType {
        self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn reference_count(&self) -> u32 {
        self.reference_count
    }

    pub fn has_parent(&self) -> bool {
        self.has_parent
    }

    /// Bytes charged to the pool for this node.
    pub fn size(&self) -> usize {
        self.size
    }
}
