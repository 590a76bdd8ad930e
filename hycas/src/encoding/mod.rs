//! Compact byte encoding of expression trees, used to move trees between pools.
//!
//! Layout
//! - Nodes are written in post-order: children first, then the node itself.
//! - A node is its payload fields, its child count and finally its opcode byte (the
//!   [`ExprType`] discriminant).
//! - Decoding starts from the last byte: opcode, child count, payload read in reverse, then
//!   the children from last to first. Blobs are written as bytes followed by their length.
//!
//! Example
//! ```rust
//! use hycas::Pool;
//! let source = Pool::new();
//! let e = source.parse("2x+cos(π/3)").unwrap();
//! let bytes = e.to_bytes();
//! assert_eq!(bytes.len(), e.byte_size());
//!
//! let target = Pool::new();
//! let copy = target.expression_from_bytes(&bytes).unwrap();
//! assert!(copy.is_identical_to(&e));
//! ```

pub mod integer;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    expr::{
        Expression,
        variant::{ComparisonOperator, ConstantKind, ExprType},
    },
    pool::{NodeKey, Payload, Pool, PoolError, PoolResult, TreePool},
};

use self::integer::{decode_bytes, decode_i64, decode_u64, encode_bytes, encode_i64, encode_u64};

/// Stack-first buffer the encoder writes into.
pub type DynBuf = SmallVec<[u8; 64]>;

/// Deepest tree [`Pool::expression_from_bytes`] accepts.
pub const MAX_DECODE_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("input ends in the middle of a node")]
    Truncated,
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("malformed payload for {0:?}")]
    InvalidPayload(ExprType),
    #[error("{kind:?} cannot have {found} children")]
    ArityMismatch { kind: ExprType, found: usize },
    #[error("{0} bytes left after the root node")]
    TrailingBytes(usize),
    #[error("name is not valid UTF-8")]
    InvalidUtf8,
    #[error("tree is deeper than {MAX_DECODE_DEPTH} levels")]
    TooDeep,
    #[error(transparent)]
    AllocationFailure(#[from] PoolError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Values that can append their raw encoding to a byte sink.
pub trait RawEncodable {
    /// Feed the encoding to `f` and return the number of bytes written.
    fn encode_raw<F: FnMut(&[u8])>(&self, f: &mut F) -> u64;

    fn encode_dynbuf(&self, buf: &mut DynBuf) {
        self.encode_raw(&mut |b| buf.extend_from_slice(b));
    }

    fn encoded_size(&self) -> u64 {
        self.encode_raw(&mut |_| {})
    }
}

impl<T: RawEncodable> RawEncodable for &T {
    #[inline]
    fn encode_raw<F: FnMut(&[u8])>(&self, f: &mut F) -> u64 {
        (*self).encode_raw(f)
    }
}

fn encode_bigint<F: FnMut(&[u8])>(value: &BigInt, f: &mut F) -> u64 {
    encode_bytes(&value.to_signed_bytes_le(), f)
}

impl RawEncodable for Payload {
    fn encode_raw<F: FnMut(&[u8])>(&self, f: &mut F) -> u64 {
        match self {
            Payload::None => 0,
            Payload::Rational(value) => encode_bigint(value.numer(), f) + encode_bigint(value.denom(), f),
            Payload::Decimal(value) => {
                let (mantissa, scale) = value.as_bigint_and_exponent();
                encode_bigint(&mantissa, f) + encode_i64(scale, f)
            }
            Payload::Name(name) => encode_bytes(name.as_bytes(), f),
            Payload::Constant(kind) => encode_u64(*kind as u64, f),
            Payload::Infinity { negative } => encode_u64(u64::from(*negative), f),
            Payload::Matrix { rows, columns } => encode_u64(u64::from(*rows), f) + encode_u64(u64::from(*columns), f),
            Payload::Comparison(operator) => encode_u64(*operator as u64, f),
        }
    }
}

fn encode_node<F: FnMut(&[u8])>(pool: &TreePool, key: NodeKey, f: &mut F) -> u64 {
    let Some(node) = pool.node(key) else {
        // A stale handle reads as Undefined.
        let size = encode_u64(0, f);
        f(&[ExprType::Undefined as u8]);
        return size + 1;
    };
    let mut size = 0;
    for &child in node.children() {
        size += encode_node(pool, child, f);
    }
    size += node.payload().encode_raw(f);
    size += encode_u64(node.children().len() as u64, f);
    f(&[node.kind() as u8]);
    size + 1
}

impl RawEncodable for Expression {
    fn encode_raw<F: FnMut(&[u8])>(&self, f: &mut F) -> u64 {
        encode_node(&self.pool().borrow(), self.key(), f)
    }
}

impl Expression {
    /// Encode the whole subtree.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = DynBuf::new();
        self.encode_dynbuf(&mut buf);
        buf.into_vec()
    }

    /// Length of [`Expression::to_bytes`] without materializing it.
    pub fn byte_size(&self) -> usize {
        self.encoded_size() as usize
    }
}

fn decode_bigint(buf: &mut &[u8], kind: ExprType) -> DecodeResult<BigInt> {
    let bytes = decode_bytes(buf).ok_or(DecodeError::Truncated)?;
    if bytes.is_empty() {
        return Err(DecodeError::InvalidPayload(kind));
    }
    Ok(BigInt::from_signed_bytes_le(bytes))
}

fn decode_small(buf: &mut &[u8]) -> DecodeResult<u64> {
    decode_u64(buf).ok_or(DecodeError::Truncated)
}

/// Payload fields come off the end in reverse order of writing.
fn decode_payload(kind: ExprType, buf: &mut &[u8]) -> DecodeResult<Payload> {
    let invalid = || DecodeError::InvalidPayload(kind);
    Ok(match kind {
        ExprType::Rational => {
            let denominator = decode_bigint(buf, kind)?;
            let numerator = decode_bigint(buf, kind)?;
            if denominator.is_zero() {
                return Err(invalid());
            }
            Payload::Rational(BigRational::new(numerator, denominator))
        }
        ExprType::Decimal => {
            let scale = decode_i64(buf).ok_or(DecodeError::Truncated)?;
            let mantissa = decode_bigint(buf, kind)?;
            Payload::Decimal(BigDecimal::new(mantissa, scale))
        }
        ExprType::Symbol | ExprType::Function => {
            let bytes = decode_bytes(buf).ok_or(DecodeError::Truncated)?;
            let name = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
            if name.is_empty() {
                return Err(invalid());
            }
            Payload::Name(name.to_owned())
        }
        ExprType::Constant => {
            let tag = u8::try_from(decode_small(buf)?).map_err(|_| invalid())?;
            Payload::Constant(ConstantKind::from_repr(tag).ok_or_else(invalid)?)
        }
        ExprType::Infinity => match decode_small(buf)? {
            0 => Payload::Infinity { negative: false },
            1 => Payload::Infinity { negative: true },
            _ => return Err(invalid()),
        },
        ExprType::Matrix => {
            let columns = u32::try_from(decode_small(buf)?).map_err(|_| invalid())?;
            let rows = u32::try_from(decode_small(buf)?).map_err(|_| invalid())?;
            if rows == 0 || columns == 0 {
                return Err(invalid());
            }
            Payload::Matrix { rows, columns }
        }
        ExprType::Comparison => {
            let tag = u8::try_from(decode_small(buf)?).map_err(|_| invalid())?;
            Payload::Comparison(ComparisonOperator::from_repr(tag).ok_or_else(invalid)?)
        }
        _ => Payload::None,
    })
}

fn accepts_children(kind: ExprType, payload: &Payload, count: usize) -> bool {
    match payload {
        Payload::Matrix { rows, columns } => count == *rows as usize * *columns as usize,
        _ => kind.arity().accepts(count),
    }
}

fn decode_node(pool: &Pool, buf: &mut &[u8], depth: usize) -> DecodeResult<Expression> {
    if depth > MAX_DECODE_DEPTH {
        return Err(DecodeError::TooDeep);
    }
    let (&opcode, rest) = buf.split_last().ok_or(DecodeError::Truncated)?;
    *buf = rest;
    let kind = ExprType::from_repr(opcode).ok_or(DecodeError::UnknownOpcode(opcode))?;
    let count = usize::try_from(decode_small(buf)?).map_err(|_| DecodeError::Truncated)?;
    let payload = decode_payload(kind, buf)?;

    if !accepts_children(kind, &payload, count) {
        return Err(DecodeError::ArityMismatch { kind, found: count });
    }

    let mut children = Vec::with_capacity(count.min(buf.len()));
    for _ in 0..count {
        children.push(decode_node(pool, buf, depth + 1)?);
    }
    children.reverse();
    Ok(pool.build(kind, payload, children)?)
}

impl Pool {
    /// Rebuild a tree written by [`Expression::to_bytes`] inside this pool.
    pub fn expression_from_bytes(&self, bytes: &[u8]) -> DecodeResult<Expression> {
        let mut buf = bytes;
        let e = decode_node(self, &mut buf, 0)?;
        if !buf.is_empty() {
            return Err(DecodeError::TrailingBytes(buf.len()));
        }
        Ok(e)
    }

    /// Copy `e` into this pool, whichever pool it currently lives in.
    pub fn import(&self, e: &Expression) -> PoolResult<Expression> {
        if e.pool().same_pool(self) {
            return e.deep_clone();
        }
        self.expression_from_bytes(&e.to_bytes()).map_err(|error| match error {
            DecodeError::AllocationFailure(error) => error,
            _ => PoolError::ForeignNode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_payload_kind_crosses_pools() {
        let source = Pool::with_capacity(16384);
        let target = Pool::with_capacity(16384);
        let e = source.parse("[[-3/4,1.5ᴇ-7][x≤inf,f(𝐢)]]").unwrap();
        let copy = target.import(&e).unwrap();
        assert!(copy.pool().same_pool(&target));
        assert!(copy.is_identical_to(&e));
    }

    #[test]
    fn corrupted_inputs_are_rejected() {
        let pool = Pool::with_capacity(4096);
        let bytes = pool.parse("x+1").unwrap().to_bytes();

        assert_eq!(pool.expression_from_bytes(&[]).unwrap_err(), DecodeError::Truncated);
        assert_eq!(pool.expression_from_bytes(&[0xff]).unwrap_err(), DecodeError::UnknownOpcode(0xff));
        assert_eq!(pool.expression_from_bytes(&bytes[1..]).unwrap_err(), DecodeError::Truncated);

        let mut padded = vec![0];
        padded.extend_from_slice(&bytes);
        assert_eq!(pool.expression_from_bytes(&padded).unwrap_err(), DecodeError::TrailingBytes(1));
    }

    #[test]
    fn import_into_a_full_pool_reports_allocation_failure() {
        let source = Pool::with_capacity(16384);
        let tiny = Pool::with_capacity(32);
        let e = source.parse("1+2+3+4").unwrap();
        assert!(matches!(tiny.import(&e), Err(PoolError::OutOfMemory { .. })));
    }
}
