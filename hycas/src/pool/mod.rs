//! Fixed-capacity tree pool holding every expression node.
//!
//! Role
//! - Store variable-size nodes in allocation order inside a single byte budget.
//! - Resolve logical [`NodeKey`]s to physical slots so that handles survive compaction.
//! - Provide O(1) checkpoints and rollbacks proportional to the work done since.
//!
//! Performance
//! - Allocation is amortized O(1).
//! - Releasing a node slides every node allocated after it; rolling back a suffix slides nothing.
//!
//! Example
//! ```rust
//! use hycas::pool::Pool;
//! let pool = Pool::with_capacity(4096);
//! let before = pool.used_bytes();
//! let checkpoint = pool.checkpoint();
//! let two = pool.integer(2).unwrap();
//! assert!(pool.used_bytes() > before);
//! drop(two);
//! pool.rollback(checkpoint);
//! assert_eq!(pool.used_bytes(), before);
//! ```

mod node;

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};

use log::debug;
use slotmap::{SlotMap, new_key_type};
use smallvec::{SmallVec, smallvec};
use thiserror::Error;

use crate::expr::variant::ExprType;

pub use node::{CHILD_REFERENCE_SIZE, NODE_HEADER_SIZE, Node, Payload};

new_key_type! {
    /// Logical identifier of a node. Stable across compaction, stale once the node is freed.
    pub struct NodeKey;
}

/// Default pool budget in bytes.
pub const DEFAULT_POOL_CAPACITY: usize = 128 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("tree pool exhausted: {requested} bytes requested, {available} available")]
    OutOfMemory { requested: usize, available: usize },
    #[error("expression belongs to another pool")]
    ForeignNode,
    #[error("a {rows}x{columns} matrix cannot hold {entries} entries")]
    MatrixShape { rows: usize, columns: usize, entries: usize },
}

pub type PoolResult<T> = Result<T, PoolError>;

/// Allocation high-water mark returned by [`TreePool::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint {
    serial: u64,
}

/// Slab of nodes kept in allocation order.
pub struct TreePool {
    nodes: Vec<Node>,
    identifiers: SlotMap<NodeKey, usize>,
    capacity: usize,
    used: usize,
    next_serial: u64,
}

impl TreePool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            identifiers: SlotMap::with_key(),
            capacity,
            used: 0,
            next_serial: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used_bytes(&self) -> usize {
        self.used
    }

    pub fn free_bytes(&self) -> usize {
        self.capacity - self.used
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Resolve a key, `None` when the node has been freed.
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.identifiers.get(key).map(|&index| &self.nodes[index])
    }

    fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        let index = *self.identifiers.get(key)?;
        Some(&mut self.nodes[index])
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.identifiers.contains_key(key)
    }

    pub fn has_parent(&self, key: NodeKey) -> bool {
        self.node(key).is_some_and(|node| node.has_parent)
    }

    /// Allocate a node with reference count 1.
    ///
    /// Every child gains one reference and is marked as having a parent.
    pub fn allocate(
        &mut self,
        kind: ExprType,
        payload: Payload,
        children: &[NodeKey],
    ) -> PoolResult<NodeKey> {
        let size = Node::size_for(&payload, children.len());
        let available = self.free_bytes();
        if size > available {
            debug!("tree pool exhausted allocating {kind:?}: {size} bytes requested, {available} available");
            return Err(PoolError::OutOfMemory { requested: size, available });
        }

        for &child in children {
            if let Some(node) = self.node_mut(child) {
                node.reference_count += 1;
                node.has_parent = true;
            }
        }

        let key = self.identifiers.insert(self.nodes.len());
        self.nodes.push(Node {
            kind,
            payload,
            children: children.iter().copied().collect(),
            reference_count: 1,
            has_parent: false,
            serial: self.next_serial,
            size,
            key,
        });
        self.next_serial += 1;
        self.used += size;
        Ok(key)
    }

    pub fn retain(&mut self, key: NodeKey) {
        if let Some(node) = self.node_mut(key) {
            node.reference_count += 1;
        }
    }

    /// Drop one reference; nodes reaching zero are freed along with the children they owned.
    ///
    /// Releasing a stale key is a no-op.
    pub fn release(&mut self, key: NodeKey) {
        let mut pending: SmallVec<[NodeKey; 16]> = smallvec![key];
        while let Some(key) = pending.pop() {
            let Some(&index) = self.identifiers.get(key) else {
                continue;
            };
            let node = &mut self.nodes[index];
            node.reference_count = node.reference_count.saturating_sub(1);
            if node.reference_count > 0 {
                continue;
            }

            let freed = self.remove_at(index);
            for child in freed.children {
                if let Some(node) = self.node_mut(child) {
                    node.has_parent = false;
                }
                pending.push(child);
            }
        }
    }

    /// Free `key` and hand its child references over to the caller.
    ///
    /// Only succeeds when the caller holds the sole reference; the children come back
    /// detached from any parent.
    pub fn dismantle(&mut self, key: NodeKey) -> Option<SmallVec<[NodeKey; 4]>> {
        let &index = self.identifiers.get(key)?;
        if self.nodes[index].reference_count != 1 {
            return None;
        }
        let freed = self.remove_at(index);
        for &child in &freed.children {
            if let Some(node) = self.node_mut(child) {
                node.has_parent = false;
            }
        }
        Some(freed.children)
    }

    /// Remove the node at a physical index and slide the following nodes down.
    fn remove_at(&mut self, index: usize) -> Node {
        let node = self.nodes.remove(index);
        self.identifiers.remove(node.key);
        self.used -= node.size;
        for (offset, moved) in self.nodes[index..].iter().enumerate() {
            if let Some(slot) = self.identifiers.get_mut(moved.key) {
                *slot = index + offset;
            }
        }
        node
    }

    /// Copy the whole subtree rooted at `root` into fresh, parentless nodes.
    ///
    /// A stale root copies as an Undefined leaf. On failure every partial copy is released.
    pub fn deep_copy(&mut self, root: NodeKey) -> PoolResult<NodeKey> {
        enum Frame {
            Enter(NodeKey),
            Exit(NodeKey),
        }

        let mut stack: SmallVec<[Frame; 16]> = smallvec![Frame::Enter(root)];
        let mut copies: SmallVec<[NodeKey; 16]> = SmallVec::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(key) => {
                    stack.push(Frame::Exit(key));
                    if let Some(node) = self.node(key) {
                        stack.extend(node.children.iter().rev().map(|&child| Frame::Enter(child)));
                    }
                }
                Frame::Exit(key) => {
                    let (kind, payload, arity) = match self.node(key) {
                        Some(node) => (node.kind, node.payload.clone(), node.children.len()),
                        None => (ExprType::Undefined, Payload::None, 0),
                    };
                    let children: SmallVec<[NodeKey; 4]> =
                        copies.drain(copies.len() - arity..).collect();
                    let allocated = self.allocate(kind, payload, &children);
                    // The new parent took its own reference on each child.
                    for &child in &children {
                        self.release(child);
                    }
                    match allocated {
                        Ok(copy) => copies.push(copy),
                        Err(err) => {
                            for key in copies.drain(..) {
                                self.release(key);
                            }
                            return Err(err);
                        }
                    }
                }
            }
        }

        debug_assert_eq!(copies.len(), 1);
        match copies.pop() {
            Some(copy) => Ok(copy),
            None => self.allocate(ExprType::Undefined, Payload::None, &[]),
        }
    }

    /// Record the current allocation serial.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { serial: self.next_serial }
    }

    /// Free every node allocated since `checkpoint`.
    ///
    /// The references those nodes held on older nodes are given back. Handles onto the freed
    /// nodes become stale.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let start = self.nodes.partition_point(|node| node.serial < checkpoint.serial);
        if start == self.nodes.len() {
            return;
        }

        let freed: Vec<Node> = self.nodes.drain(start..).collect();
        for node in &freed {
            self.identifiers.remove(node.key);
            self.used -= node.size;
        }
        debug!("tree pool rollback freed {} nodes", freed.len());

        for node in freed {
            for child in node.children {
                match self.node_mut(child) {
                    Some(older) => older.has_parent = false,
                    None => continue,
                }
                self.release(child);
            }
        }
    }
}

impl fmt::Debug for TreePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreePool")
            .field("nodes", &self.nodes.len())
            .field("used", &self.used)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Shared front-end over a [`TreePool`].
///
/// Cloning a `Pool` clones the reference, not the nodes. Every builder lives here, see
/// [`crate::expr::builder`].
#[derive(Clone)]
pub struct Pool {
    inner: Rc<RefCell<TreePool>>,
}

impl Pool {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: Rc::new(RefCell::new(TreePool::with_capacity(capacity))) }
    }

    pub(crate) fn borrow(&self) -> Ref<'_, TreePool> {
        self.inner.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, TreePool> {
        self.inner.borrow_mut()
    }

    pub(crate) fn try_borrow_mut(&self) -> Option<RefMut<'_, TreePool>> {
        self.inner.try_borrow_mut().ok()
    }

    pub fn same_pool(&self, other: &Pool) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn capacity(&self) -> usize {
        self.borrow().capacity()
    }

    pub fn used_bytes(&self) -> usize {
        self.borrow().used_bytes()
    }

    pub fn free_bytes(&self) -> usize {
        self.borrow().free_bytes()
    }

    pub fn number_of_nodes(&self) -> usize {
        self.borrow().number_of_nodes()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.borrow().checkpoint()
    }

    pub fn rollback(&self, checkpoint: Checkpoint) {
        self.borrow_mut().rollback(checkpoint);
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(pool) => pool.fmt(f),
            Err(_) => f.write_str("Pool { <borrowed> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(pool: &mut TreePool) -> NodeKey {
        pool.allocate(ExprType::Symbol, Payload::Name("x".into()), &[]).unwrap()
    }

    #[test]
    fn compaction_preserves_lookups() {
        let mut pool = TreePool::with_capacity(1024);
        let a = leaf(&mut pool);
        let b = leaf(&mut pool);
        let c = pool.allocate(ExprType::Opposite, Payload::None, &[b]).unwrap();
        pool.release(b);

        pool.release(a);
        assert!(!pool.contains(a));
        assert_eq!(pool.node(c).unwrap().kind, ExprType::Opposite);
        assert_eq!(pool.node(b).unwrap().reference_count, 1);
        assert!(pool.has_parent(b));

        pool.release(c);
        assert_eq!(pool.number_of_nodes(), 0);
        assert_eq!(pool.used_bytes(), 0);
    }

    #[test]
    fn dismantle_requires_unique_ownership() {
        let mut pool = TreePool::with_capacity(1024);
        let x = leaf(&mut pool);
        let parent = pool.allocate(ExprType::Factorial, Payload::None, &[x]).unwrap();
        pool.release(x);

        pool.retain(parent);
        assert!(pool.dismantle(parent).is_none());
        pool.release(parent);

        let children = pool.dismantle(parent).unwrap();
        assert_eq!(children.as_slice(), &[x]);
        assert!(!pool.has_parent(x));
        assert_eq!(pool.number_of_nodes(), 1);
    }

    #[test]
    fn rollback_restores_older_reference_counts() {
        let mut pool = TreePool::with_capacity(1024);
        let x = leaf(&mut pool);
        let checkpoint = pool.checkpoint();
        let _wrapper = pool.allocate(ExprType::Parenthesis, Payload::None, &[x]).unwrap();
        assert_eq!(pool.node(x).unwrap().reference_count, 2);

        pool.rollback(checkpoint);
        assert_eq!(pool.number_of_nodes(), 1);
        assert_eq!(pool.node(x).unwrap().reference_count, 1);
        assert!(!pool.has_parent(x));
    }

    #[test]
    fn out_of_memory_reports_sizes() {
        let mut pool = TreePool::with_capacity(NODE_HEADER_SIZE);
        let err = pool.allocate(ExprType::Symbol, Payload::Name("abc".into()), &[]).unwrap_err();
        assert_eq!(err, PoolError::OutOfMemory { requested: NODE_HEADER_SIZE + 4, available: NODE_HEADER_SIZE });
    }
}
