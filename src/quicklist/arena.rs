//! Slot arena holding the nodes of one list.
//!
//! Nodes refer to their neighbours by [`NodeId`] instead of pointers, so
//! splitting, merging and relinking only rewrite indices.

use std::ops::{Index, IndexMut};

use super::node::Node;
use crate::error::Result;

/// Stable handle to a node inside one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn slot(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_raw_for_test(slot: u32) -> Self {
        NodeId(slot)
    }
}

#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    slots: Vec<Option<Node>>,
    free_list: Vec<u32>,
    allocated: usize,
}

impl NodeArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make room for `additional` more nodes so that the next allocations
    /// cannot fail.
    pub(crate) fn reserve(&mut self, additional: usize) -> Result<()> {
        let reusable = self.free_list.len();
        if additional > reusable {
            self.slots.try_reserve(additional - reusable)?;
        }
        Ok(())
    }

    pub(crate) fn allocate(&mut self, node: Node) -> Result<NodeId> {
        let id = match self.free_list.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.try_reserve(1)?;
                let slot = self.slots.len() as u32;
                self.slots.push(Some(node));
                NodeId(slot)
            }
        };
        self.allocated += 1;
        Ok(id)
    }

    pub(crate) fn deallocate(&mut self, id: NodeId) -> Option<Node> {
        let node = self.slots.get_mut(id.slot())?.take()?;
        self.free_list.push(id.0);
        self.allocated -= 1;
        Some(node)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.slot())?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.slot())?.as_mut()
    }

    /// Mutable access to two distinct nodes at once.
    pub(crate) fn pair_mut(&mut self, a: NodeId, b: NodeId) -> Option<(&mut Node, &mut Node)> {
        let (ia, ib) = (a.slot(), b.slot());
        if ia == ib || ia >= self.slots.len() || ib >= self.slots.len() {
            return None;
        }
        if ia < ib {
            let (lo, hi) = self.slots.split_at_mut(ib);
            Some((lo[ia].as_mut()?, hi[0].as_mut()?))
        } else {
            let (lo, hi) = self.slots.split_at_mut(ia);
            Some((hi[0].as_mut()?, lo[ib].as_mut()?))
        }
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.allocated
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.allocated = 0;
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {:?} is not allocated", id),
        }
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("node {:?} is not allocated", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn node_with(value: &[u8]) -> Node {
        let mut block = Block::new();
        block.push_back(value).unwrap();
        Node::new(block)
    }

    #[test]
    fn test_allocate_and_reuse() {
        let mut arena = NodeArena::new();
        let a = arena.allocate(node_with(b"a")).unwrap();
        let b = arena.allocate(node_with(b"b")).unwrap();
        assert_eq!(arena.len(), 2);
        assert_ne!(a, b);

        assert!(arena.deallocate(a).is_some());
        assert!(arena.deallocate(a).is_none());
        assert!(arena.get(a).is_none());
        assert_eq!(arena.len(), 1);

        let c = arena.allocate(node_with(b"c")).unwrap();
        assert_eq!(c, a, "freed slot should be reused");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_pair_mut() {
        let mut arena = NodeArena::new();
        let a = arena.allocate(node_with(b"a")).unwrap();
        let b = arena.allocate(node_with(b"b")).unwrap();

        let (na, nb) = arena.pair_mut(b, a).unwrap();
        assert_eq!(na.count(), 1);
        assert_eq!(nb.count(), 1);
        assert!(arena.pair_mut(a, a).is_none());

        arena.deallocate(b);
        assert!(arena.pair_mut(a, b).is_none());
    }

    #[test]
    #[should_panic(expected = "is not allocated")]
    fn test_index_freed_slot_panics() {
        let mut arena = NodeArena::new();
        let a = arena.allocate(node_with(b"a")).unwrap();
        arena.deallocate(a);
        let _ = &arena[a];
    }
}
