//! Indexed lookup.

use super::{NodeId, QuickList};
use crate::block::Value;
use crate::error::{Error, Result};

/// One resolved entry: where it lives and what it holds.
///
/// An `Entry` is a snapshot. Any mutation of the list other than the one it
/// is handed to may leave it pointing at a different entry or a freed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub(crate) node: NodeId,
    pub(crate) index: usize,
    pub(crate) offset: usize,
    pub(crate) value: Value,
}

impl Entry {
    /// The node holding this entry.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Position of the entry inside its node.
    pub fn index_in_node(&self) -> usize {
        self.index
    }

    /// Byte offset of the entry inside its node's block.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The decoded value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the entry and returns its value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Returns true if the stored value equals `bytes`. Integers compare by
    /// their decimal form.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.value.eq_bytes(bytes)
    }
}

impl QuickList {
    /// Returns the entry at `index`. Negative indexes count from the tail,
    /// `-1` being the last entry.
    ///
    /// Compressed nodes are decoded into a temporary copy; the list itself
    /// is not modified.
    pub fn index(&self, index: i64) -> Result<Entry> {
        let (node, idx) = self.locate(index).ok_or_else(|| Error::out_of_range(index, self.count))?;
        let block = self.nodes[node].read_block()?;
        let offset = block
            .offset_of(idx as isize)
            .ok_or_else(|| Error::internal(format!("node {:?} holds fewer entries than recorded", node)))?;
        Ok(Entry { node, index: idx, offset, value: block.get(offset) })
    }

    /// Resolves a logical index to `(node, index inside node)`, walking from
    /// whichever end is closer.
    pub(crate) fn locate(&self, index: i64) -> Option<(NodeId, usize)> {
        let len = self.count;
        let pos = if index < 0 {
            len.checked_sub(usize::try_from(index.unsigned_abs()).ok()?)?
        } else {
            usize::try_from(index).ok()?
        };
        if pos >= len {
            return None;
        }

        if pos <= len / 2 {
            let mut seen = 0;
            let mut cur = self.head;
            while let Some(id) = cur {
                let node = &self.nodes[id];
                if pos < seen + node.count() {
                    return Some((id, pos - seen));
                }
                seen += node.count();
                cur = node.next;
            }
        } else {
            let back = len - 1 - pos;
            let mut seen = 0;
            let mut cur = self.tail;
            while let Some(id) = cur {
                let node = &self.nodes[id];
                if back < seen + node.count() {
                    return Some((id, node.count() - 1 - (back - seen)));
                }
                seen += node.count();
                cur = node.prev;
            }
        }
        None
    }
}
