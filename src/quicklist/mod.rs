//! # QuickList - Linked List of Packed Blocks
//!
//! A doubly linked list whose nodes each hold a [`Block`] of entries.
//!
//! ## Design
//!
//! - Nodes live in an arena and link to each other by [`NodeId`]
//! - Each node is bounded by the list's [`FillPolicy`]; a full node is
//!   split on insert, and neighbours that fit together are merged back
//! - The `compress_depth` nodes at each end stay raw, interior nodes are
//!   compressed when the compressor finds a saving
//! - Counts and sizes always describe the uncompressed content, so reads
//!   never need to decompress just to answer `len()`
//!
//! ## Thread Safety
//!
//! A `QuickList` is a plain single-owner value. Share it behind a lock if
//! several threads need it.

mod arena;
mod compress;
mod delete;
mod insert;
mod iter;
mod lookup;
mod node;
mod validation;

pub use arena::NodeId;
pub use iter::{Cursor, Iter};
pub use lookup::Entry;
pub use node::NodeInfo;

use bytes::Bytes;

use crate::block::{Block, Value};
use crate::config::{CompressionType, FillPolicy, Options};
use crate::error::{Error, Result};
use arena::NodeArena;
use node::Node;

/// One end of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    /// The first entry.
    Head,
    /// The last entry.
    Tail,
}

/// Direction of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Head to tail.
    Forward,
    /// Tail to head.
    Backward,
}

/// A list of byte-string and integer entries packed into blocks.
///
/// # Example
///
/// ```rust
/// use quicklist::{FillPolicy, Options, QuickList};
///
/// # fn main() -> Result<(), quicklist::Error> {
/// let mut list = QuickList::new(Options::new().fill(FillPolicy::Count(2)))?;
/// list.push_tail(b"a")?;
/// list.push_tail(b"b")?;
/// list.push_tail(b"c")?;
/// assert_eq!(list.len(), 3);
/// assert_eq!(list.node_count(), 2);
/// assert!(list.index(-1)?.matches(b"c"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QuickList {
    nodes: NodeArena,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    /// Total entries across all nodes
    count: usize,
    fill: FillPolicy,
    compress_depth: u16,
    compression: CompressionType,
}

impl QuickList {
    /// Creates an empty list, rejecting invalid options.
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        Ok(Self::with_options(options))
    }

    fn with_options(options: Options) -> Self {
        Self {
            nodes: NodeArena::new(),
            head: None,
            tail: None,
            count: 0,
            fill: options.fill,
            compress_depth: options.compress_depth,
            compression: options.compression,
        }
    }

    /// Creates a list holding `block` as its only node.
    pub fn from_block(options: Options, block: Block) -> Result<Self> {
        let mut list = Self::new(options)?;
        list.append_block(block)?;
        Ok(list)
    }

    /// The options currently in effect.
    pub fn options(&self) -> Options {
        Options {
            fill: self.fill,
            compress_depth: self.compress_depth,
            compression: self.compression,
        }
    }

    /// Changes the fill policy for subsequent operations.
    ///
    /// Existing nodes are not resized here. A node that breaks the new policy
    /// is re-split the next time an insertion lands in it.
    pub fn set_fill(&mut self, fill: FillPolicy) -> Result<()> {
        fill.validate()?;
        self.fill = fill;
        let mut cur = self.head;
        while let Some(id) = cur {
            let node = &mut self.nodes[id];
            node.mark_oversized(fill);
            cur = node.next;
        }
        Ok(())
    }

    /// Changes the compression depth. Existing nodes are recompressed or
    /// decompressed only as later mutations touch the list.
    pub fn set_compress_depth(&mut self, depth: u16) {
        self.compress_depth = depth;
    }

    /// Changes fill policy and compression depth together.
    pub fn set_options(&mut self, fill: FillPolicy, compress_depth: u16) -> Result<()> {
        self.set_fill(fill)?;
        self.set_compress_depth(compress_depth);
        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Adds `value` at `end`.
    pub fn push(&mut self, end: End, value: &[u8]) -> Result<()> {
        match end {
            End::Head => self.push_head(value),
            End::Tail => self.push_tail(value),
        }
    }

    /// Adds `value` before the first entry.
    pub fn push_head(&mut self, value: &[u8]) -> Result<()> {
        let id = match self.head {
            Some(head) if self.nodes[head].allows_insert(self.fill, value) => {
                self.nodes[head].update(|block| block.push_front(value))?;
                head
            }
            _ => {
                let id = self.new_node(value)?;
                match self.head {
                    Some(head) => self.link_before(head, id),
                    None => self.link_only(id),
                }
                id
            }
        };
        self.count += 1;
        self.refresh_compression(&[id])
    }

    /// Adds `value` after the last entry.
    pub fn push_tail(&mut self, value: &[u8]) -> Result<()> {
        let id = match self.tail {
            Some(tail) if self.nodes[tail].allows_insert(self.fill, value) => {
                self.nodes[tail].update(|block| block.push_back(value))?;
                tail
            }
            _ => {
                let id = self.new_node(value)?;
                self.link_tail(id);
                id
            }
        };
        self.count += 1;
        self.refresh_compression(&[id])
    }

    /// Removes and returns the entry at `end`, or `None` if the list is
    /// empty.
    pub fn pop(&mut self, end: End) -> Result<Option<Value>> {
        let Some(id) = (match end {
            End::Head => self.head,
            End::Tail => self.tail,
        }) else {
            return Ok(None);
        };

        let value = self.nodes[id].update(|block| {
            let offset = match end {
                End::Head => block.first_offset(),
                End::Tail => block.last_offset(),
            }
            .ok_or_else(|| Error::internal("empty node linked into list"))?;
            let value = block.get(offset);
            block.remove_at(offset);
            Ok(value)
        })?;
        self.count -= 1;

        if self.nodes[id].count() == 0 {
            self.unlink_node(id);
            self.refresh_compression(&[])?;
        } else {
            self.refresh_compression(&[id])?;
        }
        Ok(Some(value))
    }

    /// Removes and returns the first entry.
    pub fn pop_head(&mut self) -> Result<Option<Value>> {
        self.pop(End::Head)
    }

    /// Removes and returns the last entry.
    pub fn pop_tail(&mut self) -> Result<Option<Value>> {
        self.pop(End::Tail)
    }

    /// Moves the last entry to the front.
    pub fn rotate(&mut self) -> Result<()> {
        if self.count <= 1 {
            return Ok(());
        }
        let Some(tail) = self.tail else {
            return Ok(());
        };

        let value = {
            let block = self.nodes[tail].read_block()?;
            let offset = block
                .last_offset()
                .ok_or_else(|| Error::internal("empty node linked into list"))?;
            block.get(offset)
        };
        self.push_head(&value.to_bytes())?;
        self.pop(End::Tail)?;
        Ok(())
    }

    /// Deep copy of the list. Compressed nodes are copied without
    /// decompressing them.
    pub fn duplicate(&self) -> Result<QuickList> {
        let mut copy = QuickList::new(self.options())?;
        copy.nodes.reserve(self.nodes.len())?;
        for id in self.node_ids() {
            let node = self.nodes[id].try_clone()?;
            let new_id = copy.nodes.allocate(node)?;
            copy.link_tail(new_id);
        }
        copy.count = self.count;
        Ok(copy)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
        self.count = 0;
    }

    /// Appends `block` as a new tail node.
    ///
    /// The block is adopted as is when it fits the fill policy (or holds a
    /// single entry); otherwise its values are copied one by one.
    pub fn append_block(&mut self, block: Block) -> Result<()> {
        if block.is_empty() {
            return Ok(());
        }
        if block.len() > 1 && !self.fill.allows(block.byte_len(), block.len()) {
            return self.append_values_from_block(&block);
        }

        let added = block.len();
        let id = self.nodes.allocate(Node::new(block))?;
        self.link_tail(id);
        self.count += added;
        log::trace!("Adopted block with {} entries as node {:?}", added, id);
        self.refresh_compression(&[id])
    }

    /// Copies every value of `block` to the tail. On failure the values
    /// already copied are removed again and the error is returned.
    pub fn append_values_from_block(&mut self, block: &Block) -> Result<()> {
        let before = self.count;
        for (_, value) in block {
            if let Err(e) = self.push_tail(&value.to_bytes()) {
                let added = self.count - before;
                if added > 0 {
                    if let Err(rollback) = self.delete_range(-(added as i64), added) {
                        log::error!("Failed to roll back partial block append: {}", rollback);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Per-node diagnostics in head-to-tail order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeInfo> + '_ {
        self.node_ids().map(move |id| self.nodes[id].info(id))
    }

    /// The compressed bytes of a node, if it is currently compressed.
    pub fn compressed_payload(&self, id: NodeId) -> Option<Bytes> {
        self.nodes.get(id)?.compressed().map(|c| c.as_bytes().clone())
    }

    pub(crate) fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.head, move |&id| self.nodes[id].next)
    }

    /// Allocates an unlinked node holding just `value`.
    fn new_node(&mut self, value: &[u8]) -> Result<NodeId> {
        let mut block = Block::new();
        block.push_back(value)?;
        let id = self.nodes.allocate(Node::new(block))?;
        log::trace!("Created node {:?}", id);
        Ok(id)
    }

    /// Links `id` as the only node of an empty list.
    fn link_only(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        node.prev = None;
        node.next = None;
        self.head = Some(id);
        self.tail = Some(id);
    }

    fn link_tail(&mut self, id: NodeId) {
        match self.tail {
            Some(tail) => self.link_after(tail, id),
            None => self.link_only(id),
        }
    }

    /// Links `id` right after `anchor`.
    pub(crate) fn link_after(&mut self, anchor: NodeId, id: NodeId) {
        let next = self.nodes[anchor].next;
        {
            let node = &mut self.nodes[id];
            node.prev = Some(anchor);
            node.next = next;
        }
        self.nodes[anchor].next = Some(id);
        match next {
            Some(next) => self.nodes[next].prev = Some(id),
            None => self.tail = Some(id),
        }
    }

    /// Links `id` right before `anchor`.
    pub(crate) fn link_before(&mut self, anchor: NodeId, id: NodeId) {
        let prev = self.nodes[anchor].prev;
        {
            let node = &mut self.nodes[id];
            node.prev = prev;
            node.next = Some(anchor);
        }
        self.nodes[anchor].prev = Some(id);
        match prev {
            Some(prev) => self.nodes[prev].next = Some(id),
            None => self.head = Some(id),
        }
    }

    /// Unlinks and frees `id`. The entry count is left to the caller.
    pub(crate) fn unlink_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.deallocate(id)?;
        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.tail = node.prev,
        }
        log::trace!("Removed node {:?} with {} entries", id, node.count());
        Some(node)
    }
}

impl Default for QuickList {
    fn default() -> Self {
        Self::with_options(Options::default())
    }
}
