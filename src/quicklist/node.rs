//! A list node: one block of entries, held raw or compressed.

use std::borrow::Cow;

use super::arena::NodeId;
use crate::block::{Block, EMPTY_BLOCK_SIZE};
use crate::compression::CompressedBlock;
use crate::config::{CompressionType, FillPolicy};
use crate::error::{Error, Result};

/// The stored form of a node's block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Payload {
    Raw(Block),
    Compressed(CompressedBlock),
}

/// Per-node diagnostics, see [`QuickList::nodes`](super::QuickList::nodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    /// Handle of the node.
    pub id: NodeId,
    /// Entries held by the node.
    pub count: usize,
    /// Uncompressed block size in bytes.
    pub size: usize,
    /// Whether the block is currently stored compressed.
    pub compressed: bool,
    /// Whether the last compression attempt on the current content was
    /// declined.
    pub compress_declined: bool,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    payload: Payload,
    /// Entry count of the uncompressed block
    count: u16,
    /// Byte size of the uncompressed block
    size: usize,
    /// Compression was tried on the current content and did not pay off
    compress_declined: bool,
    /// Sized under an earlier, looser fill policy and not re-split since
    oversized: bool,
}

impl Node {
    pub(crate) fn new(block: Block) -> Self {
        Self {
            prev: None,
            next: None,
            count: block.len() as u16,
            size: block.byte_len(),
            payload: Payload::Raw(block),
            compress_declined: false,
            oversized: false,
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count as usize
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn is_compressed(&self) -> bool {
        matches!(self.payload, Payload::Compressed(_))
    }

    pub(crate) fn compressed(&self) -> Option<&CompressedBlock> {
        match &self.payload {
            Payload::Compressed(c) => Some(c),
            Payload::Raw(_) => None,
        }
    }

    pub(crate) fn info(&self, id: NodeId) -> NodeInfo {
        NodeInfo {
            id,
            count: self.count(),
            size: self.size,
            compressed: self.is_compressed(),
            compress_declined: self.compress_declined,
        }
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> Option<&Block> {
        match &self.payload {
            Payload::Raw(block) => Some(block),
            Payload::Compressed(_) => None,
        }
    }

    /// A readable block without changing how the node is stored: borrowed
    /// when raw, a decompressed copy otherwise.
    pub(crate) fn read_block(&self) -> Result<Cow<'_, Block>> {
        match &self.payload {
            Payload::Raw(block) => Ok(Cow::Borrowed(block)),
            Payload::Compressed(c) => Ok(Cow::Owned(c.decompress()?)),
        }
    }

    /// Decompress in place if needed and return the raw block.
    pub(crate) fn raw_mut(&mut self) -> Result<&mut Block> {
        if let Payload::Compressed(c) = &self.payload {
            let block = c.decompress()?;
            self.payload = Payload::Raw(block);
        }
        match &mut self.payload {
            Payload::Raw(block) => Ok(block),
            Payload::Compressed(_) => Err(Error::internal("node still compressed after decompression")),
        }
    }

    /// Run a mutation against the raw block and resync count and size.
    pub(crate) fn update<T>(&mut self, f: impl FnOnce(&mut Block) -> Result<T>) -> Result<T> {
        let result = f(self.raw_mut()?);
        self.sync();
        result
    }

    fn sync(&mut self) {
        if let Payload::Raw(block) = &self.payload {
            self.count = block.len() as u16;
            self.size = block.byte_len();
            self.compress_declined = false;
        }
    }

    /// Decompress in place. Returns true if the node was compressed.
    pub(crate) fn decompress(&mut self) -> Result<bool> {
        let was_compressed = self.is_compressed();
        self.raw_mut()?;
        Ok(was_compressed)
    }

    /// Try to compress in place. Returns true if the node ends up compressed.
    pub(crate) fn compress(&mut self, compression: CompressionType) -> bool {
        let Payload::Raw(block) = &self.payload else {
            return true;
        };
        if self.compress_declined {
            return false;
        }
        match CompressedBlock::compress(block, compression) {
            Some(compressed) => {
                self.payload = Payload::Compressed(compressed);
                true
            }
            None => {
                log::debug!(
                    "Compression declined for node with {} entries ({} bytes)",
                    self.count,
                    self.size
                );
                self.compress_declined = true;
                false
            }
        }
    }

    /// Whether the node holds several entries and breaks `fill`.
    pub(crate) fn exceeds(&self, fill: FillPolicy) -> bool {
        self.count() > 1 && !fill.allows(self.size, self.count())
    }

    pub(crate) fn is_oversized(&self) -> bool {
        self.oversized
    }

    /// Record whether the node breaks `fill`, a policy it was not built under.
    pub(crate) fn mark_oversized(&mut self, fill: FillPolicy) {
        self.oversized = self.exceeds(fill);
    }

    pub(crate) fn clear_oversized(&mut self) {
        self.oversized = false;
    }

    /// Whether one more entry holding `value` keeps the node within `fill`.
    pub(crate) fn allows_insert(&self, fill: FillPolicy, value: &[u8]) -> bool {
        fill.allows(self.size + Block::encoded_len(value), self.count() + 1)
    }

    /// Whether replacing an entry of `old_len` encoded bytes by `value` keeps
    /// the node within `fill`.
    pub(crate) fn allows_replace(&self, fill: FillPolicy, old_len: usize, value: &[u8]) -> bool {
        fill.allows(self.size - old_len + Block::encoded_len(value), self.count())
    }

    /// Whether `self` and `other` fit in one node under `fill`.
    pub(crate) fn allows_merge(&self, other: &Node, fill: FillPolicy) -> bool {
        fill.allows(self.size + other.size - EMPTY_BLOCK_SIZE, self.count() + other.count())
    }

    /// Deep copy without links, keeping the stored form.
    pub(crate) fn try_clone(&self) -> Result<Self> {
        let payload = match &self.payload {
            Payload::Raw(block) => Payload::Raw(block.try_clone()?),
            Payload::Compressed(c) => Payload::Compressed(c.try_clone()?),
        };
        Ok(Self {
            prev: None,
            next: None,
            payload,
            count: self.count,
            size: self.size,
            compress_declined: self.compress_declined,
            oversized: self.oversized,
        })
    }
}
