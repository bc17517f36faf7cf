//! Structural validation, mostly for tests.

use super::QuickList;
use crate::error::{Error, Result};

impl QuickList {
    /// Walks the whole list and checks its structural invariants.
    ///
    /// - the head has no predecessor and the tail no successor
    /// - every `prev` link mirrors the matching `next` link
    /// - the chain is acyclic and reaches every allocated node
    /// - recorded counts and sizes match the decoded blocks, no node is empty
    /// - nodes holding more than one entry respect the fill policy, except
    ///   nodes left over from before a stricter `set_fill` that no insertion
    ///   has re-split yet
    /// - nodes within `compress_depth` of either end are raw
    ///
    /// The compression check uses the current depth, so after
    /// `set_compress_depth` it only holds once a mutation has followed.
    pub fn check_invariants(&self) -> Result<()> {
        let (head, tail) = match (self.head, self.tail) {
            (None, None) => {
                if self.count != 0 || self.nodes.len() != 0 {
                    return Err(Error::internal(format!(
                        "empty chain but {} entries in {} nodes",
                        self.count,
                        self.nodes.len()
                    )));
                }
                return Ok(());
            }
            (Some(head), Some(tail)) => (head, tail),
            _ => return Err(Error::internal("only one of head and tail is set")),
        };
        if self.nodes.get(head).and_then(|n| n.prev).is_some() {
            return Err(Error::internal("head has a predecessor"));
        }
        if self.nodes.get(tail).and_then(|n| n.next).is_some() {
            return Err(Error::internal("tail has a successor"));
        }

        let node_count = self.nodes.len();
        let depth = self.compress_depth as usize;
        let mut position = 0;
        let mut total = 0;
        let mut prev = None;
        let mut cur = Some(head);
        while let Some(id) = cur {
            if position >= node_count {
                return Err(Error::internal("chain is longer than the arena, cycle suspected"));
            }
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| Error::internal(format!("link to freed node {:?}", id)))?;
            if node.prev != prev {
                return Err(Error::internal(format!("node {:?} has a broken prev link", id)));
            }

            let block = node.read_block()?;
            if block.len() != node.count() || block.byte_len() != node.size() {
                return Err(Error::internal(format!(
                    "node {:?} records {} entries / {} bytes, block has {} / {}",
                    id,
                    node.count(),
                    node.size(),
                    block.len(),
                    block.byte_len()
                )));
            }
            if node.count() == 0 {
                return Err(Error::internal(format!("node {:?} is empty", id)));
            }
            if node.exceeds(self.fill) && !node.is_oversized() {
                return Err(Error::internal(format!(
                    "node {:?} with {} entries / {} bytes exceeds the fill policy",
                    id,
                    node.count(),
                    node.size()
                )));
            }
            let hot = position < depth || position + depth >= node_count;
            if depth > 0 && hot && node.is_compressed() {
                return Err(Error::internal(format!("hot node {:?} is compressed", id)));
            }

            total += node.count();
            position += 1;
            prev = Some(id);
            cur = node.next;
        }

        if prev != Some(tail) {
            return Err(Error::internal("chain does not end at the tail"));
        }
        if position != node_count {
            return Err(Error::internal(format!(
                "chain has {} nodes, arena holds {}",
                position, node_count
            )));
        }
        if total != self.count {
            return Err(Error::internal(format!(
                "nodes hold {} entries, list records {}",
                total, self.count
            )));
        }
        Ok(())
    }
}
