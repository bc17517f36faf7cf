//! Range deletion and in-place replacement.

use super::QuickList;
use crate::error::{Error, Result};

impl QuickList {
    /// Removes up to `count` entries starting at `start`. Negative starts
    /// count from the tail. Returns the number of entries removed, which is
    /// smaller than `count` when the range runs past the end of the list.
    ///
    /// Nodes entirely inside the range are dropped without being
    /// decompressed.
    pub fn delete_range(&mut self, start: i64, count: usize) -> Result<usize> {
        if count == 0 {
            return Ok(0);
        }
        let Some((first, mut index)) = self.locate(start) else {
            return Ok(0);
        };
        let available = if start >= 0 {
            self.count - start as usize
        } else {
            start.unsigned_abs() as usize
        };
        let extent = count.min(available);

        let mut remaining = extent;
        let mut touched = Vec::with_capacity(2);
        let mut cur = Some(first);
        while remaining > 0 {
            let Some(id) = cur else {
                break;
            };
            let node = &self.nodes[id];
            let (node_count, next) = (node.count(), node.next);

            if index == 0 && remaining >= node_count {
                self.unlink_node(id);
                self.count -= node_count;
                remaining -= node_count;
            } else {
                let removed = self.nodes[id].update(|block| {
                    let offset = block
                        .offset_of(index as isize)
                        .ok_or_else(|| Error::internal("delete start beyond node"))?;
                    Ok(block.remove_range(offset, remaining))
                })?;
                self.count -= removed;
                remaining -= removed;
                touched.push(id);
            }
            index = 0;
            cur = next;
        }

        self.refresh_compression(&touched)?;
        Ok(extent - remaining)
    }

    /// Replaces the entry at `index` with `value`.
    ///
    /// The entry is rewritten in place when the node still fits its fill
    /// bound afterwards; otherwise the value is inserted after it and the old
    /// entry deleted, which may split the node.
    pub fn replace_at_index(&mut self, index: i64, value: &[u8]) -> Result<()> {
        let (id, idx) = self.locate(index).ok_or_else(|| Error::out_of_range(index, self.count))?;
        let fill = self.fill;

        let node = &mut self.nodes[id];
        let block = node.raw_mut()?;
        let offset = block
            .offset_of(idx as isize)
            .ok_or_else(|| Error::internal("entry index beyond node"))?;
        let old_len = block.entry_len_at(offset);

        if node.count() == 1 || node.allows_replace(fill, old_len, value) {
            node.update(|block| block.replace_at(offset, value))?;
            return self.refresh_compression(&[id]);
        }

        let pos = if index < 0 { self.count - index.unsigned_abs() as usize } else { index as usize };
        self.insert_at(id, idx, value, true)?;
        self.delete_range(pos as i64, 1)?;
        Ok(())
    }
}
