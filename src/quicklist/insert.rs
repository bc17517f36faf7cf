//! Interior insertion, node splitting and merging.

use std::mem;

use super::node::Node;
use super::{Entry, NodeId, QuickList};
use crate::block::EMPTY_BLOCK_SIZE;
use crate::error::{Error, Result};

impl QuickList {
    /// Inserts `value` right before `entry`.
    pub fn insert_before(&mut self, entry: &Entry, value: &[u8]) -> Result<()> {
        self.check_entry(entry)?;
        self.insert_at(entry.node, entry.index, value, false)
    }

    /// Inserts `value` right after `entry`.
    pub fn insert_after(&mut self, entry: &Entry, value: &[u8]) -> Result<()> {
        self.check_entry(entry)?;
        self.insert_at(entry.node, entry.index, value, true)
    }

    fn check_entry(&self, entry: &Entry) -> Result<()> {
        match self.nodes.get(entry.node) {
            Some(node) if entry.index < node.count() => Ok(()),
            _ => Err(Error::invalid_argument(format!(
                "entry {:?}[{}] does not refer to a live entry",
                entry.node, entry.index
            ))),
        }
    }

    /// Inserts `value` next to entry `index` of node `id`.
    pub(crate) fn insert_at(&mut self, id: NodeId, index: usize, value: &[u8], after: bool) -> Result<()> {
        let fill = self.fill;
        let (id, index) = if self.nodes[id].exceeds(fill) {
            self.refit_node(id, index)?
        } else {
            (id, index)
        };
        let node = &self.nodes[id];
        let full = !node.allows_insert(fill, value);
        let at_tail = after && index + 1 == node.count();
        let at_head = !after && index == 0;
        let (prev, next) = (node.prev, node.next);
        let room = |n: Option<NodeId>| n.filter(|&n| self.nodes[n].allows_insert(fill, value));
        let (prev_room, next_room) = (room(prev), room(next));

        if !full {
            self.nodes[id].update(|block| {
                let offset = block
                    .offset_of(index as isize)
                    .ok_or_else(|| Error::internal("entry index beyond node"))?;
                let at = if after { offset + block.entry_len_at(offset) } else { offset };
                block.insert_at(at, value)
            })?;
            self.count += 1;
            return self.refresh_compression(&[id]);
        }

        if let (true, Some(next)) = (at_tail, next_room) {
            self.nodes[next].update(|block| block.push_front(value))?;
            self.count += 1;
            return self.refresh_compression(&[next]);
        }
        if let (true, Some(prev)) = (at_head, prev_room) {
            self.nodes[prev].update(|block| block.push_back(value))?;
            self.count += 1;
            return self.refresh_compression(&[prev]);
        }
        if at_tail || at_head {
            let new_id = self.new_node(value)?;
            if after {
                self.link_after(id, new_id);
            } else {
                self.link_before(id, new_id);
            }
            self.count += 1;
            return self.refresh_compression(&[new_id]);
        }

        // Full and inserting in the middle: split, then insert at the cut.
        let split = self.split_node(id, index, after)?;
        let target = if self.nodes[split].allows_insert(fill, value) {
            self.nodes[split].update(|block| {
                if after {
                    block.push_front(value)
                } else {
                    block.push_back(value)
                }
            })?;
            split
        } else {
            let new_id = self.new_node(value)?;
            if after {
                self.link_after(id, new_id);
            } else {
                self.link_before(id, new_id);
            }
            new_id
        };
        self.count += 1;
        self.refresh_compression(&[id, split, target])?;
        self.merge_around(id)
    }

    /// Splits node `id` around entry `index`.
    ///
    /// With `after`, the new node takes the entries after `index` and is
    /// linked after `id`. Otherwise it takes the entries before `index` and
    /// is linked before `id`.
    fn split_node(&mut self, id: NodeId, index: usize, after: bool) -> Result<NodeId> {
        self.nodes.reserve(1)?;
        let cut = if after { index + 1 } else { index };
        let moved = self.nodes[id].update(|block| {
            let offset = block
                .offset_of(cut as isize)
                .ok_or_else(|| Error::internal("split point beyond node"))?;
            let tail = block.split_off(offset)?;
            Ok(if after { tail } else { mem::replace(block, tail) })
        })?;

        let moved_count = moved.len();
        let new_id = self.nodes.allocate(Node::new(moved))?;
        if after {
            self.link_after(id, new_id);
        } else {
            self.link_before(id, new_id);
        }
        log::debug!(
            "Split node {:?} at entry {}: {} entries moved to node {:?}",
            id,
            cut,
            moved_count,
            new_id
        );
        Ok(new_id)
    }

    /// Re-splits node `id`, built under a looser fill policy, into nodes that
    /// fit the current one. Returns the node and in-node index now holding
    /// entry `index`.
    fn refit_node(&mut self, id: NodeId, index: usize) -> Result<(NodeId, usize)> {
        let pieces = self.split_to_fill(id)?;
        let mut index = index;
        let mut found = None;
        for &piece in &pieces {
            let count = self.nodes[piece].count();
            if index < count {
                found = Some((piece, index));
                break;
            }
            index -= count;
        }
        let (target, index) = found.ok_or_else(|| Error::internal("entry index beyond refit node"))?;
        let others: Vec<NodeId> = pieces.into_iter().filter(|&p| p != target).collect();
        self.refresh_compression(&others)?;
        Ok((target, index))
    }

    /// Cuts node `id` into consecutive nodes that each fit the fill policy,
    /// keeping the first run of entries in `id`. Returns the nodes in list
    /// order.
    fn split_to_fill(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let fill = self.fill;
        let cuts = {
            let block = self.nodes[id].raw_mut()?;
            let mut cuts = Vec::new();
            let (mut size, mut count) = (EMPTY_BLOCK_SIZE, 0);
            let mut cur = block.first_offset();
            while let Some(offset) = cur {
                let len = block.entry_len_at(offset);
                if count > 0 && !fill.allows(size + len, count + 1) {
                    cuts.push(offset);
                    size = EMPTY_BLOCK_SIZE;
                    count = 0;
                }
                size += len;
                count += 1;
                cur = block.next_offset(offset);
            }
            cuts
        };

        self.nodes.reserve(cuts.len())?;
        let mut pieces = Vec::with_capacity(cuts.len() + 1);
        // Cut from the back so earlier offsets stay valid.
        for &cut in cuts.iter().rev() {
            let tail = self.nodes[id].update(|block| block.split_off(cut))?;
            let piece = self.nodes.allocate(Node::new(tail))?;
            self.link_after(id, piece);
            pieces.push(piece);
        }
        pieces.push(id);
        pieces.reverse();
        self.nodes[id].clear_oversized();
        log::debug!("Re-split node {:?} into {} nodes to fit {:?}", id, pieces.len(), fill);
        Ok(pieces)
    }

    /// Merges the neighbourhood of `center` where the merged node fits the
    /// fill policy: first the two nodes before it, then the two after it,
    /// then `center` with its neighbours.
    pub(crate) fn merge_around(&mut self, center: NodeId) -> Result<()> {
        let prev = self.nodes[center].prev;
        let prev_prev = prev.and_then(|p| self.nodes[p].prev);
        if let (Some(a), Some(b)) = (prev_prev, prev) {
            if self.allows_merge(a, b) {
                self.merge_pair(a, b)?;
            }
        }

        let next = self.nodes[center].next;
        let next_next = next.and_then(|n| self.nodes[n].next);
        if let (Some(a), Some(b)) = (next, next_next) {
            if self.allows_merge(a, b) {
                self.merge_pair(a, b)?;
            }
        }

        let mut target = center;
        if let Some(prev) = self.nodes[center].prev {
            if self.allows_merge(prev, center) {
                target = self.merge_pair(prev, center)?;
            }
        }
        if let Some(next) = self.nodes[target].next {
            if self.allows_merge(target, next) {
                self.merge_pair(target, next)?;
            }
        }
        Ok(())
    }

    fn allows_merge(&self, a: NodeId, b: NodeId) -> bool {
        self.nodes[a].allows_merge(&self.nodes[b], self.fill)
    }

    /// Appends the entries of `right` to `left` and frees `right`. Returns
    /// the surviving node.
    fn merge_pair(&mut self, left: NodeId, right: NodeId) -> Result<NodeId> {
        {
            let (l, r) = self
                .nodes
                .pair_mut(left, right)
                .ok_or_else(|| Error::internal("merge of a node with itself"))?;
            let right_block = r.read_block()?;
            l.update(|block| block.append_block(&right_block))?;
            l.clear_oversized();
        }
        if let Some(removed) = self.unlink_node(right) {
            log::debug!(
                "Merged node {:?} ({} entries) into node {:?}",
                right,
                removed.count(),
                left
            );
        }
        self.refresh_compression(&[left])?;
        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use crate::block::Value;
    use crate::config::{FillPolicy, Options, SizeClass};
    use crate::quicklist::{Direction, QuickList};

    fn list_of(values: &[&str], fill: FillPolicy) -> QuickList {
        let mut list = QuickList::new(Options::new().fill(fill)).unwrap();
        for v in values {
            list.push_tail(v.as_bytes()).unwrap();
        }
        list
    }

    fn strings(list: &QuickList) -> Vec<String> {
        list.iter(Direction::Forward).map(|e| e.unwrap().value().to_string()).collect()
    }

    #[test]
    fn test_insert_in_place() {
        let mut list = list_of(&["a", "c"], FillPolicy::Count(8));
        let c = list.index(1).unwrap();
        list.insert_before(&c, b"b").unwrap();
        let c = list.index(2).unwrap();
        list.insert_after(&c, b"d").unwrap();
        assert_eq!(strings(&list), vec!["a", "b", "c", "d"]);
        assert_eq!(list.node_count(), 1);
    }

    #[test]
    fn test_insert_after_tail_of_full_node_uses_next() {
        let mut list = list_of(&["a", "b", "d"], FillPolicy::Count(2));
        let b = list.index(1).unwrap();
        list.insert_after(&b, b"c").unwrap();
        assert_eq!(strings(&list), vec!["a", "b", "c", "d"]);
        assert_eq!(list.node_count(), 2);
        list.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_before_head_of_full_node_uses_prev() {
        let mut list = list_of(&["a", "b", "c", "d"], FillPolicy::Count(2));
        list.pop_head().unwrap();
        // Nodes: [b] [c, d]
        let c = list.index(1).unwrap();
        list.insert_before(&c, b"x").unwrap();
        assert_eq!(strings(&list), vec!["b", "x", "c", "d"]);
        let counts: Vec<usize> = list.nodes().map(|n| n.count).collect();
        assert_eq!(counts, vec![2, 2]);
        list.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_at_full_end_creates_node() {
        let mut list = list_of(&["a", "b"], FillPolicy::Count(2));
        let b = list.index(1).unwrap();
        list.insert_after(&b, b"c").unwrap();
        let a = list.index(0).unwrap();
        list.insert_before(&a, b"0").unwrap();
        assert_eq!(strings(&list), vec!["0", "a", "b", "c"]);
        assert_eq!(list.node_count(), 3);
        list.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_splits_full_node() {
        let mut list = list_of(&["a", "b", "c", "d"], FillPolicy::Count(4));
        let b = list.index(1).unwrap();
        list.insert_after(&b, b"x").unwrap();
        assert_eq!(strings(&list), vec!["a", "b", "x", "c", "d"]);
        assert_eq!(list.node_count(), 2);
        list.check_invariants().unwrap();

        let c = list.index(3).unwrap();
        list.insert_before(&c, b"y").unwrap();
        assert_eq!(strings(&list), vec!["a", "b", "x", "y", "c", "d"]);
        list.check_invariants().unwrap();
    }

    #[test]
    fn test_split_never_exceeds_size_bound() {
        let big = "z".repeat(3000);
        let mut list = list_of(&["s", big.as_str()], FillPolicy::Size(SizeClass::Kb4));
        assert_eq!(list.node_count(), 1);

        let medium = "m".repeat(1500);
        let s = list.index(0).unwrap();
        list.insert_after(&s, medium.as_bytes()).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.index(1).unwrap().value(), &Value::Bytes(medium.into_bytes()));
        list.check_invariants().unwrap();
    }

    #[test]
    fn test_stale_entry_rejected() {
        let mut list = list_of(&["a", "b"], FillPolicy::Count(1));
        let b = list.index(1).unwrap();
        list.pop_tail().unwrap();
        assert!(list.insert_after(&b, b"c").is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_many_middle_inserts_keep_invariants() {
        let mut list = list_of(&["first", "last"], FillPolicy::Count(3));
        for i in 0..60 {
            let anchor = list.index((list.len() / 2) as i64).unwrap();
            let value = format!("m{}", i);
            if i % 2 == 0 {
                list.insert_before(&anchor, value.as_bytes()).unwrap();
            } else {
                list.insert_after(&anchor, value.as_bytes()).unwrap();
            }
            list.check_invariants().unwrap();
        }
        assert_eq!(list.len(), 62);
        assert!(list.index(0).unwrap().matches(b"first"));
        assert!(list.index(-1).unwrap().matches(b"last"));
    }
}
