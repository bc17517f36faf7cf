//! Iteration over list entries.
//!
//! [`Iter`] only reads: compressed nodes are decoded into a scratch copy and
//! the list is left untouched. [`Cursor`] holds the list mutably, decodes
//! nodes in place, can delete the entry it just returned and recompresses
//! each node it leaves, including when it is dropped early.

use std::borrow::Cow;

use super::{Direction, Entry, NodeId, QuickList};
use crate::block::Block;
use crate::error::{Error, Result};

/// Read-only iterator over the entries of a [`QuickList`].
pub struct Iter<'a> {
    list: &'a QuickList,
    direction: Direction,
    current: Option<(NodeId, Cow<'a, Block>)>,
    next_node: Option<NodeId>,
    /// Offset and in-node index of the next entry to yield
    offset: Option<usize>,
    index: usize,
    /// In-node index to start from when the first node is entered
    seek: Option<usize>,
}

impl<'a> Iter<'a> {
    fn new(list: &'a QuickList, direction: Direction, start: Option<(NodeId, usize)>) -> Self {
        let (next_node, seek) = match start {
            Some((id, index)) => (Some(id), Some(index)),
            None => (
                match direction {
                    Direction::Forward => list.head,
                    Direction::Backward => list.tail,
                },
                None,
            ),
        };
        Self { list, direction, current: None, next_node, offset: None, index: 0, seek }
    }
}

impl Iterator for Iter<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((id, block)) = &self.current {
                if let Some(offset) = self.offset {
                    let entry = Entry { node: *id, index: self.index, offset, value: block.get(offset) };
                    match self.direction {
                        Direction::Forward => {
                            self.offset = block.next_offset(offset);
                            self.index += 1;
                        }
                        Direction::Backward => {
                            self.offset = block.prev_offset(offset);
                            self.index = self.index.saturating_sub(1);
                        }
                    }
                    return Some(Ok(entry));
                }
                let node = &self.list.nodes[*id];
                self.next_node = match self.direction {
                    Direction::Forward => node.next,
                    Direction::Backward => node.prev,
                };
                self.current = None;
            }

            let id = self.next_node.take()?;
            let list = self.list;
            let block = match list.nodes[id].read_block() {
                Ok(block) => block,
                Err(e) => return Some(Err(e)),
            };
            let index = self.seek.take().unwrap_or(match self.direction {
                Direction::Forward => 0,
                Direction::Backward => block.len().saturating_sub(1),
            });
            self.offset = block.offset_of(index as isize);
            self.index = index;
            self.current = Some((id, block));
        }
    }
}

impl std::iter::FusedIterator for Iter<'_> {}

/// Mutable cursor over the entries of a [`QuickList`].
///
/// The node under the cursor is kept decompressed while the cursor is on
/// it. Moving to the next node, or dropping the cursor, puts the node back
/// under the list's compression policy.
pub struct Cursor<'a> {
    list: &'a mut QuickList,
    direction: Direction,
    current: Option<NodeId>,
    next_node: Option<NodeId>,
    offset: Option<usize>,
    index: usize,
    seek: Option<usize>,
    /// Offset and in-node index of the entry last returned by `advance`
    last: Option<(usize, usize)>,
}

impl<'a> Cursor<'a> {
    fn new(list: &'a mut QuickList, direction: Direction, start: Option<(NodeId, usize)>) -> Self {
        let (next_node, seek) = match start {
            Some((id, index)) => (Some(id), Some(index)),
            None => (
                match direction {
                    Direction::Forward => list.head,
                    Direction::Backward => list.tail,
                },
                None,
            ),
        };
        Self {
            list,
            direction,
            current: None,
            next_node,
            offset: None,
            index: 0,
            seek,
            last: None,
        }
    }

    /// Returns the next entry, or `None` once the cursor has passed the end.
    pub fn advance(&mut self) -> Result<Option<Entry>> {
        loop {
            if let Some(id) = self.current {
                if let Some(offset) = self.offset {
                    let block = self.list.nodes[id].raw_mut()?;
                    let entry = Entry { node: id, index: self.index, offset, value: block.get(offset) };
                    self.last = Some((offset, self.index));
                    match self.direction {
                        Direction::Forward => {
                            self.offset = block.next_offset(offset);
                            self.index += 1;
                        }
                        Direction::Backward => {
                            self.offset = block.prev_offset(offset);
                            self.index = self.index.saturating_sub(1);
                        }
                    }
                    return Ok(Some(entry));
                }
                self.leave_node()?;
            }

            let Some(id) = self.next_node.take() else {
                return Ok(None);
            };
            let block = self.list.nodes[id].raw_mut()?;
            let index = self.seek.take().unwrap_or(match self.direction {
                Direction::Forward => 0,
                Direction::Backward => block.len().saturating_sub(1),
            });
            self.offset = block.offset_of(index as isize);
            self.index = index;
            self.current = Some(id);
            self.last = None;
        }
    }

    /// Deletes the entry most recently returned by [`advance`](Self::advance).
    /// The next call to `advance` continues with the entry that followed it.
    pub fn delete_current(&mut self) -> Result<()> {
        let (Some(id), Some((offset, index))) = (self.current, self.last.take()) else {
            return Err(Error::invalid_argument("cursor has no current entry to delete"));
        };

        let next_offset = self.list.nodes[id].update(|block| Ok(block.remove_at(offset)))?;
        self.list.count -= 1;

        let node = &self.list.nodes[id];
        if node.count() == 0 {
            self.next_node = match self.direction {
                Direction::Forward => node.next,
                Direction::Backward => node.prev,
            };
            self.current = None;
            self.offset = None;
            self.list.unlink_node(id);
            return self.list.refresh_compression(&[]);
        }

        // Going backward, the entries still ahead sit before the removed one
        // and keep their offsets.
        if self.direction == Direction::Forward {
            self.offset = next_offset;
            self.index = index;
        }
        Ok(())
    }

    fn leave_node(&mut self) -> Result<()> {
        if let Some(id) = self.current.take() {
            let node = &self.list.nodes[id];
            self.next_node = match self.direction {
                Direction::Forward => node.next,
                Direction::Backward => node.prev,
            };
            self.last = None;
            self.list.refresh_compression(&[id])?;
        }
        Ok(())
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.current.take() {
            if let Err(e) = self.list.refresh_compression(&[id]) {
                log::warn!("Failed to recompress node {:?} when dropping cursor: {}", id, e);
            }
        }
    }
}

impl QuickList {
    /// Iterates from the head (`Forward`) or the tail (`Backward`).
    pub fn iter(&self, direction: Direction) -> Iter<'_> {
        Iter::new(self, direction, None)
    }

    /// Iterates starting at the entry at `index`.
    pub fn iter_at(&self, direction: Direction, index: i64) -> Result<Iter<'_>> {
        let start = self.locate(index).ok_or_else(|| Error::out_of_range(index, self.count))?;
        Ok(Iter::new(self, direction, Some(start)))
    }

    /// Mutable cursor from the head (`Forward`) or the tail (`Backward`).
    pub fn cursor(&mut self, direction: Direction) -> Cursor<'_> {
        Cursor::new(self, direction, None)
    }

    /// Mutable cursor starting at the entry at `index`.
    pub fn cursor_at(&mut self, direction: Direction, index: i64) -> Result<Cursor<'_>> {
        let start = self.locate(index).ok_or_else(|| Error::out_of_range(index, self.count))?;
        Ok(Cursor::new(self, direction, Some(start)))
    }
}

impl<'a> IntoIterator for &'a QuickList {
    type Item = Result<Entry>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter(Direction::Forward)
    }
}
