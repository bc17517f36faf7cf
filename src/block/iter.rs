use super::{Block, Value};

/// Iterator over the entries of a [`Block`], yielding `(offset, value)`.
///
/// Walks from both ends; `rev()` yields the last entry first.
pub struct BlockIter<'a> {
    block: &'a Block,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a> BlockIter<'a> {
    pub(super) fn new(block: &'a Block) -> Self {
        Self {
            block,
            front: block.first_offset(),
            back: block.last_offset(),
            remaining: block.len(),
        }
    }
}

impl Iterator for BlockIter<'_> {
    type Item = (usize, Value);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self.front?;
        self.remaining -= 1;
        self.front = self.block.next_offset(offset);
        Some((offset, self.block.get(offset)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for BlockIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self.back?;
        self.remaining -= 1;
        self.back = self.block.prev_offset(offset);
        Some((offset, self.block.get(offset)))
    }
}

impl ExactSizeIterator for BlockIter<'_> {}
