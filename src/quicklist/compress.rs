//! End-biased compression.
//!
//! The `compress_depth` nodes nearest each end are hot and kept raw. Every
//! other node is cold and compressed when the compressor accepts it.

use super::{NodeId, QuickList};
use crate::error::Result;

impl QuickList {
    /// Restores the hot/cold split after a mutation.
    ///
    /// Every node in the hot ranges is decompressed, the first cold node at
    /// each boundary is compressed, and so is each node in `touched` that
    /// is cold.
    pub(crate) fn refresh_compression(&mut self, touched: &[NodeId]) -> Result<()> {
        let depth = self.compress_depth as usize;
        if depth == 0 {
            return Ok(());
        }
        let (Some(mut fwd), Some(mut rev)) = (self.head, self.tail) else {
            return Ok(());
        };

        for _ in 0..depth {
            self.nodes[fwd].decompress()?;
            self.nodes[rev].decompress()?;

            // The hot ranges met: nothing is cold.
            if fwd == rev || self.nodes[fwd].next == Some(rev) {
                return Ok(());
            }
            match (self.nodes[fwd].next, self.nodes[rev].prev) {
                (Some(next), Some(prev)) => {
                    fwd = next;
                    rev = prev;
                }
                _ => return Ok(()),
            }
        }

        for &id in touched {
            if id != fwd && id != rev && self.nodes.get(id).is_some() && !self.is_hot(id) {
                self.nodes[id].compress(self.compression);
            }
        }
        self.nodes[fwd].compress(self.compression);
        if rev != fwd {
            self.nodes[rev].compress(self.compression);
        }
        Ok(())
    }

    /// Returns true if `id` is within `compress_depth` nodes of either end.
    pub(crate) fn is_hot(&self, id: NodeId) -> bool {
        let mut fwd = self.head;
        let mut rev = self.tail;
        for _ in 0..self.compress_depth {
            if fwd == Some(id) || rev == Some(id) {
                return true;
            }
            fwd = fwd.and_then(|f| self.nodes[f].next);
            rev = rev.and_then(|r| self.nodes[r].prev);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CompressionType, FillPolicy, Options};
    use crate::quicklist::{Direction, QuickList};

    fn padded(i: usize) -> Vec<u8> {
        format!("{:0>40}", i % 7).into_bytes()
    }

    fn list_with_depth(depth: u16, compression: CompressionType) -> QuickList {
        QuickList::new(
            Options::new()
                .fill(FillPolicy::Count(16))
                .compress_depth(depth)
                .compression(compression),
        )
        .unwrap()
    }

    #[test]
    fn test_depth_zero_never_compresses() {
        let mut list = list_with_depth(0, CompressionType::default());
        for i in 0..200 {
            list.push_tail(&padded(i)).unwrap();
        }
        assert!(list.nodes().all(|n| !n.compressed));
    }

    #[test]
    fn test_none_compressor_declines() {
        let mut list = list_with_depth(1, CompressionType::None);
        for i in 0..200 {
            list.push_tail(&padded(i)).unwrap();
        }
        let infos: Vec<_> = list.nodes().collect();
        assert!(infos.iter().all(|n| !n.compressed));
        assert!(infos[1..infos.len() - 1].iter().any(|n| n.compress_declined));
        list.check_invariants().unwrap();
    }

    #[cfg(feature = "snappy")]
    #[test]
    fn test_interior_nodes_compressed() {
        let mut list = list_with_depth(2, CompressionType::Snappy);
        for i in 0..160 {
            list.push_tail(&padded(i)).unwrap();
        }
        let infos: Vec<_> = list.nodes().collect();
        assert_eq!(infos.len(), 10);
        assert!(!infos[0].compressed && !infos[1].compressed);
        assert!(!infos[8].compressed && !infos[9].compressed);
        assert!(infos[2..8].iter().all(|n| n.compressed));
        list.check_invariants().unwrap();
    }

    #[cfg(feature = "snappy")]
    #[test]
    fn test_shrinking_list_decompresses_new_ends() {
        let mut list = list_with_depth(1, CompressionType::Snappy);
        for i in 0..80 {
            list.push_tail(&padded(i)).unwrap();
        }
        while list.node_count() > 2 {
            list.pop_tail().unwrap();
            list.check_invariants().unwrap();
        }
        assert!(list.nodes().all(|n| !n.compressed));
    }

    #[cfg(feature = "snappy")]
    #[test]
    fn test_reads_do_not_change_storage() {
        let mut list = list_with_depth(1, CompressionType::Snappy);
        for i in 0..80 {
            list.push_tail(&padded(i)).unwrap();
        }
        let before: Vec<_> = list.nodes().collect();
        assert_eq!(list.iter(Direction::Forward).count(), 80);
        list.index(40).unwrap();
        let after: Vec<_> = list.nodes().collect();
        assert_eq!(before, after);
    }
}
