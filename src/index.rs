//! Block coordinates and deterministic partition placement
//!
//! A logical matrix is split into fixed-size blocks; every block is addressed
//! by a 1-based [`BlockIndex`]. Multi-way co-partitioned joins additionally
//! tag records with a source marker, carried by [`TripleIndex`].
//!
//! Partition placement is a deterministic hash of the (row, col) coordinate
//! pair only. The tag of a [`TripleIndex`] never influences placement, so
//! records for the same output block always land in the same partition
//! regardless of which input they came from (the co-location guarantee).

use std::fmt;

/// Additive prime folded into the block-coordinate hash
const ADD_PRIME: i64 = 99991;

/// Modulus bounding the block-coordinate hash before partition reduction
const DIVIDE_PRIME: i64 = 1_405_695_061;

/// Coordinate of a block within a matrix's block grid, 1-based
///
/// Ordering is lexicographic: row-block first, then column-block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockIndex {
    /// 1-based row-block coordinate
    pub row: u64,
    /// 1-based column-block coordinate
    pub col: u64,
}

impl BlockIndex {
    /// Create a block index from 1-based coordinates
    #[inline]
    pub fn new(row: u64, col: u64) -> Self {
        Self { row, col }
    }

    /// The index with row and column swapped
    #[inline]
    pub fn transposed(&self) -> Self {
        Self {
            row: self.col,
            col: self.row,
        }
    }

    /// Whether this block lies on the main block diagonal
    #[inline]
    pub fn is_diagonal(&self) -> bool {
        self.row == self.col
    }
}

impl fmt::Display for BlockIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Block coordinate extended with a tag for multi-way partitioned joins
///
/// Ordering compares row, column, then tag. Partition placement ignores the
/// tag entirely; see [`partition_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripleIndex {
    /// 1-based row-block coordinate
    pub row: u64,
    /// 1-based column-block coordinate
    pub col: u64,
    /// Join tag (e.g. the source row-block of a shuffled fragment)
    pub tag: u64,
}

impl TripleIndex {
    /// Create a triple index
    #[inline]
    pub fn new(row: u64, col: u64, tag: u64) -> Self {
        Self { row, col, tag }
    }

    /// The (row, col) block coordinate, dropping the tag
    #[inline]
    pub fn block(&self) -> BlockIndex {
        BlockIndex::new(self.row, self.col)
    }

    /// Partition placement; identical to the placement of [`Self::block`]
    #[inline]
    pub fn partition(&self, num_partitions: usize) -> usize {
        partition_of(&self.block(), num_partitions)
    }
}

impl fmt::Display for TripleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) k: {}", self.row, self.col, self.tag)
    }
}

/// Deterministic partition of a block coordinate
///
/// Hashes `row * 127 + col + ADD_PRIME`, folds the high half in, bounds the
/// result by a fixed prime modulus, and reduces mod the requested partition
/// count. Depends only on (row, col), giving an approximately even spread.
#[inline]
pub fn partition_of(index: &BlockIndex, num_partitions: usize) -> usize {
    debug_assert!(num_partitions > 0);
    let v = (index.row as i64)
        .wrapping_mul(127)
        .wrapping_add(index.col as i64)
        .wrapping_add(ADD_PRIME);
    let h = v ^ (v >> 32);
    (h.rem_euclid(DIVIDE_PRIME) as usize) % num_partitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_ordering() {
        let a = BlockIndex::new(1, 2);
        let b = BlockIndex::new(1, 3);
        let c = BlockIndex::new(2, 1);
        assert!(a < b);
        assert!(b < c);

        let t1 = TripleIndex::new(1, 2, 0);
        let t2 = TripleIndex::new(1, 2, 5);
        assert!(t1 < t2);
        assert_eq!(t1.block(), t2.block());
    }

    #[test]
    fn test_transposed() {
        let ix = BlockIndex::new(3, 7);
        assert_eq!(ix.transposed(), BlockIndex::new(7, 3));
        assert_eq!(ix.transposed().transposed(), ix);
    }

    #[test]
    fn test_co_location() {
        // The tag must never affect partition placement.
        for n in [1usize, 2, 7, 16] {
            for r in 1..20u64 {
                for c in 1..20u64 {
                    let base = partition_of(&BlockIndex::new(r, c), n);
                    for tag in [0u64, 1, 3, 99] {
                        assert_eq!(TripleIndex::new(r, c, tag).partition(n), base);
                    }
                }
            }
        }
    }

    #[test]
    fn test_partition_in_range_and_spread() {
        let n = 8;
        let mut hits = vec![0usize; n];
        for r in 1..=50u64 {
            for c in 1..=50u64 {
                let p = partition_of(&BlockIndex::new(r, c), n);
                assert!(p < n);
                hits[p] += 1;
            }
        }
        // Rough evenness: no partition should be starved.
        for h in hits {
            assert!(h > 0);
        }
    }
}
