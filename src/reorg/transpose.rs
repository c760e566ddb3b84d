//! Distributed transpose

use crate::collection::MatrixCollection;

/// Transpose a block collection: every (r, c) block moves to (c, r) with its
/// tile locally transposed
pub fn transpose(input: &MatrixCollection) -> MatrixCollection {
    input.map(|ix, blk| (ix.transposed(), blk.transpose()))
}
