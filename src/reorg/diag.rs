//! Diagonal extraction and construction

use smallvec::SmallVec;

use crate::block::MatrixBlock;
use crate::characteristics::MatrixCharacteristics;
use crate::collection::MatrixCollection;
use crate::error::{Error, Result};
use crate::index::BlockIndex;

/// Extract the main diagonal of a matrix as a single column
///
/// Only diagonal blocks contribute; each is mapped to its diagonal slice at
/// column-block 1.
pub fn extract(input: &MatrixCollection) -> MatrixCollection {
    input
        .filter(|ix, _| ix.is_diagonal())
        .map(|ix, blk| (BlockIndex::new(ix.row, 1), blk.diagonal()))
}

/// Expand a single-column matrix into a square diagonal matrix
///
/// Every input row-block becomes the (rb, rb) diagonal block, and an
/// explicit empty block is emitted at every other column-block coordinate of
/// that block-row: the output's block-index space must have no gaps.
pub fn construct(
    input: &MatrixCollection,
    mc: &MatrixCharacteristics,
) -> Result<MatrixCollection> {
    if mc.cols() != 1 {
        return Err(Error::dimension(
            "diag",
            format!("diagonal construction requires one column, got {}", mc.cols()),
        ));
    }
    if !mc.blocking_known() {
        return Err(Error::dimension("diag", "block sizes unknown"));
    }
    if let Some((ix, blk)) = input.iter().find(|(_, b)| b.cols() != 1) {
        return Err(Error::dimension(
            "diag",
            format!("input block {ix} has {} columns, expected 1", blk.cols()),
        ));
    }

    let nblocks = mc.num_row_blocks();
    let mc_in = *mc;
    Ok(input.flat_map(move |ix, blk| {
        let rb = ix.row;
        let mut out: SmallVec<[(BlockIndex, MatrixBlock); 4]> = SmallVec::new();
        out.push((BlockIndex::new(rb, rb), blk.expand_to_diagonal()));
        for cb in 1..=nblocks {
            if cb != rb {
                out.push((
                    BlockIndex::new(rb, cb),
                    MatrixBlock::empty(mc_in.block_rows_at(rb), mc_in.block_rows_at(cb)),
                ));
            }
        }
        out
    }))
}
