//! Order-by-column dispatch
//!
//! Extracts the target column as a standalone single-column collection, then
//! routes to one of three execution modes: index (return each row's rank),
//! value (single ascending column reordered in place) or data (reorder the
//! full matrix by the sort permutation).

use crate::characteristics::MatrixCharacteristics;
use crate::collection::MatrixCollection;
use crate::error::{Error, Result};
use crate::index::BlockIndex;

/// Sort a matrix by one of its columns
///
/// `col` is 1-based. With `index_return` the result is a rank column instead
/// of reordered data. A single-column ascending sort without index return
/// skips the permutation shuffle entirely and reorders values directly.
pub fn sort(
    input: &MatrixCollection,
    mc: &MatrixCharacteristics,
    col: u64,
    descending: bool,
    index_return: bool,
) -> Result<MatrixCollection> {
    if !mc.dims_known() || !mc.blocking_known() {
        return Err(Error::dimension("sort", "input geometry unknown"));
    }
    if col < 1 || col as i64 > mc.cols() {
        return Err(Error::invalid_argument(
            "col",
            format!("column {col} out of range for {} columns", mc.cols()),
        ));
    }

    let single = mc.cols() == 1;
    let column = if single {
        input.clone()
    } else {
        extract_column(input, mc, col)
    };

    if index_return {
        crate::sort::sort_indexes(&column, mc, descending)
    } else if single && !descending {
        crate::sort::sort_values(&column, mc, descending)
    } else {
        crate::sort::sort_data(&column, input, mc, descending)
    }
}

/// Slice out one column of a blocked matrix as a single-column collection
fn extract_column(
    input: &MatrixCollection,
    mc: &MatrixCharacteristics,
    col: u64,
) -> MatrixCollection {
    let cb = mc.col_block_of(col);
    let local = mc.col_offset_in_block(col);
    input
        .filter(move |ix, _| ix.col == cb)
        .map(move |ix, blk| (BlockIndex::new(ix.row, 1), blk.column(local)))
}
