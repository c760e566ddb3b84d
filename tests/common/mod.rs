//! Shared helpers for building and flattening block collections
#![allow(dead_code)]

use blockmat::prelude::*;

/// Build a blocked single-column matrix from a dense value vector
pub fn column_matrix(
    values: &[f64],
    rows_per_block: usize,
    num_partitions: usize,
) -> (MatrixCollection, MatrixCharacteristics) {
    let blocks = values
        .chunks(rows_per_block)
        .enumerate()
        .map(|(i, chunk)| {
            (
                BlockIndex::new(i as u64 + 1, 1),
                MatrixBlock::column_from_values(chunk.to_vec()),
            )
        })
        .collect();
    let mc = MatrixCharacteristics::new(
        values.len() as u64,
        1,
        rows_per_block as u64,
        rows_per_block as u64,
    );
    (MatrixCollection::from_blocks(blocks, num_partitions), mc)
}

/// Build a blocked matrix from row-major dense data
pub fn dense_matrix(
    rows: usize,
    cols: usize,
    rows_per_block: usize,
    cols_per_block: usize,
    data: &[f64],
    num_partitions: usize,
) -> (MatrixCollection, MatrixCharacteristics) {
    assert_eq!(data.len(), rows * cols);
    let mc = MatrixCharacteristics::new(
        rows as u64,
        cols as u64,
        rows_per_block as u64,
        cols_per_block as u64,
    );
    let mut blocks = Vec::new();
    for rb in 1..=mc.num_row_blocks() {
        for cb in 1..=mc.num_col_blocks() {
            let brows = mc.block_rows_at(rb);
            let bcols = mc.block_cols_at(cb);
            let mut values = Vec::with_capacity(brows * bcols);
            for r in 0..brows {
                for c in 0..bcols {
                    let gr = (rb as usize - 1) * rows_per_block + r;
                    let gc = (cb as usize - 1) * cols_per_block + c;
                    values.push(data[gr * cols + gc]);
                }
            }
            blocks.push((
                BlockIndex::new(rb, cb),
                MatrixBlock::dense(brows, bcols, values).unwrap(),
            ));
        }
    }
    (MatrixCollection::from_blocks(blocks, num_partitions), mc)
}

/// Flatten a blocked matrix back to row-major dense data
pub fn to_dense(m: &MatrixCollection, mc: &MatrixCharacteristics) -> Vec<f64> {
    let rows = mc.rows() as usize;
    let cols = mc.cols() as usize;
    let rpb = mc.rows_per_block() as usize;
    let cpb = mc.cols_per_block() as usize;
    let mut out = vec![0.0; rows * cols];
    for (ix, blk) in m.iter() {
        let r0 = (ix.row as usize - 1) * rpb;
        let c0 = (ix.col as usize - 1) * cpb;
        for e in blk.iter_nonzeros() {
            out[(r0 + e.row as usize) * cols + c0 + e.col as usize] = e.value;
        }
    }
    out
}

/// Flatten a blocked single-column matrix to a value vector
pub fn to_column(m: &MatrixCollection, mc: &MatrixCharacteristics) -> Vec<f64> {
    to_dense(m, mc)
}
