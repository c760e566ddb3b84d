//! Integration tests for the distributed column sort / rank engine
//!
//! Tests verify correctness across:
//! - Index, value and data execution modes
//! - Ascending/descending order with duplicate keys
//! - Sparse columns where implicit zeros are never materialized
//! - The statistics barrier and its failure modes

mod common;

use blockmat::prelude::*;
use blockmat::reorg::{self, ReorgOp};
use blockmat::sort::{self, SortStats};
use common::{column_matrix, dense_matrix, to_column, to_dense};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn sparse_column(
    rows: usize,
    rows_per_block: usize,
    entries: &[(usize, f64)],
    num_partitions: usize,
) -> (MatrixCollection, MatrixCharacteristics) {
    let mc = MatrixCharacteristics::new(rows as u64, 1, rows_per_block as u64, rows_per_block as u64);
    let mut blocks = Vec::new();
    for rb in 1..=mc.num_row_blocks() {
        let base = (rb as usize - 1) * rows_per_block;
        let brows = mc.block_rows_at(rb);
        let local: Vec<Entry> = entries
            .iter()
            .filter(|(r, _)| *r >= base && *r < base + brows)
            .map(|(r, v)| Entry::new((r - base) as u32, 0, *v))
            .collect();
        blocks.push((
            BlockIndex::new(rb, 1),
            MatrixBlock::sparse(brows, 1, local).unwrap(),
        ));
    }
    (MatrixCollection::from_blocks(blocks, num_partitions), mc)
}

/// Reference ranks: 1-based rank of each row under a sequential stable sort
fn reference_ranks(values: &[f64], descending: bool) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let cmp = values[a].total_cmp(&values[b]);
        if descending { cmp.reverse() } else { cmp }
    });
    let mut ranks = vec![0.0; values.len()];
    for (pos, row) in order.iter().enumerate() {
        ranks[*row] = (pos + 1) as f64;
    }
    ranks
}

// ============================================================================
// Index Mode Tests
// ============================================================================

#[test]
fn test_index_mode_stable_with_duplicates() {
    let (m, mc) = column_matrix(&[5.0, 3.0, 3.0, 1.0], 2, 2);

    let asc = sort::sort_indexes(&m, &mc, false).unwrap();
    assert_eq!(to_column(&asc, &mc), vec![4.0, 2.0, 3.0, 1.0]);

    // Descending reverses values only; the duplicate 3.0s keep row order.
    let desc = sort::sort_indexes(&m, &mc, true).unwrap();
    assert_eq!(to_column(&desc, &mc), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_index_mode_signed_sparse_both_directions() {
    let entries = [(0, -5.0), (2, 3.0), (5, -1.0), (7, 10.0)];
    let (m, mc) = sparse_column(8, 4, &entries, 3);

    let asc = sort::sort_indexes(&m, &mc, false).unwrap();
    assert_eq!(
        to_column(&asc, &mc),
        vec![1.0, 3.0, 7.0, 4.0, 5.0, 2.0, 6.0, 8.0]
    );

    // Zero rows rank by ascending original row in both directions.
    let desc = sort::sort_indexes(&m, &mc, true).unwrap();
    assert_eq!(
        to_column(&desc, &mc),
        vec![8.0, 3.0, 2.0, 4.0, 5.0, 7.0, 6.0, 1.0]
    );
}

#[test]
fn test_index_mode_sparse_1000_rows() {
    // 10 nonzero values in a 1000-row column: every zero row ranks by its
    // original position, the nonzeros take ranks 991..=1000 in value order.
    let entries: Vec<(usize, f64)> = (0..10).map(|i| (i * 97 + 13, (i + 1) as f64)).collect();
    let (m, mc) = sparse_column(1000, 250, &entries, 4);

    let ranks = to_column(&sort::sort_indexes(&m, &mc, false).unwrap(), &mc);
    assert_eq!(ranks.len(), 1000);

    let mut expected_rank = 991.0;
    for (row, _) in &entries {
        assert_eq!(ranks[*row], expected_rank, "nonzero at row {row}");
        expected_rank += 1.0;
    }

    // Zero rows in ascending row order occupy ranks 1..=990.
    let nonzero_rows: Vec<usize> = entries.iter().map(|(r, _)| *r).collect();
    let mut zeros_seen = 0.0;
    for (row, rank) in ranks.iter().enumerate() {
        if !nonzero_rows.contains(&row) {
            zeros_seen += 1.0;
            assert_eq!(*rank, zeros_seen, "zero at row {row}");
        }
    }
}

#[test]
fn test_index_mode_all_zero_column() {
    let (m, mc) = sparse_column(9, 4, &[], 3);
    let ranks = to_column(&sort::sort_indexes(&m, &mc, false).unwrap(), &mc);
    assert_eq!(ranks, (1..=9).map(f64::from).collect::<Vec<_>>());
}

#[test]
fn test_index_mode_matches_sequential_sort() {
    let mut rng = StdRng::seed_from_u64(7);
    let values: Vec<f64> = (0..200)
        .map(|_| {
            if rng.gen_bool(0.4) {
                0.0
            } else {
                // Small integer keys force plenty of duplicates.
                f64::from(rng.gen_range(-20..=20i32))
            }
        })
        .collect();
    let entries: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v != 0.0)
        .map(|(r, v)| (r, *v))
        .collect();
    let (m, mc) = sparse_column(values.len(), 16, &entries, 5);

    for descending in [false, true] {
        let got = to_column(&sort::sort_indexes(&m, &mc, descending).unwrap(), &mc);
        assert_eq!(got, reference_ranks(&values, descending));
    }
}

// ============================================================================
// Value Mode Tests
// ============================================================================

#[test]
fn test_value_mode_reorders_in_place() {
    let entries = [(1, 4.0), (4, -2.0), (6, 1.0)];
    let (m, mc) = sparse_column(8, 3, &entries, 2);

    let out = sort::sort_values(&m, &mc, false).unwrap();
    // Output block grid has no gaps even where the zero run fills a block.
    assert_eq!(out.len(), 3);
    assert_eq!(
        to_column(&out, &mc),
        vec![-2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 4.0]
    );
}

#[test]
fn test_value_mode_sparse_1000_rows() {
    let entries: Vec<(usize, f64)> = (0..10).map(|i| (i * 83 + 5, (10 - i) as f64)).collect();
    let (m, mc) = sparse_column(1000, 100, &entries, 4);

    let out = sort::sort_values(&m, &mc, false).unwrap();
    assert_eq!(out.len(), 10);
    let sorted = to_column(&out, &mc);
    assert!(sorted[..990].iter().all(|v| *v == 0.0));
    assert_eq!(&sorted[990..], (1..=10).map(f64::from).collect::<Vec<_>>());

    // Only the final block holds explicit entries.
    for (ix, blk) in out.iter() {
        let expected = if ix.row == 10 { 10 } else { 0 };
        assert_eq!(blk.nnz(), expected, "block {ix}");
    }
}

// ============================================================================
// Data Mode Tests
// ============================================================================

#[test]
fn test_data_mode_reorders_whole_rows() {
    // Column 2 is the key; columns 1 and 3 must travel with their rows.
    #[rustfmt::skip]
    let data = vec![
        1.0, 5.0, 10.0,
        2.0, 3.0, 20.0,
        3.0, 3.0, 30.0,
        4.0, 1.0, 40.0,
        5.0, 8.0, 50.0,
    ];
    let (m, mc) = dense_matrix(5, 3, 2, 2, &data, 3);

    let op = ReorgOp::Sort {
        col: 2,
        descending: false,
        index_return: false,
    };
    let out = reorg::apply(&op, &m, &mc).unwrap();
    let mc_out = reorg::output_characteristics(&op, &mc).unwrap();

    #[rustfmt::skip]
    let expected = vec![
        4.0, 1.0, 40.0,
        2.0, 3.0, 20.0,
        3.0, 3.0, 30.0,
        1.0, 5.0, 10.0,
        5.0, 8.0, 50.0,
    ];
    assert_eq!(to_dense(&out, &mc_out), expected);
}

#[test]
fn test_data_mode_descending_single_column() {
    // Descending never takes the value-mode shortcut.
    let (m, mc) = column_matrix(&[2.0, 9.0, 4.0, 7.0, 1.0], 2, 2);
    let op = ReorgOp::Sort {
        col: 1,
        descending: true,
        index_return: false,
    };
    let out = reorg::apply(&op, &m, &mc).unwrap();
    assert_eq!(to_column(&out, &mc), vec![9.0, 7.0, 4.0, 2.0, 1.0]);
}

// ============================================================================
// Statistics Barrier Tests
// ============================================================================

#[test]
fn test_stats_single_and_many_partitions() {
    let one = SortStats::from_parts(vec![6], 0, 0, 6).unwrap();
    assert_eq!(one.offsets(), vec![0]);

    let many = SortStats::from_parts(vec![2, 0, 3], 1, 5, 10).unwrap();
    // The zero run expands inside partition 1's slot.
    assert_eq!(many.offsets(), vec![0, 2, 7]);
}

#[test]
fn test_stats_all_zero_and_all_nonzero() {
    let all_zero = SortStats::from_parts(vec![0, 0], 1, 8, 8).unwrap();
    assert_eq!(all_zero.offsets(), vec![0, 0]);
    assert_eq!(all_zero.zero_count(), 8);

    let all_nonzero = SortStats::from_parts(vec![3, 5], 1, 0, 8).unwrap();
    assert_eq!(all_nonzero.offsets(), vec![0, 3]);
    assert_eq!(all_nonzero.zero_count(), 0);
}

#[test]
fn test_stats_incomplete_counts_rejected() {
    assert!(matches!(
        SortStats::from_parts(vec![2, 2], 0, 1, 4),
        Err(Error::DataIntegrity(_))
    ));
    assert!(matches!(
        SortStats::from_parts(vec![2], 3, 0, 2),
        Err(Error::InvalidArgument { .. })
    ));
}

#[test]
fn test_offset_barrier_places_zero_run() {
    // Range-partitioned explicit entries of a 6-row column: one negative in
    // partition 0, two positives in partition 1, three implicit zeros.
    let sorted = PairCollection::from_pairs(
        vec![(5u64, -2.0), (1, 3.0), (2, 7.0)],
        2,
        |row: &u64| usize::from(*row < 5),
    );
    let off = sort::compute_offsets(&sorted, 6, false).unwrap();

    assert_eq!(off.offsets, vec![0, 1]);
    assert_eq!(off.stats.zero_partition(), 1);
    assert_eq!(off.stats.zero_count(), 3);
    assert_eq!(off.zero_run_start, 1);
}

#[test]
fn test_declared_shape_mismatch_rejected() {
    let (m, _) = sparse_column(8, 4, &[(0, 1.0), (3, 2.0)], 2);
    let wrong = MatrixCharacteristics::new(1, 1, 4, 4);
    assert!(matches!(
        sort::sort_indexes(&m, &wrong, false),
        Err(Error::DataIntegrity(_))
    ));
}

#[test]
fn test_block_coverage_gap_rejected() {
    // Declared 8 rows over 2 blocks, but only block 1 is present.
    let blocks = vec![(
        BlockIndex::new(1, 1),
        MatrixBlock::column_from_values(vec![1.0, 2.0, 3.0, 4.0]),
    )];
    let m = MatrixCollection::from_blocks(blocks, 2);
    let mc = MatrixCharacteristics::new(8, 1, 4, 4);
    assert!(matches!(
        sort::sort_values(&m, &mc, false),
        Err(Error::DataIntegrity(_))
    ));
}
