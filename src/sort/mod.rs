//! Distributed column sort / rank engine
//!
//! Given a single-column matrix spread over row-blocks, possibly sparse,
//! this engine computes one of:
//!
//! - **index mode** ([`sort_indexes`]): each original row's 1-based global
//!   rank under the requested order, as a dense rank column in the input's
//!   block geometry;
//! - **value mode** ([`sort_values`]): the values themselves in sorted
//!   order, re-blocked into the output geometry;
//! - **data mode** ([`sort_data`]): a full row reorder of a wider matrix by
//!   the permutation that sorts the column.
//!
//! The algorithm never materializes implicit zero rows to order them: each
//! value-range partition locally sorts its explicit entries; a single
//! statistics barrier ([`compute_offsets`]) collects per-partition counts,
//! designates the one partition owning the implicit-zero run (derived
//! arithmetically as `rows - explicit`), and broadcasts exclusive prefix
//! offsets; each partition then assigns final global positions in one local
//! pass. No pass performs a full distributed comparison sort.
//!
//! Ties break by original row order in both directions (descending reverses
//! only the value comparison), so the result is equivalent to a sequential
//! stable sort of the whole column. The zero run sits exactly where the
//! value 0.0 would sort among the explicit values; zeros rank among
//! themselves by ascending original row.

pub mod stats;

pub use stats::SortStats;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::block::{Entry, MatrixBlock};
use crate::characteristics::MatrixCharacteristics;
use crate::collection::{MatrixCollection, PairCollection};
use crate::error::{Error, Result};
use crate::index::{partition_of, BlockIndex, TripleIndex};

/// Upper bound on range splitter samples taken per partition
const SPLITTER_SAMPLES: usize = 8;

/// Total order on (value, original row) sort keys
///
/// Descending reverses only the value comparison; the row tiebreak stays
/// ascending so stability holds in both directions.
#[inline]
fn key_cmp(a: (f64, u64), b: (f64, u64), descending: bool) -> Ordering {
    let by_value = a.0.total_cmp(&b.0);
    let by_value = if descending {
        by_value.reverse()
    } else {
        by_value
    };
    by_value.then(a.1.cmp(&b.1))
}

/// Whether the implicit-zero run sorts before an explicit (nonzero) value
#[inline]
fn zero_sorts_before(value: f64, descending: bool) -> bool {
    if descending {
        value < 0.0
    } else {
        value > 0.0
    }
}

/// Validated single-column geometry
fn column_geometry(mc: &MatrixCharacteristics, op: &'static str) -> Result<(u64, u64)> {
    if !mc.dims_known() {
        return Err(Error::dimension(op, "input dimensions unknown"));
    }
    if !mc.blocking_known() {
        return Err(Error::dimension(op, "block sizes unknown"));
    }
    Ok((mc.rows() as u64, mc.rows_per_block() as u64))
}

/// Row coverage of the column's block grid
///
/// `zeros_before[rb]` is the number of zero rows in blocks strictly before
/// row-block `rb`; used to hand the zero run's ranks to zero rows in
/// original row order without materializing them during ranking.
struct ZeroLayout {
    zeros_before: HashMap<u64, u64>,
}

fn zero_layout(column: &MatrixCollection, mc: &MatrixCharacteristics) -> Result<ZeroLayout> {
    let nblocks = mc.num_row_blocks();
    let mut per_block: Vec<(u64, u64, u64)> = Vec::new();
    for (ix, blk) in column.iter() {
        if blk.cols() != 1 {
            return Err(Error::data_integrity(format!(
                "sort input block {ix} has {} columns, expected 1",
                blk.cols()
            )));
        }
        per_block.push((ix.row, blk.rows() as u64, blk.nnz() as u64));
    }
    per_block.sort_by_key(|x| x.0);

    if per_block.len() as u64 != nblocks {
        return Err(Error::data_integrity(format!(
            "column covers {} row-blocks, characteristics declare {nblocks}",
            per_block.len()
        )));
    }
    let mut zeros_before = HashMap::with_capacity(per_block.len());
    let mut acc = 0u64;
    for (i, (rb, rows, nnz)) in per_block.iter().enumerate() {
        if *rb != i as u64 + 1 || *rows != mc.block_rows_at(*rb) as u64 {
            return Err(Error::data_integrity(format!(
                "row-block {rb} with {rows} rows does not match the declared block grid"
            )));
        }
        zeros_before.insert(*rb, acc);
        acc += rows - nnz;
    }
    Ok(ZeroLayout { zeros_before })
}

/// Explicit (nonzero) entries of a single-column collection as
/// (1-based global row, value) pairs
fn explicit_entries(
    column: &MatrixCollection,
    mc: &MatrixCharacteristics,
) -> PairCollection<u64, f64> {
    let rpb = mc.rows_per_block() as u64;
    column.flat_map(move |ix, blk| {
        let base = (ix.row - 1) * rpb;
        blk.iter_nonzeros()
            .map(|e| (base + e.row as u64 + 1, e.value))
            .collect::<Vec<_>>()
    })
}

/// Route explicit entries into contiguous value-range partitions and sort
/// each partition locally
///
/// Splitters are evenly-spaced samples of the incoming partitions; routing
/// is by total (value, row) key order, so splitter quality affects balance
/// only, never the resulting order.
fn partition_by_value(
    entries: PairCollection<u64, f64>,
    num_partitions: usize,
    descending: bool,
) -> PairCollection<u64, f64> {
    let n = num_partitions.max(1);
    let mut samples: Vec<(f64, u64)> = Vec::new();
    for part in entries.partitions() {
        if part.is_empty() {
            continue;
        }
        let step = (part.len() / SPLITTER_SAMPLES).max(1);
        for (row, value) in part.iter().step_by(step).take(SPLITTER_SAMPLES) {
            samples.push((*value, *row));
        }
    }
    samples.sort_by(|a, b| key_cmp(*a, *b, descending));
    let splitters: Vec<(f64, u64)> = if samples.is_empty() {
        Vec::new()
    } else {
        (1..n).map(|i| samples[i * samples.len() / n]).collect()
    };

    let routed = entries.repartition_by(n, |row, value| {
        let key = (*value, *row);
        splitters.partition_point(|s| key_cmp(*s, key, descending) != Ordering::Greater)
    });
    routed.map_partitions(move |_, part| {
        let mut sorted = part.to_vec();
        sorted.sort_by(|a, b| key_cmp((a.1, a.0), (b.1, b.0), descending));
        sorted
    })
}

/// Offset table produced by the statistics barrier
#[derive(Debug, Clone)]
pub struct RankOffsets {
    /// 0-based global position of each partition's first explicit item
    pub offsets: Vec<u64>,
    /// The statistics the offsets were derived from
    pub stats: SortStats,
    /// 0-based global position where the implicit-zero run begins
    pub zero_run_start: u64,
}

/// The statistics barrier: collect per-partition counts, designate the
/// zero-owning partition, and compute the broadcast offset table
///
/// This is the single global synchronization point of the sort: every
/// partition's local count must be present before any partition may assign
/// final positions. A failure here aborts the entire sort.
pub fn compute_offsets(
    sorted: &PairCollection<u64, f64>,
    rows: u64,
    descending: bool,
) -> Result<RankOffsets> {
    let counts: Vec<u64> = sorted
        .partitions()
        .iter()
        .map(|p| p.len() as u64)
        .collect();
    let explicit: u64 = counts.iter().sum();
    if explicit > rows {
        return Err(Error::data_integrity(format!(
            "{explicit} explicit entries exceed declared row count {rows}"
        )));
    }

    // The zero run belongs to the first partition holding an entry it sorts
    // before; if every explicit entry sorts before zero, to the last one.
    let mut zero_partition = counts.len().saturating_sub(1);
    'scan: for (p, part) in sorted.partitions().iter().enumerate() {
        for (_, value) in part {
            if zero_sorts_before(*value, descending) {
                zero_partition = p;
                break 'scan;
            }
        }
    }

    let stats = SortStats::from_parts(counts, zero_partition, rows - explicit, rows)?;
    let offsets = stats.offsets();
    let local_before_zero = sorted.partitions()[zero_partition]
        .iter()
        .filter(|(_, value)| !zero_sorts_before(*value, descending))
        .count() as u64;
    let zero_run_start = offsets[zero_partition] + local_before_zero;
    Ok(RankOffsets {
        offsets,
        stats,
        zero_run_start,
    })
}

/// Assign 0-based global positions to locally sorted explicit entries,
/// producing (original row, (position, value)) pairs
fn assign_positions(
    sorted: &PairCollection<u64, f64>,
    off: &RankOffsets,
    descending: bool,
) -> PairCollection<u64, (u64, f64)> {
    let offsets = off.offsets.clone();
    let zero_owner = off.stats.zero_partition();
    let zero_count = off.stats.zero_count();
    sorted.map_partitions(move |p, part| {
        let insert = if p == zero_owner {
            part.iter()
                .filter(|(_, value)| !zero_sorts_before(*value, descending))
                .count()
        } else {
            0
        };
        part.iter()
            .enumerate()
            .map(|(i, (row, value))| {
                let mut pos = offsets[p] + i as u64;
                if p == zero_owner && i >= insert {
                    pos += zero_count;
                }
                (*row, (pos, *value))
            })
            .collect()
    })
}

/// Per-row 1-based global rank for every row of the column, zero rows
/// included, as (row, rank) pairs
fn row_ranks(
    column: &MatrixCollection,
    mc: &MatrixCharacteristics,
    descending: bool,
) -> Result<PairCollection<u64, u64>> {
    let (rows, rpb) = column_geometry(mc, "sort")?;
    let n = column.num_partitions().max(1);
    let layout = zero_layout(column, mc)?;

    let entries = explicit_entries(column, mc);
    let sorted = partition_by_value(entries, n, descending);
    let off = compute_offsets(&sorted, rows, descending)?;
    let positions = assign_positions(&sorted, &off, descending);

    // Ship explicit ranks back to their original row-blocks, then walk each
    // block once to hand the zero run's ranks to the remaining rows.
    let by_block = positions.map(move |row, pv| ((*row - 1) / rpb + 1, (*row, pv.0)));
    let grouped = by_block.group_by_key(n, |rb| partition_of(&BlockIndex::new(*rb, 1), n));
    let blocks_by_rb = column.map(|ix, blk| (ix.row, blk.clone()));

    let zeros_before = layout.zeros_before;
    let zero_start = off.zero_run_start;
    let ranks = blocks_by_rb
        .left_join(&grouped)
        .flat_map(move |rb, pair| {
            let (blk, explicit) = pair;
            let base = (*rb - 1) * rpb;
            let mut out = Vec::with_capacity(blk.rows());
            let mut is_explicit = vec![false; blk.rows()];
            if let Some(list) = explicit {
                for (row, pos) in list {
                    is_explicit[(*row - 1 - base) as usize] = true;
                    out.push((*row, *pos + 1));
                }
            }
            let mut z = zero_start + zeros_before.get(rb).copied().unwrap_or(0);
            for r in 0..blk.rows() {
                if !is_explicit[r] {
                    z += 1;
                    out.push((base + r as u64 + 1, z));
                }
            }
            out
        });
    Ok(ranks)
}

/// Index mode: each original row's 1-based global rank, re-blocked into the
/// input's geometry as a dense rank column (nnz = rows)
pub fn sort_indexes(
    column: &MatrixCollection,
    mc: &MatrixCharacteristics,
    descending: bool,
) -> Result<MatrixCollection> {
    let (_, rpb) = column_geometry(mc, "sort")?;
    let n = column.num_partitions().max(1);
    let ranks = row_ranks(column, mc, descending)?;

    let placed = ranks.map(move |row, rank| {
        let rb = (*row - 1) / rpb + 1;
        let local = ((*row - 1) % rpb) as usize;
        (rb, (local, *rank))
    });
    let mc_out = *mc;
    Ok(placed
        .group_by_key(n, |rb| partition_of(&BlockIndex::new(*rb, 1), n))
        .map(move |rb, list| {
            let mut values = vec![0.0; mc_out.block_rows_at(*rb)];
            for (local, rank) in list {
                values[*local] = *rank as f64;
            }
            (
                BlockIndex::new(*rb, 1),
                MatrixBlock::column_from_values(values),
            )
        }))
}

/// Value mode: the column's values in sorted order, re-blocked into the
/// output geometry (nnz preserved; zero-run blocks stay empty)
pub fn sort_values(
    column: &MatrixCollection,
    mc: &MatrixCharacteristics,
    descending: bool,
) -> Result<MatrixCollection> {
    let (rows, rpb) = column_geometry(mc, "sort")?;
    let n = column.num_partitions().max(1);
    // Validates block coverage up front; a gap would corrupt the zero count.
    let _ = zero_layout(column, mc)?;

    let entries = explicit_entries(column, mc);
    let sorted = partition_by_value(entries, n, descending);
    let off = compute_offsets(&sorted, rows, descending)?;
    let positions = assign_positions(&sorted, &off, descending);

    let placed = positions.map(move |_, pv| {
        let (pos, value) = *pv;
        let pb = pos / rpb + 1;
        let local = (pos % rpb) as u32;
        (pb, Entry::new(local, 0, value))
    });
    let mc_out = *mc;
    let explicit_blocks = placed
        .group_by_key(n, |pb| partition_of(&BlockIndex::new(*pb, 1), n))
        .map(move |pb, list| {
            (
                BlockIndex::new(*pb, 1),
                MatrixBlock::from_entries(mc_out.block_rows_at(*pb), 1, list.clone()),
            )
        });

    // Blocks covered entirely by the zero run received no entries; the
    // output block-index space must still have no gaps.
    let present: HashSet<u64> = explicit_blocks.iter().map(|(ix, _)| ix.row).collect();
    let missing: Vec<(BlockIndex, MatrixBlock)> = (1..=mc.num_row_blocks())
        .filter(|pb| !present.contains(pb))
        .map(|pb| {
            (
                BlockIndex::new(pb, 1),
                MatrixBlock::empty(mc_out.block_rows_at(pb), 1),
            )
        })
        .collect();
    Ok(explicit_blocks.union(MatrixCollection::from_blocks(missing, n)))
}

/// Data mode: reorder every row of `data` by the permutation that sorts
/// `column` (shape and nnz preserved)
///
/// Row fragments shuffle under a [`TripleIndex`] whose tag is the source
/// row-block; placement hashes only the target coordinate, so all fragments
/// of one output block land co-located and merge without a further shuffle.
pub fn sort_data(
    column: &MatrixCollection,
    data: &MatrixCollection,
    mc: &MatrixCharacteristics,
    descending: bool,
) -> Result<MatrixCollection> {
    let (_, rpb) = column_geometry(mc, "sort")?;
    if mc.cols() < 0 || mc.cols_per_block() <= 0 {
        return Err(Error::dimension("sort", "data matrix geometry unknown"));
    }
    let n = data.num_partitions().max(column.num_partitions()).max(1);
    let ranks = row_ranks(column, mc, descending)?;

    let perm = ranks
        .map(move |row, target| ((*row - 1) / rpb + 1, (*row, *target)))
        .group_by_key(n, |rb| partition_of(&BlockIndex::new(*rb, 1), n));
    let keyed = data.map(|ix, blk| (ix.row, (ix.col, blk.clone())));

    let fragments = keyed.join(&perm).flat_map(move |rb, joined| {
        let ((cb, blk), perm_list) = joined;
        let base = (*rb - 1) * rpb;
        let mut by_row: Vec<Vec<(u32, f64)>> = vec![Vec::new(); blk.rows()];
        for e in blk.iter_nonzeros() {
            by_row[e.row as usize].push((e.col, e.value));
        }
        let mut frags: HashMap<u64, Vec<Entry>> = HashMap::new();
        for (row, target) in perm_list {
            let local = (*row - 1 - base) as usize;
            let t_rb = (*target - 1) / rpb + 1;
            let t_local = ((*target - 1) % rpb) as u32;
            let bucket = frags.entry(t_rb).or_default();
            for (c, v) in &by_row[local] {
                bucket.push(Entry::new(t_local, *c, *v));
            }
        }
        frags
            .into_iter()
            .map(|(t_rb, entries)| (TripleIndex::new(t_rb, *cb, *rb), entries))
            .collect::<Vec<_>>()
    });

    let mc_out = *mc;
    let merged = fragments
        .repartition_by(n, |t, _| t.partition(n))
        .map(|t, entries| (t.block(), entries.clone()))
        .reduce_by_key(
            n,
            |ix| partition_of(ix, n),
            |mut a, mut b| {
                a.append(&mut b);
                a
            },
        );
    Ok(merged.map(move |ix, entries| {
        (
            *ix,
            MatrixBlock::from_entries(
                mc_out.block_rows_at(ix.row),
                mc_out.block_cols_at(ix.col),
                entries.clone(),
            ),
        )
    }))
}
