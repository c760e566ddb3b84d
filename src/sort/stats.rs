//! Per-partition sort statistics and global rank offsets
//!
//! One [`SortStats`] is derived fresh per sort invocation: the explicit
//! (nonzero) item count of every value partition in partition order, the
//! single partition designated to own the implicit-zero run, and the zero
//! count. The completeness invariant `sum(counts) + zero_count == rows` is
//! enforced at construction and re-checkable through [`SortStats::validate`].

use crate::error::{Error, Result};

/// Statistics for one distributed sort invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortStats {
    counts: Vec<u64>,
    zero_partition: usize,
    zero_count: u64,
    rows: u64,
}

impl SortStats {
    /// Assemble statistics from already-collected parts, validating the
    /// completeness invariant
    pub fn from_parts(
        counts: Vec<u64>,
        zero_partition: usize,
        zero_count: u64,
        rows: u64,
    ) -> Result<Self> {
        if zero_partition >= counts.len() {
            return Err(Error::invalid_argument(
                "zero_partition",
                format!(
                    "partition {zero_partition} outside {} partitions",
                    counts.len()
                ),
            ));
        }
        let stats = Self {
            counts,
            zero_partition,
            zero_count,
            rows,
        };
        stats.validate()?;
        Ok(stats)
    }

    /// Explicit item count per partition, in partition order
    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Partition designated to own the implicit-zero run
    #[inline]
    pub fn zero_partition(&self) -> usize {
        self.zero_partition
    }

    /// Number of implicit zero items
    #[inline]
    pub fn zero_count(&self) -> u64 {
        self.zero_count
    }

    /// Total row count the statistics must cover
    #[inline]
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Check `sum(counts) + zero_count == rows`
    pub fn validate(&self) -> Result<()> {
        let explicit: u64 = self.counts.iter().sum();
        if explicit + self.zero_count != self.rows {
            return Err(Error::data_integrity(format!(
                "per-partition counts {explicit} + zeros {} != rows {}",
                self.zero_count, self.rows
            )));
        }
        Ok(())
    }

    /// Exclusive prefix sum over the counts, with the zero-owning
    /// partition's slot expanded by the zero count
    ///
    /// `offsets()[p]` is the 0-based global position of partition `p`'s
    /// first explicit item, before the partition-local zero-run insertion.
    pub fn offsets(&self) -> Vec<u64> {
        let mut offsets = Vec::with_capacity(self.counts.len());
        let mut acc = 0u64;
        for (p, count) in self.counts.iter().enumerate() {
            offsets.push(acc);
            acc += count;
            if p == self.zero_partition {
                acc += self.zero_count;
            }
        }
        offsets
    }
}
