//! Matrix shape and format metadata with partial-knowledge inference
//!
//! Dimensions, block sizes, and the nonzero count of an intermediate result
//! may be unknown until both its producer and consumer are resolved; the
//! sentinel `-1` marks an unknown field. Operators query
//! [`MatrixCharacteristics::dims_known`] / [`MatrixCharacteristics::nnz_known`]
//! before relying on a field and abort eagerly otherwise.

use crate::error::{Error, Result};

/// Sentinel marking an unknown dimension or nonzero count
pub const UNKNOWN: i64 = -1;

/// Physical storage orientation of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    /// Blocked binary storage; requires a fixed positive block-size pair
    Blocked,
    /// Unblocked text-oriented storage; requires block sizes of (-1, -1)
    Unblocked,
}

/// Shape, blocking, and sparsity metadata for one matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixCharacteristics {
    rows: i64,
    cols: i64,
    rows_per_block: i64,
    cols_per_block: i64,
    nnz: i64,
}

impl MatrixCharacteristics {
    /// Create characteristics with known dimensions and block sizes
    ///
    /// The nonzero count starts unknown; see [`Self::with_nonzeros`].
    pub fn new(rows: u64, cols: u64, rows_per_block: u64, cols_per_block: u64) -> Self {
        Self {
            rows: rows as i64,
            cols: cols as i64,
            rows_per_block: rows_per_block as i64,
            cols_per_block: cols_per_block as i64,
            nnz: UNKNOWN,
        }
    }

    /// Create fully-unknown characteristics
    pub fn unknown() -> Self {
        Self {
            rows: UNKNOWN,
            cols: UNKNOWN,
            rows_per_block: UNKNOWN,
            cols_per_block: UNKNOWN,
            nnz: UNKNOWN,
        }
    }

    /// Set the nonzero count, consuming and returning self
    pub fn with_nonzeros(mut self, nnz: u64) -> Self {
        self.nnz = nnz as i64;
        self
    }

    /// Number of rows, or [`UNKNOWN`]
    #[inline]
    pub fn rows(&self) -> i64 {
        self.rows
    }

    /// Number of columns, or [`UNKNOWN`]
    #[inline]
    pub fn cols(&self) -> i64 {
        self.cols
    }

    /// Rows per block, or [`UNKNOWN`]
    #[inline]
    pub fn rows_per_block(&self) -> i64 {
        self.rows_per_block
    }

    /// Columns per block, or [`UNKNOWN`]
    #[inline]
    pub fn cols_per_block(&self) -> i64 {
        self.cols_per_block
    }

    /// Nonzero count, or [`UNKNOWN`]
    #[inline]
    pub fn nnz(&self) -> i64 {
        self.nnz
    }

    /// Whether both dimensions are known
    #[inline]
    pub fn dims_known(&self) -> bool {
        self.rows >= 0 && self.cols >= 0
    }

    /// Whether both block sizes are known and positive
    #[inline]
    pub fn blocking_known(&self) -> bool {
        self.rows_per_block > 0 && self.cols_per_block > 0
    }

    /// Whether the nonzero count is known
    #[inline]
    pub fn nnz_known(&self) -> bool {
        self.nnz >= 0
    }

    /// Overwrite dimensions and block sizes (used when inference resolves them)
    pub fn set_dims(&mut self, rows: i64, cols: i64, rows_per_block: i64, cols_per_block: i64) {
        self.rows = rows;
        self.cols = cols;
        self.rows_per_block = rows_per_block;
        self.cols_per_block = cols_per_block;
    }

    /// Overwrite the nonzero count
    pub fn set_nonzeros(&mut self, nnz: u64) {
        self.nnz = nnz as i64;
    }

    /// Number of row-blocks: ceil(rows / rows_per_block)
    ///
    /// Callers must check [`Self::dims_known`] and [`Self::blocking_known`].
    #[inline]
    pub fn num_row_blocks(&self) -> u64 {
        debug_assert!(self.rows >= 0 && self.rows_per_block > 0);
        ((self.rows + self.rows_per_block - 1) / self.rows_per_block) as u64
    }

    /// Number of column-blocks: ceil(cols / cols_per_block)
    #[inline]
    pub fn num_col_blocks(&self) -> u64 {
        debug_assert!(self.cols >= 0 && self.cols_per_block > 0);
        ((self.cols + self.cols_per_block - 1) / self.cols_per_block) as u64
    }

    /// Actual row count of the block in row-block `block_row` (1-based),
    /// accounting for a ragged final block
    #[inline]
    pub fn block_rows_at(&self, block_row: u64) -> usize {
        let full = self.rows_per_block as u64;
        let start = (block_row - 1) * full;
        full.min(self.rows as u64 - start) as usize
    }

    /// Actual column count of the block in column-block `block_col` (1-based)
    #[inline]
    pub fn block_cols_at(&self, block_col: u64) -> usize {
        let full = self.cols_per_block as u64;
        let start = (block_col - 1) * full;
        full.min(self.cols as u64 - start) as usize
    }

    /// 1-based row-block containing the 1-based cell row
    #[inline]
    pub fn row_block_of(&self, row: u64) -> u64 {
        (row - 1) / self.rows_per_block as u64 + 1
    }

    /// 1-based column-block containing the 1-based cell column
    #[inline]
    pub fn col_block_of(&self, col: u64) -> u64 {
        (col - 1) / self.cols_per_block as u64 + 1
    }

    /// 0-based offset of the 1-based cell row within its block
    #[inline]
    pub fn row_offset_in_block(&self, row: u64) -> usize {
        ((row - 1) % self.rows_per_block as u64) as usize
    }

    /// 0-based offset of the 1-based cell column within its block
    #[inline]
    pub fn col_offset_in_block(&self, col: u64) -> usize {
        ((col - 1) % self.cols_per_block as u64) as usize
    }

    /// Validate the block-size pair against a storage format
    ///
    /// A half-known pair is a dimension error; a pair wrong for the format
    /// (positive for unblocked, non-positive for blocked) is a configuration
    /// error.
    pub fn validate_blocking(&self, format: StorageFormat) -> Result<()> {
        let rpb = self.rows_per_block;
        let cpb = self.cols_per_block;
        if (rpb > 0) != (cpb > 0) {
            return Err(Error::dimension(
                "validate_blocking",
                format!("partial block-size pair ({rpb}, {cpb})"),
            ));
        }
        match format {
            StorageFormat::Blocked if rpb <= 0 => Err(Error::configuration(format!(
                "blocked storage requires positive block sizes, got ({rpb}, {cpb})"
            ))),
            StorageFormat::Unblocked if rpb != UNKNOWN || cpb != UNKNOWN => {
                Err(Error::configuration(format!(
                    "unblocked storage requires block sizes (-1, -1), got ({rpb}, {cpb})"
                )))
            }
            _ => Ok(()),
        }
    }
}
