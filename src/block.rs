//! Immutable dense/sparse matrix tiles and their local reorg kernels
//!
//! A [`MatrixBlock`] is the unit of distribution: a rectangular tile bounded
//! by the declared block size. Storage is chosen once at construction (dense
//! row-major values or sorted sparse triplets) and every operator produces
//! new blocks rather than mutating in place.

use crate::error::{Error, Result};

/// Density above which [`MatrixBlock::from_entries`] picks dense storage
const DENSE_TURN_POINT: f64 = 0.4;

/// Explicit nonzero entry within a block, 0-based local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    /// Local row, 0-based
    pub row: u32,
    /// Local column, 0-based
    pub col: u32,
    /// Cell value; never 0.0 in stored form
    pub value: f64,
}

impl Entry {
    /// Create an entry
    #[inline]
    pub fn new(row: u32, col: u32, value: f64) -> Self {
        Self { row, col, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BlockStorage {
    /// Row-major cell values, length rows * cols
    Dense(Vec<f64>),
    /// Explicit nonzero triplets, sorted row-major
    Sparse(Vec<Entry>),
}

/// One local tile of a block-partitioned matrix
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixBlock {
    rows: usize,
    cols: usize,
    storage: BlockStorage,
}

impl MatrixBlock {
    /// Create a dense block from row-major values
    pub fn dense(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(Error::invalid_argument(
                "values",
                format!(
                    "expected {} values for a {rows}x{cols} block, got {}",
                    rows * cols,
                    values.len()
                ),
            ));
        }
        Ok(Self {
            rows,
            cols,
            storage: BlockStorage::Dense(values),
        })
    }

    /// Create a sparse block from explicit entries
    ///
    /// Entries with value 0.0 are dropped; the rest are kept sorted
    /// row-major. Out-of-bounds coordinates are rejected.
    pub fn sparse(rows: usize, cols: usize, entries: Vec<Entry>) -> Result<Self> {
        let mut kept = Vec::with_capacity(entries.len());
        for e in entries {
            if e.row as usize >= rows || e.col as usize >= cols {
                return Err(Error::invalid_argument(
                    "entries",
                    format!("entry ({}, {}) outside {rows}x{cols} block", e.row, e.col),
                ));
            }
            if e.value != 0.0 {
                kept.push(e);
            }
        }
        kept.sort_by_key(|e| (e.row, e.col));
        Ok(Self {
            rows,
            cols,
            storage: BlockStorage::Sparse(kept),
        })
    }

    /// Create an empty (all-zero) sparse block
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            storage: BlockStorage::Sparse(Vec::new()),
        }
    }

    /// Build a block from entries, choosing storage by resulting density
    ///
    /// Contract: every entry lies inside the `rows` x `cols` tile; producers
    /// compute entry coordinates from validated characteristics.
    pub fn from_entries(rows: usize, cols: usize, entries: Vec<Entry>) -> Self {
        debug_assert!(entries
            .iter()
            .all(|e| (e.row as usize) < rows && (e.col as usize) < cols));
        let cells = rows * cols;
        let nnz = entries.iter().filter(|e| e.value != 0.0).count();
        if cells > 0 && (nnz as f64 / cells as f64) > DENSE_TURN_POINT {
            let mut values = vec![0.0; cells];
            for e in entries {
                values[e.row as usize * cols + e.col as usize] = e.value;
            }
            Self {
                rows,
                cols,
                storage: BlockStorage::Dense(values),
            }
        } else {
            let mut kept: Vec<Entry> = entries.into_iter().filter(|e| e.value != 0.0).collect();
            kept.sort_by_key(|e| (e.row, e.col));
            Self {
                rows,
                cols,
                storage: BlockStorage::Sparse(kept),
            }
        }
    }

    /// Build a rows x 1 dense column tile from its values
    pub fn column_from_values(values: Vec<f64>) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            storage: BlockStorage::Dense(values),
        }
    }

    /// Number of rows in the tile
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns in the tile
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the tile uses sparse storage
    #[inline]
    pub fn is_sparse(&self) -> bool {
        matches!(self.storage, BlockStorage::Sparse(_))
    }

    /// Count of nonzero cells (explicit zeros in dense storage do not count)
    pub fn nnz(&self) -> usize {
        match &self.storage {
            BlockStorage::Dense(v) => v.iter().filter(|x| **x != 0.0).count(),
            BlockStorage::Sparse(e) => e.len(),
        }
    }

    /// Cell value at 0-based local (row, col)
    pub fn get(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows && col < self.cols);
        match &self.storage {
            BlockStorage::Dense(v) => v[row * self.cols + col],
            BlockStorage::Sparse(e) => e
                .binary_search_by_key(&(row as u32, col as u32), |x| (x.row, x.col))
                .map(|i| e[i].value)
                .unwrap_or(0.0),
        }
    }

    /// Iterate the nonzero cells in row-major order
    pub fn iter_nonzeros(&self) -> Box<dyn Iterator<Item = Entry> + '_> {
        match &self.storage {
            BlockStorage::Dense(v) => {
                let cols = self.cols;
                Box::new(v.iter().enumerate().filter_map(move |(i, x)| {
                    (*x != 0.0)
                        .then(|| Entry::new((i / cols) as u32, (i % cols) as u32, *x))
                }))
            }
            BlockStorage::Sparse(e) => Box::new(e.iter().copied()),
        }
    }

    /// Materialize the tile as a row-major dense vector
    pub fn to_dense(&self) -> Vec<f64> {
        match &self.storage {
            BlockStorage::Dense(v) => v.clone(),
            BlockStorage::Sparse(e) => {
                let mut out = vec![0.0; self.rows * self.cols];
                for x in e {
                    out[x.row as usize * self.cols + x.col as usize] = x.value;
                }
                out
            }
        }
    }

    /// The transposed tile
    pub fn transpose(&self) -> Self {
        match &self.storage {
            BlockStorage::Dense(v) => {
                let mut out = vec![0.0; v.len()];
                for r in 0..self.rows {
                    for c in 0..self.cols {
                        out[c * self.rows + r] = v[r * self.cols + c];
                    }
                }
                Self {
                    rows: self.cols,
                    cols: self.rows,
                    storage: BlockStorage::Dense(out),
                }
            }
            BlockStorage::Sparse(e) => {
                let mut out: Vec<Entry> =
                    e.iter().map(|x| Entry::new(x.col, x.row, x.value)).collect();
                out.sort_by_key(|x| (x.row, x.col));
                Self {
                    rows: self.cols,
                    cols: self.rows,
                    storage: BlockStorage::Sparse(out),
                }
            }
        }
    }

    /// The main-diagonal slice of a diagonal tile, as a rows x 1 column
    pub fn diagonal(&self) -> Self {
        let len = self.rows.min(self.cols);
        match &self.storage {
            BlockStorage::Dense(_) => {
                let mut out = vec![0.0; self.rows];
                for (i, slot) in out.iter_mut().enumerate().take(len) {
                    *slot = self.get(i, i);
                }
                Self {
                    rows: self.rows,
                    cols: 1,
                    storage: BlockStorage::Dense(out),
                }
            }
            BlockStorage::Sparse(e) => {
                let out: Vec<Entry> = e
                    .iter()
                    .filter(|x| x.row == x.col && (x.row as usize) < len)
                    .map(|x| Entry::new(x.row, 0, x.value))
                    .collect();
                Self {
                    rows: self.rows,
                    cols: 1,
                    storage: BlockStorage::Sparse(out),
                }
            }
        }
    }

    /// Expand a rows x 1 column tile into a rows x rows diagonal tile
    ///
    /// Contract: `self.cols == 1`; the diagonal operators validate the
    /// column shape against the matrix characteristics first.
    pub fn expand_to_diagonal(&self) -> Self {
        debug_assert_eq!(self.cols, 1);
        let entries: Vec<Entry> = self
            .iter_nonzeros()
            .map(|e| Entry::new(e.row, e.row, e.value))
            .collect();
        Self {
            rows: self.rows,
            cols: self.rows,
            storage: BlockStorage::Sparse(entries),
        }
    }

    /// The rows x 1 slice of local column `col`
    ///
    /// Contract: `col < self.cols`; producers validate column bounds against
    /// the matrix characteristics before slicing.
    pub fn column(&self, col: usize) -> Self {
        debug_assert!(col < self.cols);
        match &self.storage {
            BlockStorage::Dense(v) => {
                let out: Vec<f64> = (0..self.rows).map(|r| v[r * self.cols + col]).collect();
                Self {
                    rows: self.rows,
                    cols: 1,
                    storage: BlockStorage::Dense(out),
                }
            }
            BlockStorage::Sparse(e) => {
                let out: Vec<Entry> = e
                    .iter()
                    .filter(|x| x.col as usize == col)
                    .map(|x| Entry::new(x.row, 0, x.value))
                    .collect();
                Self {
                    rows: self.rows,
                    cols: 1,
                    storage: BlockStorage::Sparse(out),
                }
            }
        }
    }
}
