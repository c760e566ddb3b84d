//! Reorg operator family: transpose, diagonal extract/construct, order-by
//!
//! Reorg operators rearrange entries without changing their values. Dispatch
//! is a closed enum matched exhaustively; every operator is a stateless,
//! pure functional pipeline over the input block collection. Output
//! characteristics are inferred from the input's once both are resolved;
//! inference failures abort the operator eagerly with no partial output.

pub mod diag;
pub mod sort;
pub mod transpose;

use crate::characteristics::MatrixCharacteristics;
use crate::collection::MatrixCollection;
use crate::error::{Error, Result};

/// A reorg opcode with resolved parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorgOp {
    /// Swap rows and columns
    Transpose,
    /// Diagonal extract (matrix to column) or construct (column to square
    /// matrix), chosen by the input's column count
    Diag,
    /// Order by a column
    Sort {
        /// 1-based target column
        col: u64,
        /// Sort descending instead of ascending
        descending: bool,
        /// Return each row's rank instead of reordered data
        index_return: bool,
    },
}

impl ReorgOp {
    /// Opcode name used in diagnostics
    pub fn opcode(&self) -> &'static str {
        match self {
            ReorgOp::Transpose => "transpose",
            ReorgOp::Diag => "diag",
            ReorgOp::Sort { .. } => "sort",
        }
    }
}

/// Dispatch a reorg operator over a block collection
pub fn apply(
    op: &ReorgOp,
    input: &MatrixCollection,
    mc: &MatrixCharacteristics,
) -> Result<MatrixCollection> {
    match op {
        ReorgOp::Transpose => Ok(transpose::transpose(input)),
        ReorgOp::Diag => {
            if !mc.dims_known() {
                return Err(Error::dimension("diag", "input dimensions unknown"));
            }
            if mc.cols() == 1 {
                diag::construct(input, mc)
            } else {
                Ok(diag::extract(input))
            }
        }
        ReorgOp::Sort {
            col,
            descending,
            index_return,
        } => sort::sort(input, mc, *col, *descending, *index_return),
    }
}

/// Infer output characteristics from the input's
///
/// Dimension rules: transpose swaps dimensions and block sizes; diag keeps
/// rows and sets cols to 1 (extract) or rows (construct); sort keeps the
/// shape, narrowing to one column when returning ranks. Nonzero counts are
/// preserved except in index-return sort, where the result is a dense rank
/// column with nnz = rows.
pub fn output_characteristics(
    op: &ReorgOp,
    mc: &MatrixCharacteristics,
) -> Result<MatrixCharacteristics> {
    if !mc.dims_known() {
        return Err(Error::dimension(
            op.opcode(),
            "unable to compute output characteristics from input",
        ));
    }
    let mut out = MatrixCharacteristics::unknown();
    match op {
        ReorgOp::Transpose => out.set_dims(
            mc.cols(),
            mc.rows(),
            mc.cols_per_block(),
            mc.rows_per_block(),
        ),
        ReorgOp::Diag => out.set_dims(
            mc.rows(),
            if mc.cols() > 1 { 1 } else { mc.rows() },
            mc.rows_per_block(),
            mc.cols_per_block(),
        ),
        ReorgOp::Sort { index_return, .. } => out.set_dims(
            mc.rows(),
            if *index_return { 1 } else { mc.cols() },
            mc.rows_per_block(),
            mc.cols_per_block(),
        ),
    }
    match op {
        // A rank column is always fully dense.
        ReorgOp::Sort {
            index_return: true, ..
        } => out.set_nonzeros(mc.rows() as u64),
        _ if mc.nnz_known() => out.set_nonzeros(mc.nnz() as u64),
        _ => {}
    }
    Ok(out)
}
