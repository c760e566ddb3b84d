//! # blockmat
//!
//! **Distributed block-partitioned matrix reorganization for Rust.**
//!
//! blockmat models a large matrix as a partitioned collection of fixed-size
//! tiles keyed by block index, and implements the reorg operator family over
//! it: transpose, diagonal extract/construct, and sparsity-aware column sort
//! with global rank computation.
//!
//! ## Why blockmat?
//!
//! - **Block-partitioned**: matrices are collections of `(index, tile)`
//!   pairs, so every operator is a pipeline of per-partition transforms
//! - **Sparsity-aware**: the sort engine never materializes implicit zeros,
//!   even when ranking every row of a mostly-empty column
//! - **Deterministic placement**: block indexes hash to partitions so that
//!   co-partitioned data never needs an extra shuffle
//! - **Provenance tracked**: cached results form a reference-counted lineage
//!   graph that reports when an intermediate is safe to evict
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blockmat::prelude::*;
//!
//! let mut ctx = LocalContext::new();
//! ctx.set_collection("A", blocks, mc)?;
//!
//! let instr = ReorgInstruction::from_opcode(
//!     "sort",
//!     "A",
//!     "B",
//!     vec![Operand::int(1), Operand::bool(false), Operand::bool(true)],
//! )?;
//! instr.process(&mut ctx)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded per-partition execution

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod block;
pub mod characteristics;
pub mod collection;
pub mod context;
pub mod error;
pub mod index;
pub mod lineage;
pub mod reorg;
pub mod sort;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::block::{Entry, MatrixBlock};
    pub use crate::characteristics::{MatrixCharacteristics, StorageFormat};
    pub use crate::collection::{MatrixCollection, PairCollection};
    pub use crate::context::{
        ExecutionContext, LocalContext, Operand, ReorgInstruction, ScalarValue,
    };
    pub use crate::error::{Error, Result};
    pub use crate::index::{BlockIndex, TripleIndex};
    pub use crate::lineage::{LineageGraph, LineageId};
    pub use crate::reorg::ReorgOp;
}
