//! Error types for blockmat

use thiserror::Error;

/// Result type alias using blockmat's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in blockmat operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Block size is inconsistent with the declared storage format
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Dimensions required by an operator are unknown or partially specified
    #[error("Dimension error in '{op}': {reason}")]
    Dimension {
        /// The operation that needed the dimensions
        op: &'static str,
        /// Why the dimensions are unusable
        reason: String,
    },

    /// Opcode outside the supported reorg set
    #[error("Unsupported opcode '{opcode}'")]
    UnsupportedOperation {
        /// The offending opcode
        opcode: String,
    },

    /// Sort statistics or block coverage inconsistent with the declared shape
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Create a dimension error for the given operation
    pub fn dimension(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Dimension {
            op,
            reason: reason.into(),
        }
    }

    /// Create an unsupported-opcode error
    pub fn unsupported(opcode: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            opcode: opcode.into(),
        }
    }

    /// Create a data integrity error
    pub fn data_integrity(reason: impl Into<String>) -> Self {
        Self::DataIntegrity(reason.into())
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
