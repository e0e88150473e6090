// src/error.rs

//! Error types and the integer status contract shared by every entry point.

use thiserror::Error;

/// Result type alias using schurvec's Error
pub type Result<T> = std::result::Result<T, SchurError>;

/// Errors that can occur while reordering or back-substituting a Schur form
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchurError {
    /// Structurally inconsistent argument, detected before any matrix is touched
    #[error("Invalid argument #{position} '{name}': {reason}")]
    InvalidArgument {
        /// 1-based ordinal of the argument in the slice-level entry points
        position: usize,
        /// The argument name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// The matrix does not have the quasi-triangular structure it claims
    #[error("Inconsistent Schur form at row {row}: {reason}")]
    InconsistentInput {
        /// First row of the offending diagonal block
        row: usize,
        /// What was found there
        reason: String,
    },

    /// Exchanging two adjacent blocks would have been numerically unsafe
    #[error("Swap at row {position} rejected: residual {residual:e} exceeds threshold {threshold:e}")]
    SwapRejected {
        /// First row of the upper block of the pair
        position: usize,
        /// Measured departure from an exact exchange
        residual: f64,
        /// Largest departure that is tolerated
        threshold: f64,
    },

    /// Exchanging two adjacent blocks would have turned a conjugate pair into
    /// two real eigenvalues
    #[error("Swap at row {position} rejected: a conjugate pair would split into real eigenvalues")]
    PairSplit {
        /// First row of the upper block of the pair
        position: usize,
    },

    /// A matrix view could not be built over the supplied storage
    #[error("Shape error: {0}")]
    Shape(String),
}

impl From<ndarray::ShapeError> for SchurError {
    fn from(e: ndarray::ShapeError) -> Self {
        SchurError::Shape(e.to_string())
    }
}

impl SchurError {
    pub(crate) fn invalid(position: usize, name: &'static str, reason: impl Into<String>) -> Self {
        SchurError::InvalidArgument {
            position,
            name,
            reason: reason.into(),
        }
    }
}

/// Outcome codes of the slice-level entry points.
///
/// `code()` yields `0` on success, `-i` when the i'th argument is invalid and a
/// positive value for conditions the caller may choose to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    InvalidArgument(usize),
    /// Reported by the iterative reduction stage; never produced by this crate.
    DidNotConverge,
    /// Some selected eigenvalues could not be moved to the leading prefix.
    PartialReordering,
    /// Some eigenvector columns underflowed and were left at zero.
    PartialEigenvectors,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::InvalidArgument(position) => -(position as i32),
            Status::DidNotConverge => 1,
            Status::PartialReordering => 2,
            Status::PartialEigenvectors => 3,
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl SchurError {
    /// Status code for this error. Structural problems found inside a matrix are
    /// charged to `matrix_position`, the ordinal of the matrix that held them.
    pub fn status(&self, matrix_position: usize) -> Status {
        match self {
            SchurError::InvalidArgument { position, .. } => Status::InvalidArgument(*position),
            SchurError::SwapRejected { .. } | SchurError::PairSplit { .. } => {
                Status::PartialReordering
            }
            SchurError::InconsistentInput { .. } | SchurError::Shape(_) => {
                Status::InvalidArgument(matrix_position)
            }
        }
    }
}
