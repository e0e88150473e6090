pub mod blocks;
pub mod config;
pub mod eigvec;
pub mod eigvec_gen;
pub mod error;
pub mod gep;
pub mod io;
pub mod layout;
pub mod progress;
pub mod reorder;
pub mod rotation;
pub mod select;
pub mod sep;
pub mod small_solve;
pub mod swap;
pub mod sylvester;

pub use blocks::{classify_blocks, classify_pencil, Block, Eigenvalues, GeneralizedEigenvalues};
pub use config::{EigenvectorConfig, Normalization, SwapConfig};
pub use eigvec::{eigenvectors, Eigenvectors};
pub use eigvec_gen::generalized_eigenvectors;
pub use error::{Result, SchurError, Status};
pub use reorder::{reorder_generalized, reorder_schur, ReorderReport};
pub use select::{select_eigenvalues, select_generalized, EigenvalueSelector, Selection};
