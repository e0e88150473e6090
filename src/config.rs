// src/config.rs

use crate::error::{Result, SchurError};

/// Tuning knobs for the block swaps performed during reordering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapConfig {
    pub threshold_factor: f64,     // Multiple of eps * ||D|| a swap may leave behind
    pub max_refinement_steps: usize, // Cap on iterative refinement of the Sylvester solve
}

impl Default for SwapConfig {
    fn default() -> Self {
        SwapConfig {
            threshold_factor: 20.0,
            max_refinement_steps: 2,
        }
    }
}

impl SwapConfig {
    pub fn new(threshold_factor: f64, max_refinement_steps: usize) -> Result<Self> {
        if !(threshold_factor.is_finite() && threshold_factor >= 1.0) {
            return Err(SchurError::invalid(
                1,
                "threshold_factor",
                format!("must be a finite value >= 1, got {}", threshold_factor),
            ));
        }
        if max_refinement_steps > 16 {
            return Err(SchurError::invalid(
                2,
                "max_refinement_steps",
                format!("at most 16 refinement steps are allowed, got {}", max_refinement_steps),
            ));
        }
        Ok(SwapConfig {
            threshold_factor,
            max_refinement_steps,
        })
    }

    /// Largest residual a swap of the local block `norm` may leave behind.
    pub fn threshold(&self, norm: f64) -> f64 {
        let eps = f64::EPSILON;
        (self.threshold_factor * eps * norm).max(f64::MIN_POSITIVE / eps)
    }
}

/// How each eigenvector column is scaled once back-substitution is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Largest |re| + |im| component equals one.
    #[default]
    MaxAbs,
    /// Unit 2-norm; a conjugate pair satisfies ||x_re||^2 + ||x_im||^2 = 1.
    Euclidean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EigenvectorConfig {
    pub normalization: Normalization,
    pub parallel: bool, // Run one back-substitution per rayon task
}

impl Default for EigenvectorConfig {
    fn default() -> Self {
        EigenvectorConfig {
            normalization: Normalization::MaxAbs,
            parallel: true,
        }
    }
}
