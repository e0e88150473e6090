// src/select.rs

//! Building and checking selection arrays.

use ndarray::ArrayView2;

use crate::blocks::{classify_blocks, classify_pencil, generalized_eigenvalues, Block};
use crate::error::{Result, SchurError};

/// Selection array with one flag per eigenvalue position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub selected: Vec<bool>,
    /// Number of selected eigenvalues, a pair counting as two.
    pub count: usize,
}

/// Built-in eigenvalue predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenvalueSelector {
    All,
    /// Negative real part (continuous-time stable).
    LeftHalfPlane,
    /// Modulus below one (discrete-time stable).
    InsideUnitCircle,
    Real,
    Complex,
}

impl EigenvalueSelector {
    pub fn accepts(self, re: f64, im: f64) -> bool {
        match self {
            EigenvalueSelector::All => true,
            EigenvalueSelector::LeftHalfPlane => re < 0.0,
            EigenvalueSelector::InsideUnitCircle => re.hypot(im) < 1.0,
            EigenvalueSelector::Real => im == 0.0,
            EigenvalueSelector::Complex => im != 0.0,
        }
    }

    /// Same test on `(re + i*im) / beta`; an infinite eigenvalue (`beta == 0`)
    /// lies in neither the left half-plane nor the unit disc.
    pub fn accepts_generalized(self, re: f64, im: f64, beta: f64) -> bool {
        match self {
            EigenvalueSelector::LeftHalfPlane | EigenvalueSelector::InsideUnitCircle
                if beta == 0.0 =>
            {
                false
            }
            EigenvalueSelector::LeftHalfPlane => re < 0.0,
            EigenvalueSelector::InsideUnitCircle => re.hypot(im) < beta,
            _ => self.accepts(re, im),
        }
    }
}

/// Calls `predicate(re, im)` once per real eigenvalue (`im == 0`) and once per
/// conjugate pair (`im > 0`).
pub fn select_eigenvalues<P>(s: ArrayView2<f64>, predicate: P) -> Result<Selection>
where
    P: Fn(f64, f64) -> bool,
{
    let blocks = classify_blocks(s)?;
    let mut selected = vec![false; s.nrows()];
    let mut count = 0;
    for block in &blocks {
        let keep = match *block {
            Block::Real { start } => predicate(s[[start, start]], 0.0),
            Block::ConjugatePair { re, im, .. } => predicate(re, im),
        };
        if keep {
            selected[block.start()..block.end()].fill(true);
            count += block.size();
        }
    }
    Ok(Selection { selected, count })
}

/// Calls `predicate(re, im, beta)` once per eigenvalue `(re + i*im) / beta` of
/// the pencil, with `im >= 0` and `beta >= 0`.
pub fn select_generalized<P>(
    s: ArrayView2<f64>,
    t: ArrayView2<f64>,
    predicate: P,
) -> Result<Selection>
where
    P: Fn(f64, f64, f64) -> bool,
{
    let blocks = classify_pencil(s, t)?;
    let eig = generalized_eigenvalues(s, t, &blocks);
    let mut selected = vec![false; s.nrows()];
    let mut count = 0;
    for block in &blocks {
        let k = block.start();
        if predicate(eig.real[k], eig.imag[k], eig.beta[k]) {
            selected[k..block.end()].fill(true);
            count += block.size();
        }
    }
    Ok(Selection { selected, count })
}

/// Checks that both halves of every conjugate pair agree and returns the
/// number of selected eigenvalues. `position` is the ordinal reported on
/// failure.
pub fn validate_selection(blocks: &[Block], selected: &[bool], position: usize) -> Result<usize> {
    let n = blocks.last().map_or(0, |b| b.end());
    if selected.len() != n {
        return Err(SchurError::invalid(
            position,
            "selected",
            format!("expected {} entries, got {}", n, selected.len()),
        ));
    }
    let mut count = 0;
    for block in blocks {
        let k = block.start();
        if block.is_pair() && selected[k] != selected[k + 1] {
            return Err(SchurError::invalid(
                position,
                "selected",
                format!(
                    "conjugate pair at rows {} and {} is only half selected",
                    k,
                    k + 1
                ),
            ));
        }
        if selected[k] {
            count += block.size();
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_selected_pair_is_rejected() {
        let blocks = [
            Block::Real { start: 0 },
            Block::ConjugatePair {
                start: 1,
                re: 0.0,
                im: 1.0,
            },
        ];
        assert_eq!(validate_selection(&blocks, &[true, true, true], 2), Ok(3));
        assert!(matches!(
            validate_selection(&blocks, &[false, false, true], 2),
            Err(SchurError::InvalidArgument { position: 2, .. })
        ));
    }

    #[test]
    fn infinite_eigenvalue_is_not_stable() {
        assert!(!EigenvalueSelector::LeftHalfPlane.accepts_generalized(-1.0, 0.0, 0.0));
        assert!(EigenvalueSelector::LeftHalfPlane.accepts_generalized(-1.0, 0.0, 2.0));
        assert!(EigenvalueSelector::InsideUnitCircle.accepts_generalized(0.6, 0.8, 1.5));
        assert!(EigenvalueSelector::Real.accepts_generalized(3.0, 0.0, 0.0));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let blocks = [Block::Real { start: 0 }];
        assert!(validate_selection(&blocks, &[true, false], 1).is_err());
    }
}
