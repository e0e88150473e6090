// src/swap.rs

//! Exchange of two adjacent diagonal blocks.
//!
//! The functions here only look at the local patch holding the two blocks and
//! return the orthogonal factors together with the new patch. Applying those
//! factors to the rest of the matrices and to the accumulators is left to the
//! reordering engine, which does it in one place.

use log::trace;
use ndarray::{array, s, Array2, ArrayView2};

use crate::blocks::pencil_pair_eigenvalue;
use crate::config::SwapConfig;
use crate::error::{Result, SchurError};
use crate::rotation::{diagonalize_2x2, orthonormal_completion, standardize_2x2, PlaneRotation};
use crate::sylvester::{solve_generalized_sylvester, solve_sylvester};

/// Block sizes of the upper and lower block of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapCase {
    OneOne,
    OneTwo,
    TwoOne,
    TwoTwo,
}

impl SwapCase {
    pub fn of(upper: usize, lower: usize) -> Option<SwapCase> {
        match (upper, lower) {
            (1, 1) => Some(SwapCase::OneOne),
            (1, 2) => Some(SwapCase::OneTwo),
            (2, 1) => Some(SwapCase::TwoOne),
            (2, 2) => Some(SwapCase::TwoTwo),
            _ => None,
        }
    }

    pub fn sizes(self) -> (usize, usize) {
        match self {
            SwapCase::OneOne => (1, 1),
            SwapCase::OneTwo => (1, 2),
            SwapCase::TwoOne => (2, 1),
            SwapCase::TwoTwo => (2, 2),
        }
    }
}

/// Result of a standard swap: `patch = U^T D U`.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardSwap {
    pub u: Array2<f64>,
    pub patch: Array2<f64>,
}

/// Result of a pencil swap: `(s_patch, t_patch) = left^T (A, B) right`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralizedSwap {
    pub left: Array2<f64>,
    pub right: Array2<f64>,
    pub s_patch: Array2<f64>,
    pub t_patch: Array2<f64>,
}

pub(crate) fn max_abs(a: ArrayView2<f64>) -> f64 {
    a.iter().fold(0.0f64, |m, v| m.max(v.abs()))
}

fn case_of(m: usize, p: usize, position: usize) -> Result<SwapCase> {
    if m < p {
        return Err(SchurError::Shape(format!(
            "patch of order {} cannot hold an upper block of order {}",
            m, p
        )));
    }
    SwapCase::of(p, m - p).ok_or_else(|| {
        SchurError::Shape(format!(
            "blocks of order {} and {} at row {} cannot be exchanged",
            p,
            m - p,
            position
        ))
    })
}

// V = [-X; scale * I]
fn stacked(x: &Array2<f64>, scale: f64) -> Array2<f64> {
    let (p, q) = x.dim();
    let mut v = Array2::<f64>::zeros((p + q, q));
    v.slice_mut(s![..p, ..]).assign(&x.mapv(|e| -e));
    for i in 0..q {
        v[[p + i, i]] = scale;
    }
    v
}

/// Exchanges the `p x p` leading block of the quasi-triangular patch `d` with
/// its trailing block. `position` is the row of `d` inside the full matrix.
pub fn swap_standard(
    d: ArrayView2<f64>,
    p: usize,
    position: usize,
    config: &SwapConfig,
) -> Result<StandardSwap> {
    let m = d.nrows();
    let case = case_of(m, p, position)?;
    let q = m - p;

    if case == SwapCase::OneOne {
        let (a, b, dd) = (d[[0, 0]], d[[0, 1]], d[[1, 1]]);
        let (rot, _) = PlaneRotation::zeroing(b, dd - a);
        return Ok(StandardSwap {
            u: array![[rot.c, -rot.s], [rot.s, rot.c]],
            patch: array![[dd, b], [0.0, a]],
        });
    }

    let threshold = config.threshold(max_abs(d));
    let sol = solve_sylvester(
        d.slice(s![..p, ..p]),
        d.slice(s![p.., p..]),
        d.slice(s![..p, p..]),
        config.max_refinement_steps,
    );
    if sol.perturbed {
        trace!("Sylvester solve at row {} used a perturbed pivot", position);
    }

    let mut u = orthonormal_completion(stacked(&sol.right, sol.scale).view());
    let mut patch = u.t().dot(&d).dot(&u);

    let weak = max_abs(patch.slice(s![q.., ..q]));
    if weak > threshold {
        return Err(SchurError::SwapRejected {
            position,
            residual: weak,
            threshold,
        });
    }
    patch.slice_mut(s![q.., ..q]).fill(0.0);

    let strong = max_abs((&d - &u.dot(&patch).dot(&u.t())).view());
    if strong > threshold {
        return Err(SchurError::SwapRejected {
            position,
            residual: strong,
            threshold,
        });
    }

    for (k, size) in [(0, q), (q, p)] {
        if size == 2 {
            let std = standardize_2x2(
                patch[[k, k]],
                patch[[k, k + 1]],
                patch[[k + 1, k]],
                patch[[k + 1, k + 1]],
            );
            if !std.is_complex() {
                return Err(SchurError::PairSplit { position });
            }
            std.rotation.apply_left(&mut patch.view_mut(), k, k + 1);
            std.rotation.apply_right(&mut patch.view_mut(), k, k + 1);
            std.rotation.apply_right(&mut u.view_mut(), k, k + 1);
            patch[[k, k]] = std.a;
            patch[[k, k + 1]] = std.b;
            patch[[k + 1, k]] = std.c;
            patch[[k + 1, k + 1]] = std.d;
        }
    }

    Ok(StandardSwap { u, patch })
}

/// Exchanges the leading `p x p` block pair of the pencil patch `(a, b)` with
/// its trailing block pair.
///
/// The returned `t_patch` is upper triangular with diagonal 2x2 blocks under
/// every conjugate pair of `s_patch`.
pub fn swap_generalized<'a>(
    a: ArrayView2<'a, f64>,
    b: ArrayView2<'a, f64>,
    p: usize,
    position: usize,
    config: &SwapConfig,
) -> Result<GeneralizedSwap> {
    let m = a.nrows();
    case_of(m, p, position)?;
    let q = m - p;

    let threshold_a = config.threshold(max_abs(a));
    let threshold_b = config.threshold(max_abs(b));
    let sol = solve_generalized_sylvester(
        a.slice(s![..p, ..p]),
        a.slice(s![p.., p..]),
        a.slice(s![..p, p..]),
        b.slice(s![..p, ..p]),
        b.slice(s![p.., p..]),
        b.slice(s![..p, p..]),
        config.max_refinement_steps,
    );
    if sol.perturbed {
        trace!("generalized Sylvester solve at row {} used a perturbed pivot", position);
    }

    let mut right = orthonormal_completion(stacked(&sol.right, sol.scale).view());
    let mut left = orthonormal_completion(stacked(&sol.left, sol.scale).view());
    let mut s_patch = left.t().dot(&a).dot(&right);
    let mut t_patch = left.t().dot(&b).dot(&right);

    for (patch, threshold) in [(&s_patch, threshold_a), (&t_patch, threshold_b)] {
        let weak = max_abs(patch.slice(s![q.., ..q]));
        if weak > threshold {
            return Err(SchurError::SwapRejected {
                position,
                residual: weak,
                threshold,
            });
        }
    }
    s_patch.slice_mut(s![q.., ..q]).fill(0.0);
    t_patch.slice_mut(s![q.., ..q]).fill(0.0);

    for (orig, patch, threshold) in [(&a, &s_patch, threshold_a), (&b, &t_patch, threshold_b)] {
        let strong = max_abs((orig - &left.dot(patch).dot(&right.t())).view());
        if strong > threshold {
            return Err(SchurError::SwapRejected {
                position,
                residual: strong,
                threshold,
            });
        }
    }

    for (k, size) in [(0, q), (q, p)] {
        if size == 2 {
            let block = [
                [t_patch[[k, k]], t_patch[[k, k + 1]]],
                [t_patch[[k + 1, k]], t_patch[[k + 1, k + 1]]],
            ];
            let (l, r, diag) = diagonalize_2x2(block);
            for patch in [&mut s_patch, &mut t_patch] {
                l.apply_left(&mut patch.view_mut(), k, k + 1);
                r.apply_right(&mut patch.view_mut(), k, k + 1);
            }
            l.apply_right(&mut left.view_mut(), k, k + 1);
            r.apply_right(&mut right.view_mut(), k, k + 1);
            t_patch[[k, k]] = diag[0];
            t_patch[[k, k + 1]] = 0.0;
            t_patch[[k + 1, k]] = 0.0;
            t_patch[[k + 1, k + 1]] = diag[1];

            let pair = pencil_pair_eigenvalue(
                s_patch[[k, k]],
                s_patch[[k, k + 1]],
                s_patch[[k + 1, k]],
                s_patch[[k + 1, k + 1]],
                diag[0],
                diag[1],
            );
            if pair.is_none() {
                return Err(SchurError::PairSplit { position });
            }
        }
    }

    Ok(GeneralizedSwap {
        left,
        right,
        s_patch,
        t_patch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_one_swap_is_exact() {
        let d = array![[1.0, 3.0], [0.0, 2.0]];
        let sw = swap_standard(d.view(), 1, 0, &SwapConfig::default()).unwrap();
        assert_eq!(sw.patch, array![[2.0, 3.0], [0.0, 1.0]]);
        let back = sw.u.dot(&sw.patch).dot(&sw.u.t());
        assert!(max_abs((&back - &d).view()) < 1e-14);
    }

    #[test]
    fn three_by_three_patch_needs_matching_case() {
        let d = Array2::<f64>::eye(3);
        assert!(matches!(
            swap_standard(d.view(), 3, 0, &SwapConfig::default()),
            Err(SchurError::Shape(_))
        ));
    }

    #[test]
    fn case_sizes_roundtrip() {
        for case in [SwapCase::OneOne, SwapCase::OneTwo, SwapCase::TwoOne, SwapCase::TwoTwo] {
            let (p, q) = case.sizes();
            assert_eq!(SwapCase::of(p, q), Some(case));
        }
    }
}
