// src/sylvester.rs

//! Tiny Sylvester equations met when exchanging adjacent diagonal blocks.
//!
//! Both the standard equation `A11 X - X A22 = scale * A12` and the coupled
//! generalized pair
//!
//! ```text
//! A11 R - L A22 = scale * A12
//! B11 R - L B22 = scale * B12
//! ```
//!
//! are written in Kronecker form (at most 8 unknowns) and solved by LU with
//! complete pivoting, with pivots floored at `smin` and a bounded number of
//! refinement sweeps.

use ndarray::{Array2, ArrayView2};

/// Solution of a small Sylvester equation.
#[derive(Debug, Clone, PartialEq)]
pub struct SylvesterSolution {
    /// `X` (standard) or `R` (generalized), `p x q`.
    pub right: Array2<f64>,
    /// `L`, `p x q`; equal to `right` in the standard case.
    pub left: Array2<f64>,
    pub scale: f64,
    pub perturbed: bool,
}

/// LU factorization with complete pivoting of a small dense matrix.
struct PivotedLu {
    lu: Array2<f64>,
    row_perm: Vec<usize>,
    col_perm: Vec<usize>,
    perturbed: bool,
}

impl PivotedLu {
    fn factor(mut a: Array2<f64>) -> Self {
        let n = a.nrows();
        let eps = f64::EPSILON;
        let smlnum = f64::MIN_POSITIVE / eps;
        let max_abs = a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let smin = (eps * max_abs).max(smlnum);

        let mut row_perm: Vec<usize> = (0..n).collect();
        let mut col_perm: Vec<usize> = (0..n).collect();
        let mut perturbed = false;

        for k in 0..n {
            let (mut pr, mut pc, mut pmax) = (k, k, 0.0);
            for i in k..n {
                for j in k..n {
                    if a[[i, j]].abs() > pmax {
                        pmax = a[[i, j]].abs();
                        pr = i;
                        pc = j;
                    }
                }
            }
            if pr != k {
                for j in 0..n {
                    a.swap([k, j], [pr, j]);
                }
                row_perm.swap(k, pr);
            }
            if pc != k {
                for i in 0..n {
                    a.swap([i, k], [i, pc]);
                }
                col_perm.swap(k, pc);
            }
            if a[[k, k]].abs() < smin {
                a[[k, k]] = smin;
                perturbed = true;
            }
            for i in k + 1..n {
                a[[i, k]] /= a[[k, k]];
                let l = a[[i, k]];
                for j in k + 1..n {
                    a[[i, j]] -= l * a[[k, j]];
                }
            }
        }

        PivotedLu {
            lu: a,
            row_perm,
            col_perm,
            perturbed,
        }
    }

    /// Solves `A x = scale * rhs`, choosing `scale <= 1` to avoid overflow.
    fn solve(&self, rhs: &[f64]) -> (Vec<f64>, f64) {
        let n = self.lu.nrows();
        let smlnum = f64::MIN_POSITIVE / f64::EPSILON;
        let mut y: Vec<f64> = self.row_perm.iter().map(|&i| rhs[i]).collect();

        for i in 0..n {
            for k in 0..i {
                y[i] -= self.lu[[i, k]] * y[k];
            }
        }

        let mut scale = 1.0;
        let ymax = y.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if n > 0 && 2.0 * smlnum * ymax > self.lu[[n - 1, n - 1]].abs() {
            scale = 0.5 / ymax;
            y.iter_mut().for_each(|v| *v *= scale);
        }

        for i in (0..n).rev() {
            for k in i + 1..n {
                y[i] -= self.lu[[i, k]] * y[k];
            }
            y[i] /= self.lu[[i, i]];
        }

        let mut x = vec![0.0; n];
        for (k, &j) in self.col_perm.iter().enumerate() {
            x[j] = y[k];
        }
        (x, scale)
    }
}

fn solve_refined(m: Array2<f64>, rhs: &[f64], max_refinement_steps: usize) -> (Vec<f64>, f64, bool) {
    let lu = PivotedLu::factor(m.clone());
    let (mut x, scale) = lu.solve(rhs);

    for _ in 0..max_refinement_steps {
        let residual: Vec<f64> = (0..rhs.len())
            .map(|i| scale * rhs[i] - (0..x.len()).map(|j| m[[i, j]] * x[j]).sum::<f64>())
            .collect();
        let (dx, s) = lu.solve(&residual);
        if s != 1.0 {
            break;
        }
        let delta = dx.iter().fold(0.0f64, |a, v| a.max(v.abs()));
        x.iter_mut().zip(&dx).for_each(|(xi, d)| *xi += d);
        let size = x.iter().fold(0.0f64, |a, v| a.max(v.abs()));
        if delta <= f64::EPSILON * size {
            break;
        }
    }

    (x, scale, lu.perturbed)
}

fn unvec(x: &[f64], p: usize, q: usize) -> Array2<f64> {
    Array2::from_shape_fn((p, q), |(i, j)| x[i + j * p])
}

/// Solves `a11 X - X a22 = scale * a12`.
pub fn solve_sylvester(
    a11: ArrayView2<f64>,
    a22: ArrayView2<f64>,
    a12: ArrayView2<f64>,
    max_refinement_steps: usize,
) -> SylvesterSolution {
    let p = a11.nrows();
    let q = a22.nrows();
    let n = p * q;
    let mut m = Array2::<f64>::zeros((n, n));
    for j in 0..q {
        for i in 0..p {
            let row = i + j * p;
            for k in 0..p {
                m[[row, k + j * p]] += a11[[i, k]];
            }
            for l in 0..q {
                m[[row, i + l * p]] -= a22[[l, j]];
            }
        }
    }
    let rhs: Vec<f64> = (0..n).map(|r| a12[[r % p, r / p]]).collect();

    let (x, scale, perturbed) = solve_refined(m, &rhs, max_refinement_steps);
    let right = unvec(&x, p, q);
    SylvesterSolution {
        left: right.clone(),
        right,
        scale,
        perturbed,
    }
}

/// Solves the coupled pair for `(R, L)` given the blocks of `(S, T)`.
#[allow(clippy::too_many_arguments)]
pub fn solve_generalized_sylvester<'a>(
    a11: ArrayView2<'a, f64>,
    a22: ArrayView2<'a, f64>,
    a12: ArrayView2<'a, f64>,
    b11: ArrayView2<'a, f64>,
    b22: ArrayView2<'a, f64>,
    b12: ArrayView2<'a, f64>,
    max_refinement_steps: usize,
) -> SylvesterSolution {
    let p = a11.nrows();
    let q = a22.nrows();
    let pq = p * q;
    let mut m = Array2::<f64>::zeros((2 * pq, 2 * pq));
    for (offset, x11, x22) in [(0, &a11, &a22), (pq, &b11, &b22)] {
        for j in 0..q {
            for i in 0..p {
                let row = offset + i + j * p;
                for k in 0..p {
                    m[[row, k + j * p]] += x11[[i, k]];
                }
                for l in 0..q {
                    m[[row, pq + i + l * p]] -= x22[[l, j]];
                }
            }
        }
    }
    let rhs: Vec<f64> = (0..2 * pq)
        .map(|r| {
            let idx = r % pq;
            let src = if r < pq { &a12 } else { &b12 };
            src[[idx % p, idx / p]]
        })
        .collect();

    let (x, scale, perturbed) = solve_refined(m, &rhs, max_refinement_steps);
    SylvesterSolution {
        right: unvec(&x[..pq], p, q),
        left: unvec(&x[pq..], p, q),
        scale,
        perturbed,
    }
}
