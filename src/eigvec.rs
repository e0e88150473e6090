// src/eigvec.rs

//! Right eigenvectors of a real quasi-triangular matrix by back-substitution.
//!
//! For a real eigenvalue `w` at row `k` the vector solves `(S - w I) x = 0`
//! with `x[k] = 1` and zeros below; for a pair `wr + i*wi` the complex vector
//! `x_re + i*x_im` belongs to the eigenvalue with positive imaginary part. Every
//! eigenvalue is handled independently, so the batch is spread over rayon's
//! pool when the configuration asks for it.

use log::{debug, trace, warn};
use ndarray::{s, Array1, Array2, ArrayView2};
use rayon::prelude::*;

use crate::blocks::{check_square, classify_blocks, Block};
use crate::config::{EigenvectorConfig, Normalization};
use crate::error::{Result, SchurError};
use crate::select::validate_selection;
use crate::small_solve::{solve_shifted, ShiftedSystem};

/// Eigenvector columns, one per selected real eigenvalue and two (real part,
/// imaginary part) per selected conjugate pair, in diagonal order.
#[derive(Debug, Clone, PartialEq)]
pub struct Eigenvectors {
    pub vectors: Array2<f64>,
    /// First row of every eigenvalue whose vector could not be computed
    /// without underflowing; its columns are left at zero.
    pub failed: Vec<usize>,
}

impl Eigenvectors {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Back-substituted vector restricted to the leading `block.end()` rows.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LocalVector {
    Real(Vec<f64>),
    Complex(Vec<f64>, Vec<f64>),
}

enum Column {
    Real(Array1<f64>),
    Complex(Array1<f64>, Array1<f64>),
}

/// `sums[j]` is the 1-norm of column `j` above the block that holds row `j`.
pub(crate) fn column_sums_above(a: &ArrayView2<f64>, blocks: &[Block]) -> Vec<f64> {
    let mut sums = vec![0.0; a.nrows()];
    for block in blocks {
        for j in block.start()..block.end() {
            sums[j] = (0..block.start()).map(|i| a[[i, j]].abs()).sum();
        }
    }
    sums
}

pub(crate) fn underflowed(total_scale: f64, parts: &[&[f64]]) -> bool {
    total_scale < f64::MIN_POSITIVE || parts.iter().any(|p| p.iter().any(|v| !v.is_finite()))
}

fn real_vector(s: &ArrayView2<f64>, blocks: &[Block], idx: usize, sums: &[f64]) -> Option<LocalVector> {
    let n = s.nrows();
    let k = blocks[idx].start();
    let ulp = f64::EPSILON;
    let smlnum = f64::MIN_POSITIVE * (n as f64 / ulp);
    let bignum = (1.0 - ulp) / smlnum;

    let wr = s[[k, k]];
    let smin = (ulp * wr.abs()).max(smlnum);
    let mut x = vec![0.0; k + 1];
    x[k] = 1.0;
    for i in 0..k {
        x[i] = -s[[i, k]];
    }

    let mut total_scale = 1.0;
    for block in blocks[..idx].iter().rev() {
        let j = block.start();
        let size = block.size();
        let rhs = if size == 1 {
            [[x[j], 0.0], [0.0, 0.0]]
        } else {
            [[x[j], 0.0], [x[j + 1], 0.0]]
        };
        let sol = solve_shifted(
            &ShiftedSystem {
                transpose: false,
                smin,
                ca: 1.0,
                a: s.slice(s![j..j + size, j..j + size]),
                d1: 1.0,
                d2: 1.0,
                wr,
                wi: 0.0,
            },
            &rhs,
        );
        if sol.perturbed {
            trace!("eigenvector {}: pivot perturbed in block at row {}", k, j);
        }

        let mut local = sol.x;
        let mut scale = sol.scale;
        if sol.xnorm > 1.0 {
            let beta = sums[j..j + size].iter().fold(0.0f64, |m, v| m.max(*v));
            if beta > bignum / sol.xnorm {
                local.iter_mut().for_each(|r| r[0] /= sol.xnorm);
                scale /= sol.xnorm;
            }
        }
        if scale != 1.0 {
            x.iter_mut().for_each(|v| *v *= scale);
            total_scale *= scale;
        }

        for r in 0..size {
            x[j + r] = local[r][0];
            for i in 0..j {
                x[i] -= x[j + r] * s[[i, j + r]];
            }
        }
    }

    if underflowed(total_scale, &[x.as_slice()]) {
        return None;
    }
    Some(LocalVector::Real(x))
}

/// Null vector `x_re + i*x_im` of `[a b; c d] - (wr + i*wi) I`.
fn pair_start(a: f64, b: f64, c: f64, d: f64, wr: f64, wi: f64) -> ([f64; 2], [f64; 2]) {
    if b.abs() >= c.abs() {
        ([1.0, (wr - a) / b], [0.0, wi / b])
    } else {
        ([-wi / c, 0.0], [(wr - d) / c, 1.0])
    }
}

fn pair_vector(s: &ArrayView2<f64>, blocks: &[Block], idx: usize, sums: &[f64]) -> Option<LocalVector> {
    let n = s.nrows();
    let (k, wr, wi) = match blocks[idx] {
        Block::ConjugatePair { start, re, im } => (start, re, im),
        Block::Real { .. } => return real_vector(s, blocks, idx, sums),
    };
    let ulp = f64::EPSILON;
    let smlnum = f64::MIN_POSITIVE * (n as f64 / ulp);
    let bignum = (1.0 - ulp) / smlnum;
    let smin = (ulp * (wr.abs() + wi.abs())).max(smlnum);

    let (xr, xi) = pair_start(
        s[[k, k]],
        s[[k, k + 1]],
        s[[k + 1, k]],
        s[[k + 1, k + 1]],
        wr,
        wi,
    );
    let mut re = vec![0.0; k + 2];
    let mut im = vec![0.0; k + 2];
    re[k] = xr[0];
    re[k + 1] = xr[1];
    im[k] = xi[0];
    im[k + 1] = xi[1];
    for i in 0..k {
        re[i] = -(xr[0] * s[[i, k]] + xr[1] * s[[i, k + 1]]);
        im[i] = -(xi[0] * s[[i, k]] + xi[1] * s[[i, k + 1]]);
    }

    let mut total_scale = 1.0;
    for block in blocks[..idx].iter().rev() {
        let j = block.start();
        let size = block.size();
        let rhs = if size == 1 {
            [[re[j], im[j]], [0.0, 0.0]]
        } else {
            [[re[j], im[j]], [re[j + 1], im[j + 1]]]
        };
        let sol = solve_shifted(
            &ShiftedSystem {
                transpose: false,
                smin,
                ca: 1.0,
                a: s.slice(s![j..j + size, j..j + size]),
                d1: 1.0,
                d2: 1.0,
                wr,
                wi,
            },
            &rhs,
        );
        if sol.perturbed {
            trace!("eigenvector {}: pivot perturbed in block at row {}", k, j);
        }

        let mut local = sol.x;
        let mut scale = sol.scale;
        if sol.xnorm > 1.0 {
            let beta = sums[j..j + size].iter().fold(0.0f64, |m, v| m.max(*v));
            if beta > bignum / sol.xnorm {
                local.iter_mut().flatten().for_each(|v| *v /= sol.xnorm);
                scale /= sol.xnorm;
            }
        }
        if scale != 1.0 {
            re.iter_mut().chain(im.iter_mut()).for_each(|v| *v *= scale);
            total_scale *= scale;
        }

        for r in 0..size {
            re[j + r] = local[r][0];
            im[j + r] = local[r][1];
            for i in 0..j {
                re[i] -= re[j + r] * s[[i, j + r]];
                im[i] -= im[j + r] * s[[i, j + r]];
            }
        }
    }

    if underflowed(total_scale, &[re.as_slice(), im.as_slice()]) {
        return None;
    }
    Some(LocalVector::Complex(re, im))
}

// Embed in n rows, multiplying by the leading columns of `acc` when given.
fn expand(local: &[f64], n: usize, acc: Option<&ArrayView2<f64>>) -> Array1<f64> {
    let x = Array1::from(local.to_vec());
    match acc {
        Some(acc) => acc.slice(s![.., ..local.len()]).dot(&x),
        None => {
            let mut full = Array1::<f64>::zeros(n);
            full.slice_mut(s![..local.len()]).assign(&x);
            full
        }
    }
}

fn finish(
    local: LocalVector,
    n: usize,
    acc: Option<&ArrayView2<f64>>,
    normalization: Normalization,
) -> Option<Column> {
    match local {
        LocalVector::Real(x) => {
            let mut x = expand(&x, n, acc);
            let norm = match normalization {
                Normalization::MaxAbs => x.iter().fold(0.0f64, |m, v| m.max(v.abs())),
                Normalization::Euclidean => x.dot(&x).sqrt(),
            };
            if norm == 0.0 || !norm.is_finite() {
                return None;
            }
            x /= norm;
            Some(Column::Real(x))
        }
        LocalVector::Complex(re, im) => {
            let mut re = expand(&re, n, acc);
            let mut im = expand(&im, n, acc);
            let norm = match normalization {
                Normalization::MaxAbs => re
                    .iter()
                    .zip(im.iter())
                    .fold(0.0f64, |m, (a, b)| m.max(a.abs() + b.abs())),
                Normalization::Euclidean => (re.dot(&re) + im.dot(&im)).sqrt(),
            };
            if norm == 0.0 || !norm.is_finite() {
                return None;
            }
            re /= norm;
            im /= norm;
            Some(Column::Complex(re, im))
        }
    }
}

/// Runs `compute` for each target block, back-transforms, normalizes and
/// packs the columns.
pub(crate) fn collect_columns<F>(
    n: usize,
    targets: &[usize],
    blocks: &[Block],
    acc: Option<&ArrayView2<f64>>,
    config: &EigenvectorConfig,
    compute: F,
) -> Eigenvectors
where
    F: Fn(usize) -> Option<LocalVector> + Sync,
{
    let run = |&idx: &usize| compute(idx).and_then(|v| finish(v, n, acc, config.normalization));
    let columns: Vec<Option<Column>> = if config.parallel {
        targets.par_iter().map(run).collect()
    } else {
        targets.iter().map(run).collect()
    };

    let width: usize = targets.iter().map(|&i| blocks[i].size()).sum();
    let mut vectors = Array2::<f64>::zeros((n, width));
    let mut failed = Vec::new();
    let mut col = 0;
    for (&idx, column) in targets.iter().zip(columns) {
        let block = blocks[idx];
        match column {
            Some(Column::Real(x)) => vectors.column_mut(col).assign(&x),
            Some(Column::Complex(re, im)) => {
                vectors.column_mut(col).assign(&re);
                vectors.column_mut(col + 1).assign(&im);
            }
            None => {
                warn!("eigenvector for the eigenvalue at row {} underflowed", block.start());
                failed.push(block.start());
            }
        }
        col += block.size();
    }

    debug!(
        "computed {} eigenvector columns, {} eigenvalues failed",
        width,
        failed.len()
    );
    Eigenvectors { vectors, failed }
}

pub(crate) fn check_back_transform(
    acc: Option<&ArrayView2<f64>>,
    n: usize,
    position: usize,
    name: &'static str,
) -> Result<()> {
    if let Some(acc) = acc {
        if acc.nrows() != n || acc.ncols() != n {
            return Err(SchurError::invalid(
                position,
                name,
                format!("expected {}x{}, got {}x{}", n, n, acc.nrows(), acc.ncols()),
            ));
        }
    }
    Ok(())
}

/// Eigenvectors of the selected eigenvalues of the quasi-triangular `s`.
///
/// With `q` the vectors are returned for `Q S Q^T`, otherwise in the basis of
/// `s` itself.
pub fn eigenvectors(
    s: ArrayView2<f64>,
    q: Option<ArrayView2<f64>>,
    selected: &[bool],
    config: &EigenvectorConfig,
) -> Result<Eigenvectors> {
    let n = check_square(&s, "S")?;
    check_back_transform(q.as_ref(), n, 5, "Q")?;
    let blocks = classify_blocks(s)?;
    validate_selection(&blocks, selected, 2)?;

    let sums = column_sums_above(&s, &blocks);
    let targets: Vec<usize> = (0..blocks.len())
        .filter(|&i| selected[blocks[i].start()])
        .collect();

    Ok(collect_columns(n, &targets, &blocks, q.as_ref(), config, |idx| {
        if blocks[idx].is_pair() {
            pair_vector(&s, &blocks, idx, &sums)
        } else {
            real_vector(&s, &blocks, idx, &sums)
        }
    }))
}
