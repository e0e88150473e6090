// src/eigvec_gen.rs

//! Right eigenvectors of a generalized Schur pencil `(S, T)`.
//!
//! Each eigenvalue is written as `bcoef / acoef` with both coefficients scaled
//! against the column norms of `S` and `T`, and the vector solves
//! `(acoef S - bcoef T) x = 0` from its own block upward. A second running
//! scale bounds the `T`-side contributions the same way the `S`-side ones are
//! bounded.

use log::trace;
use ndarray::{s, ArrayView2};

use crate::blocks::{check_square, classify_pencil, Block};
use crate::config::EigenvectorConfig;
use crate::eigvec::{
    check_back_transform, collect_columns, column_sums_above, underflowed, Eigenvectors,
    LocalVector,
};
use crate::error::{Result, SchurError};
use crate::select::validate_selection;
use crate::small_solve::{solve_shifted, ShiftedSystem};

/// Scaling data shared by every eigenvector of one pencil.
struct PencilNorms {
    anorm: f64,
    bnorm: f64,
    ascale: f64,
    bscale: f64,
    sums_s: Vec<f64>,
    sums_t: Vec<f64>,
}

impl PencilNorms {
    fn new(s: &ArrayView2<f64>, t: &ArrayView2<f64>, blocks: &[Block]) -> Self {
        let safmin = f64::MIN_POSITIVE;
        let col_norm = |a: &ArrayView2<f64>| {
            a.columns()
                .into_iter()
                .map(|c| c.iter().map(|v| v.abs()).sum::<f64>())
                .fold(0.0f64, f64::max)
        };
        let anorm = col_norm(s);
        let bnorm = col_norm(t);
        PencilNorms {
            anorm,
            bnorm,
            ascale: 1.0 / anorm.max(safmin),
            bscale: 1.0 / bnorm.max(safmin),
            sums_s: column_sums_above(s, blocks),
            sums_t: column_sums_above(t, blocks),
        }
    }
}

/// Shift coefficients: the system solved is `(acoef S - (br + i*bi) T) x = 0`.
#[derive(Debug, Clone, Copy)]
struct Shift {
    acoef: f64,
    br: f64,
    bi: f64,
}

// Coefficients for a real eigenvalue S[k,k] / T[k,k], kept away from both
// overflow and harmful underflow.
fn real_shift(alpha: f64, beta: f64, norms: &PencilNorms, n: usize) -> Shift {
    let safmin = f64::MIN_POSITIVE;
    let ulp = f64::EPSILON;
    let small = safmin * n as f64 / ulp;
    let big = 1.0 / small;

    let temp = 1.0 / (alpha.abs() * norms.ascale)
        .max(beta.abs() * norms.bscale)
        .max(safmin);
    let salfar = (temp * alpha) * norms.ascale;
    let sbeta = (temp * beta) * norms.bscale;
    let mut acoef = sbeta * norms.ascale;
    let mut bcoef = salfar * norms.bscale;

    let lsa = sbeta.abs() >= safmin && acoef.abs() < small;
    let lsb = salfar.abs() >= safmin && bcoef.abs() < small;
    if lsa || lsb {
        let mut scale = 1.0f64;
        if lsa {
            scale = (small / sbeta.abs()) * norms.anorm.min(big);
        }
        if lsb {
            scale = scale.max((small / salfar.abs()) * norms.bnorm.min(big));
        }
        scale = scale.min(1.0 / (safmin * 1f64.max(acoef.abs()).max(bcoef.abs())));
        acoef = if lsa {
            norms.ascale * (scale * sbeta)
        } else {
            scale * acoef
        };
        bcoef = if lsb {
            norms.bscale * (scale * salfar)
        } else {
            scale * bcoef
        };
    }

    Shift {
        acoef,
        br: bcoef,
        bi: 0.0,
    }
}

// Coefficients for the pair re + i*im, computed on the scaled pencil.
fn pair_shift(re: f64, im: f64, norms: &PencilNorms) -> Shift {
    let ratio = norms.ascale / norms.bscale;
    let (sre, sim) = (re * ratio, im * ratio);
    let c = 1.0 / 1f64.max(sre.abs() + sim.abs());
    Shift {
        acoef: norms.ascale * c,
        br: norms.bscale * sre * c,
        bi: norms.bscale * sim * c,
    }
}

// Back-substitution above row `k` shared by real and pair eigenvalues. `re`
// and `im` hold the right-hand side above the pivot block and the pivot block
// solution; `im` is ignored for a real shift.
#[allow(clippy::too_many_arguments)]
fn substitute(
    s: &ArrayView2<f64>,
    t: &ArrayView2<f64>,
    blocks: &[Block],
    idx: usize,
    norms: &PencilNorms,
    shift: Shift,
    re: &mut [f64],
    im: &mut [f64],
    mut xmax: f64,
) -> Option<()> {
    let n = s.nrows();
    let safmin = f64::MIN_POSITIVE;
    let ulp = f64::EPSILON;
    let bignum = 1.0 / (safmin * n as f64);
    let complex = shift.bi != 0.0;
    let acoefa = shift.acoef.abs();
    let bcoefa = shift.br.abs() + shift.bi.abs();
    let dmin = (ulp * acoefa * norms.anorm)
        .max(ulp * bcoefa * norms.bnorm)
        .max(safmin);
    let k = blocks[idx].start();

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
                smin: dmin,
                ca: shift.acoef,
                a: s.slice(s![j..j + size, j..j + size]),
                d1: t[[j, j]],
                d2: if size == 2 { t[[j + 1, j + 1]] } else { 1.0 },
                wr: shift.br,
                wi: shift.bi,
            },
            &rhs,
        );
        if sol.perturbed {
            trace!("pencil eigenvector {}: pivot perturbed in block at row {}", k, j);
        }

        if sol.scale < 1.0 {
            re.iter_mut().chain(im.iter_mut()).for_each(|v| *v *= sol.scale);
            total_scale *= sol.scale;
        }
        xmax = (sol.scale * xmax).max(sol.xnorm);
        for r in 0..size {
            re[j + r] = sol.x[r][0];
            im[j + r] = if complex { sol.x[r][1] } else { 0.0 };
        }

        if j > 0 {
            let xscale = 1.0 / xmax.max(1.0);
            let growth = (j..j + size)
                .map(|c| acoefa * norms.sums_s[c] + bcoefa * norms.sums_t[c])
                .fold(acoefa.max(bcoefa), f64::max);
            if growth > bignum * xscale {
                re.iter_mut().chain(im.iter_mut()).for_each(|v| *v *= xscale);
                xmax *= xscale;
                total_scale *= xscale;
            }
            for c in j..j + size {
                let (xr, xi) = (re[c], im[c]);
                for i in 0..j {
                    let p = shift.acoef * s[[i, c]] - shift.br * t[[i, c]];
                    let q = shift.bi * t[[i, c]];
                    re[i] -= p * xr + q * xi;
                    im[i] -= p * xi - q * xr;
                }
            }
        }
    }

    if underflowed(total_scale, &[&re[..], &im[..]]) {
        return None;
    }
    Some(())
}

fn real_vector(
    s: &ArrayView2<f64>,
    t: &ArrayView2<f64>,
    blocks: &[Block],
    idx: usize,
    norms: &PencilNorms,
) -> Option<LocalVector> {
    let k = blocks[idx].start();
    let (alpha, beta) = (s[[k, k]], t[[k, k]]);
    let mut re = vec![0.0; k + 1];
    re[k] = 1.0;
    if alpha.abs() <= f64::MIN_POSITIVE && beta.abs() <= f64::MIN_POSITIVE {
        // Singular pencil: any vector works, take the unit vector
        return Some(LocalVector::Real(re));
    }

    let shift = real_shift(alpha, beta, norms, s.nrows());
    for i in 0..k {
        re[i] = shift.br * t[[i, k]] - shift.acoef * s[[i, k]];
    }
    let mut im = vec![0.0; k + 1];
    substitute(s, t, blocks, idx, norms, shift, &mut re, &mut im, 1.0)?;
    Some(LocalVector::Real(re))
}

fn pair_vector(
    s: &ArrayView2<f64>,
    t: &ArrayView2<f64>,
    blocks: &[Block],
    idx: usize,
    norms: &PencilNorms,
) -> Option<LocalVector> {
    let (k, lre, lim) = match blocks[idx] {
        Block::ConjugatePair { start, re, im } => (start, re, im),
        Block::Real { .. } => return real_vector(s, t, blocks, idx, norms),
    };
    let shift = pair_shift(lre, lim, norms);
    let Shift { acoef, br, bi } = shift;

    // Null vector from whichever row of the pivot block is larger
    let mut re = vec![0.0; k + 2];
    let mut im = vec![0.0; k + 2];
    let m10 = acoef * s[[k + 1, k]];
    let m11r = acoef * s[[k + 1, k + 1]] - br * t[[k + 1, k + 1]];
    let m11i = -bi * t[[k + 1, k + 1]];
    if m10.abs() >= m11r.abs() + m11i.abs() {
        re[k] = -m11r / m10;
        im[k] = -m11i / m10;
        re[k + 1] = 1.0;
    } else {
        let m01 = acoef * s[[k, k + 1]];
        re[k] = 1.0;
        re[k + 1] = (br * t[[k, k]] - acoef * s[[k, k]]) / m01;
        im[k + 1] = bi * t[[k, k]] / m01;
    }
    let xmax = (re[k].abs() + im[k].abs()).max(re[k + 1].abs() + im[k + 1].abs());

    for c in k..k + 2 {
        let (xr, xi) = (re[c], im[c]);
        for i in 0..k {
            let p = acoef * s[[i, c]] - br * t[[i, c]];
            let q = bi * t[[i, c]];
            re[i] -= p * xr + q * xi;
            im[i] -= p * xi - q * xr;
        }
    }

    substitute(s, t, blocks, idx, norms, shift, &mut re, &mut im, xmax)?;
    Some(LocalVector::Complex(re, im))
}

/// Eigenvectors of the selected eigenvalues of the pencil `(s, t)`.
///
/// With `z` the vectors are returned for the original pencil `(Q S Z^T, Q T Z^T)`,
/// otherwise in the basis of `(s, t)`.
pub fn generalized_eigenvectors(
    s: ArrayView2<f64>,
    t: ArrayView2<f64>,
    z: Option<ArrayView2<f64>>,
    selected: &[bool],
    config: &EigenvectorConfig,
) -> Result<Eigenvectors> {
    let n = check_square(&s, "S")?;
    if t.dim() != (n, n) {
        return Err(SchurError::invalid(
            5,
            "T",
            format!("expected {}x{}, got {}x{}", n, n, t.nrows(), t.ncols()),
        ));
    }
    check_back_transform(z.as_ref(), n, 7, "Z")?;
    let blocks = classify_pencil(s, t)?;
    validate_selection(&blocks, selected, 2)?;

    let norms = PencilNorms::new(&s, &t, &blocks);
    let targets: Vec<usize> = (0..blocks.len())
        .filter(|&i| selected[blocks[i].start()])
        .collect();

    Ok(collect_columns(n, &targets, &blocks, z.as_ref(), config, |idx| {
        if blocks[idx].is_pair() {
            pair_vector(&s, &t, &blocks, idx, &norms)
        } else {
            real_vector(&s, &t, &blocks, idx, &norms)
        }
    }))
}
