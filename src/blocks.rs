// src/blocks.rs

//! Partitioning of a (generalized) real Schur form into diagonal blocks.

use ndarray::ArrayView2;

use crate::error::{Result, SchurError};

/// One diagonal block of a quasi-triangular matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Block {
    /// 1x1 block holding a real eigenvalue.
    Real { start: usize },
    /// 2x2 block holding the pair `re +- i*im`, `im > 0`.
    ConjugatePair { start: usize, re: f64, im: f64 },
}

impl Block {
    pub fn start(&self) -> usize {
        match *self {
            Block::Real { start } | Block::ConjugatePair { start, .. } => start,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Block::Real { .. } => 1,
            Block::ConjugatePair { .. } => 2,
        }
    }

    /// One past the last row of the block.
    pub fn end(&self) -> usize {
        self.start() + self.size()
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Block::ConjugatePair { .. })
    }

    /// Same block moved to a new first row.
    pub fn at(&self, start: usize) -> Block {
        match *self {
            Block::Real { .. } => Block::Real { start },
            Block::ConjugatePair { re, im, .. } => Block::ConjugatePair { start, re, im },
        }
    }
}

/// Eigenvalues of a standard Schur form, one entry per diagonal position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Eigenvalues {
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
}

/// Eigenvalues of a generalized Schur form as `(real + i*imag) / beta`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneralizedEigenvalues {
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
    pub beta: Vec<f64>,
}

pub(crate) fn check_square(a: &ArrayView2<f64>, name: &str) -> Result<usize> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(SchurError::Shape(format!(
            "{} must be square, got {}x{}",
            name, rows, cols
        )));
    }
    Ok(rows)
}

/// Eigenvalue `(re, im)` with `im > 0` of the 2x2 block `[a b; c d]`, or `None`
/// when its eigenvalues are real.
pub fn pair_eigenvalue(a: f64, b: f64, c: f64, d: f64) -> Option<(f64, f64)> {
    let p = 0.5 * (a - d);
    let scale = p.abs().max(b.abs()).max(c.abs());
    if scale == 0.0 {
        return None;
    }
    // disc / scale^2, scaled to keep b*c from overflowing
    let disc = (p / scale) * (p / scale) + (b / scale) * (c / scale);
    if disc >= 0.0 {
        return None;
    }
    Some((0.5 * (a + d), scale * (-disc).sqrt()))
}

/// Eigenvalue with positive imaginary part of the 2x2 pencil
/// `([a b; c d], diag(t0, t1))`, or `None` when it is not a conjugate pair.
pub fn pencil_pair_eigenvalue(
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    t0: f64,
    t1: f64,
) -> Option<(f64, f64)> {
    if t0 == 0.0 || t1 == 0.0 {
        return None;
    }
    pair_eigenvalue(a / t0, b / t0, c / t1, d / t1)
}

fn check_below_subdiagonal(s: &ArrayView2<f64>, name: &str) -> Result<()> {
    let n = s.nrows();
    for j in 0..n {
        for i in j + 2..n {
            if s[[i, j]] != 0.0 {
                return Err(SchurError::InconsistentInput {
                    row: i,
                    reason: format!("{}[{}, {}] lies below the sub-diagonal but is non-zero", name, i, j),
                });
            }
        }
    }
    Ok(())
}

// Walk the sub-diagonal and hand each 2x2 candidate to `pair`.
fn scan<F>(s: &ArrayView2<f64>, mut pair: F) -> Result<Vec<Block>>
where
    F: FnMut(usize) -> Result<(f64, f64)>,
{
    let n = s.nrows();
    let mut blocks = Vec::with_capacity(n);
    let mut k = 0;
    while k < n {
        if k + 1 < n && s[[k + 1, k]] != 0.0 {
            if k + 2 < n && s[[k + 2, k + 1]] != 0.0 {
                return Err(SchurError::InconsistentInput {
                    row: k,
                    reason: "two consecutive non-zero sub-diagonal entries".to_string(),
                });
            }
            let (re, im) = pair(k)?;
            blocks.push(Block::ConjugatePair { start: k, re, im });
            k += 2;
        } else {
            blocks.push(Block::Real { start: k });
            k += 1;
        }
    }
    Ok(blocks)
}

/// Splits the diagonal of a quasi-triangular `s` into blocks, left to right.
pub fn classify_blocks(s: ArrayView2<f64>) -> Result<Vec<Block>> {
    check_square(&s, "S")?;
    check_below_subdiagonal(&s, "S")?;
    scan(&s, |k| {
        pair_eigenvalue(s[[k, k]], s[[k, k + 1]], s[[k + 1, k]], s[[k + 1, k + 1]]).ok_or_else(
            || SchurError::InconsistentInput {
                row: k,
                reason: "non-zero sub-diagonal entry on a block with real eigenvalues".to_string(),
            },
        )
    })
}

/// Splits the diagonal of a generalized Schur pencil `(s, t)` into blocks.
///
/// `t` must be upper triangular, with a diagonal 2x2 block (non-zero on the
/// diagonal) under every conjugate pair of `s`.
pub fn classify_pencil(s: ArrayView2<f64>, t: ArrayView2<f64>) -> Result<Vec<Block>> {
    let n = check_square(&s, "S")?;
    if check_square(&t, "T")? != n {
        return Err(SchurError::Shape(format!(
            "S is {}x{} but T is {}x{}",
            n,
            n,
            t.nrows(),
            t.ncols()
        )));
    }
    check_below_subdiagonal(&s, "S")?;
    for j in 0..n {
        for i in j + 1..n {
            if t[[i, j]] != 0.0 {
                return Err(SchurError::InconsistentInput {
                    row: i,
                    reason: format!("T[{}, {}] lies below the diagonal but is non-zero", i, j),
                });
            }
        }
    }
    scan(&s, |k| {
        if t[[k, k + 1]] != 0.0 {
            return Err(SchurError::InconsistentInput {
                row: k,
                reason: "T block under a conjugate pair is not diagonal".to_string(),
            });
        }
        pencil_pair_eigenvalue(
            s[[k, k]],
            s[[k, k + 1]],
            s[[k + 1, k]],
            s[[k + 1, k + 1]],
            t[[k, k]],
            t[[k + 1, k + 1]],
        )
        .ok_or_else(|| SchurError::InconsistentInput {
            row: k,
            reason: "non-zero sub-diagonal entry on a pencil block without a conjugate pair"
                .to_string(),
        })
    })
}

pub fn eigenvalues(s: ArrayView2<f64>, blocks: &[Block]) -> Eigenvalues {
    let n = s.nrows();
    let mut out = Eigenvalues {
        real: vec![0.0; n],
        imag: vec![0.0; n],
    };
    for block in blocks {
        match *block {
            Block::Real { start } => out.real[start] = s[[start, start]],
            Block::ConjugatePair { start, re, im } => {
                out.real[start] = re;
                out.real[start + 1] = re;
                out.imag[start] = im;
                out.imag[start + 1] = -im;
            }
        }
    }
    out
}

/// `beta` is kept non-negative; an infinite eigenvalue has `beta == 0`.
pub fn generalized_eigenvalues(
    s: ArrayView2<f64>,
    t: ArrayView2<f64>,
    blocks: &[Block],
) -> GeneralizedEigenvalues {
    let n = s.nrows();
    let mut out = GeneralizedEigenvalues {
        real: vec![0.0; n],
        imag: vec![0.0; n],
        beta: vec![0.0; n],
    };
    for block in blocks {
        match *block {
            Block::Real { start } => {
                let (alpha, beta) = (s[[start, start]], t[[start, start]]);
                let sign = if beta < 0.0 { -1.0 } else { 1.0 };
                out.real[start] = sign * alpha;
                out.beta[start] = sign * beta;
            }
            Block::ConjugatePair { start, re, im } => {
                for (offset, sign) in [(0, 1.0), (1, -1.0)] {
                    let beta = t[[start + offset, start + offset]].abs();
                    out.real[start + offset] = re * beta;
                    out.imag[start + offset] = sign * im * beta;
                    out.beta[start + offset] = beta;
                }
            }
        }
    }
    out
}
