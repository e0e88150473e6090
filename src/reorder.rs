// src/reorder.rs

//! Moves selected eigenvalues to the leading part of a (generalized) Schur
//! form by adjacent block swaps.
//!
//! Every transformation a swap produces is applied here, to the row strip
//! right of the patch, the column strip above it, the patch itself and the
//! accumulated orthogonal factors. On the first rejected swap the pass stops
//! and the selection array is rewritten to mark exactly the blocks that reached
//! the leading prefix.

use log::{debug, warn};
use ndarray::{s, Array2, ArrayView2, ArrayViewMut2};

use crate::blocks::{
    check_square, classify_blocks, classify_pencil, eigenvalues, generalized_eigenvalues,
    pair_eigenvalue, pencil_pair_eigenvalue, Block, Eigenvalues, GeneralizedEigenvalues,
};
use crate::config::SwapConfig;
use crate::error::{Result, SchurError, Status};
use crate::select::validate_selection;
use crate::swap::{swap_generalized, swap_standard, GeneralizedSwap, StandardSwap};

/// Outcome of a reordering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderReport<E> {
    /// Adjacent swaps that were applied.
    pub swaps: usize,
    /// Eigenvalues now in the leading prefix; the selection marks exactly these.
    pub reordered: usize,
    /// The swap that stopped the pass, if any.
    pub rejected: Option<SchurError>,
    /// Eigenvalues of the reordered form, one per diagonal position.
    pub eigenvalues: E,
}

impl<E> ReorderReport<E> {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_none()
    }

    pub fn status(&self) -> Status {
        if self.is_complete() {
            Status::Success
        } else {
            Status::PartialReordering
        }
    }
}

fn check_accumulator(
    acc: Option<&ArrayViewMut2<f64>>,
    n: usize,
    position: usize,
    name: &'static str,
) -> Result<()> {
    if let Some(acc) = acc {
        if acc.nrows() != acc.ncols() || acc.nrows() != n {
            return Err(SchurError::invalid(
                position,
                name,
                format!("expected {}x{}, got {}x{}", n, n, acc.nrows(), acc.ncols()),
            ));
        }
    }
    Ok(())
}

/// Left and right factors applied to the strips around the patch at row `j`.
fn apply_transform(
    a: &mut ArrayViewMut2<f64>,
    j: usize,
    left: &Array2<f64>,
    right: &Array2<f64>,
    patch: &Array2<f64>,
) {
    let m = patch.nrows();
    let end = j + m;

    let row_strip = a.slice(s![j..end, end..]).to_owned();
    a.slice_mut(s![j..end, end..]).assign(&left.t().dot(&row_strip));

    let col_strip = a.slice(s![..j, j..end]).to_owned();
    a.slice_mut(s![..j, j..end]).assign(&col_strip.dot(right));

    a.slice_mut(s![j..end, j..end]).assign(patch);
}

fn apply_to_accumulator(acc: &mut ArrayViewMut2<f64>, j: usize, factor: &Array2<f64>) {
    let end = j + factor.nrows();
    let cols = acc.slice(s![.., j..end]).to_owned();
    acc.slice_mut(s![.., j..end]).assign(&cols.dot(factor));
}

/// Applies a standard swap at row `j` to `s` and, when given, to `q`.
pub fn apply_standard_swap(
    s: &mut ArrayViewMut2<f64>,
    q: Option<&mut ArrayViewMut2<f64>>,
    j: usize,
    swap: &StandardSwap,
) {
    apply_transform(s, j, &swap.u, &swap.u, &swap.patch);
    if let Some(q) = q {
        apply_to_accumulator(q, j, &swap.u);
    }
}

/// Applies a pencil swap at row `j`: the left factor to the rows of `s`, `t`
/// and the columns of `q`, the right factor to the columns of `s`, `t`, `z`.
pub fn apply_generalized_swap(
    s: &mut ArrayViewMut2<f64>,
    t: &mut ArrayViewMut2<f64>,
    q: Option<&mut ArrayViewMut2<f64>>,
    z: Option<&mut ArrayViewMut2<f64>>,
    j: usize,
    swap: &GeneralizedSwap,
) {
    apply_transform(s, j, &swap.left, &swap.right, &swap.s_patch);
    apply_transform(t, j, &swap.left, &swap.right, &swap.t_patch);
    if let Some(q) = q {
        apply_to_accumulator(q, j, &swap.left);
    }
    if let Some(z) = z {
        apply_to_accumulator(z, j, &swap.right);
    }
}

struct Pass {
    swaps: usize,
    reached: usize,
    rejected: Option<SchurError>,
}

// Stable bubble pass: selected blocks move up one adjacent swap at a time.
// `swap_at(j, p, q)` exchanges the blocks of order p and q starting at row j.
fn bubble_selected<F>(blocks: &mut [Block], selected: &[bool], mut swap_at: F) -> Pass
where
    F: FnMut(usize, usize, usize) -> Result<()>,
{
    let mut pass = Pass {
        swaps: 0,
        reached: 0,
        rejected: None,
    };
    let mut target = 0;

    for idx in 0..blocks.len() {
        if !selected[blocks[idx].start()] {
            continue;
        }
        let mut here = idx;
        while here > target {
            let upper = blocks[here - 1];
            let lower = blocks[here];
            let j = upper.start();
            match swap_at(j, upper.size(), lower.size()) {
                Ok(()) => {
                    debug!(
                        "swapped blocks of order {} and {} at row {}",
                        upper.size(),
                        lower.size(),
                        j
                    );
                    blocks[here - 1] = lower.at(j);
                    blocks[here] = upper.at(j + lower.size());
                    pass.swaps += 1;
                    here -= 1;
                }
                Err(err) => {
                    warn!("reordering stopped: {}", err);
                    pass.rejected = Some(err);
                    return pass;
                }
            }
        }
        target += 1;
        pass.reached = target;
    }
    pass
}

// Selection after a pass: exactly the leading `reached` blocks.
fn mark_prefix(blocks: &[Block], reached: usize, selected: &mut [bool]) -> usize {
    selected.fill(false);
    let mut count = 0;
    for block in &blocks[..reached] {
        selected[block.start()..block.end()].fill(true);
        count += block.size();
    }
    count
}

fn refresh_standard(blocks: &mut [Block], s: &ArrayView2<f64>) {
    for block in blocks.iter_mut() {
        if let Block::ConjugatePair { start: k, re, im } = *block {
            let (re, im) =
                pair_eigenvalue(s[[k, k]], s[[k, k + 1]], s[[k + 1, k]], s[[k + 1, k + 1]])
                    .unwrap_or((re, im));
            *block = Block::ConjugatePair { start: k, re, im };
        }
    }
}

fn refresh_pencil(blocks: &mut [Block], s: &ArrayView2<f64>, t: &ArrayView2<f64>) {
    for block in blocks.iter_mut() {
        if let Block::ConjugatePair { start: k, re, im } = *block {
            let (re, im) = pencil_pair_eigenvalue(
                s[[k, k]],
                s[[k, k + 1]],
                s[[k + 1, k]],
                s[[k + 1, k + 1]],
                t[[k, k]],
                t[[k + 1, k + 1]],
            )
            .unwrap_or((re, im));
            *block = Block::ConjugatePair { start: k, re, im };
        }
    }
}

/// Reorders the quasi-triangular `s` so that the selected eigenvalues lead,
/// updating `q` alongside.
///
/// Argument errors are raised before anything is modified. A rejected swap is
/// not an error: the report carries it and `selected` marks the eigenvalues
/// that made it to the front.
pub fn reorder_schur(
    mut s: ArrayViewMut2<f64>,
    mut q: Option<ArrayViewMut2<f64>>,
    selected: &mut [bool],
    config: &SwapConfig,
) -> Result<ReorderReport<Eigenvalues>> {
    let n = check_square(&s.view(), "S")?;
    check_accumulator(q.as_ref(), n, 5, "Q")?;
    let mut blocks = classify_blocks(s.view())?;
    let wanted = validate_selection(&blocks, selected, 2)?;
    debug!("reordering {} of {} eigenvalues", wanted, n);

    let pass = bubble_selected(&mut blocks, selected, |j, p, m| {
        let swap = swap_standard(s.slice(s![j..j + p + m, j..j + p + m]), p, j, config)?;
        apply_standard_swap(&mut s, q.as_mut(), j, &swap);
        Ok(())
    });

    let reordered = mark_prefix(&blocks, pass.reached, selected);
    refresh_standard(&mut blocks, &s.view());
    Ok(ReorderReport {
        swaps: pass.swaps,
        reordered,
        rejected: pass.rejected,
        eigenvalues: eigenvalues(s.view(), &blocks),
    })
}

/// Reorders the pencil `(s, t)` so that the selected eigenvalues lead,
/// updating `q` with the left and `z` with the right transformations.
pub fn reorder_generalized(
    mut s: ArrayViewMut2<f64>,
    mut t: ArrayViewMut2<f64>,
    mut q: Option<ArrayViewMut2<f64>>,
    mut z: Option<ArrayViewMut2<f64>>,
    selected: &mut [bool],
    config: &SwapConfig,
) -> Result<ReorderReport<GeneralizedEigenvalues>> {
    let n = check_square(&s.view(), "S")?;
    check_accumulator(q.as_ref(), n, 7, "Q")?;
    check_accumulator(z.as_ref(), n, 9, "Z")?;
    let mut blocks = classify_pencil(s.view(), t.view())?;
    let wanted = validate_selection(&blocks, selected, 2)?;
    debug!("reordering {} of {} pencil eigenvalues", wanted, n);

    let pass = bubble_selected(&mut blocks, selected, |j, p, m| {
        let end = j + p + m;
        let swap = swap_generalized(
            s.slice(s![j..end, j..end]),
            t.slice(s![j..end, j..end]),
            p,
            j,
            config,
        )?;
        apply_generalized_swap(&mut s, &mut t, q.as_mut(), z.as_mut(), j, &swap);
        Ok(())
    });

    let reordered = mark_prefix(&blocks, pass.reached, selected);
    refresh_pencil(&mut blocks, &s.view(), &t.view());
    Ok(ReorderReport {
        swaps: pass.swaps,
        reordered,
        rejected: pass.rejected,
        eigenvalues: generalized_eigenvalues(s.view(), t.view(), &blocks),
    })
}
